use crate::assertions;

use super::registry::{StepArgs, StepRegistry};
use super::{StepEnv, StepError};

pub(super) fn register(registry: &mut StepRegistry) -> Result<(), StepError> {
    registry.register("the response status code should be {code:d}", status_is)?;
    registry.register(r#"the response should match the schema "{schema}""#, matches_schema)?;
    registry.register(
        r#"the field "{field}" should be an array with at least {min:d} items"#,
        array_min_items,
    )?;
    registry.register(
        r#"the field "{field}" should be an array with at least {min:d} item"#,
        array_min_items,
    )?;
    Ok(())
}

fn status_is(env: &mut StepEnv<'_>, args: &StepArgs<'_>) -> Result<(), StepError> {
    let code: u16 = args.parse("code")?;
    assertions::assert_status(env.context.response(), code)?;
    Ok(())
}

fn matches_schema(env: &mut StepEnv<'_>, args: &StepArgs<'_>) -> Result<(), StepError> {
    let schema = args.get("schema")?;
    assertions::assert_schema(env.context.response(), &env.config.schema_dir, schema)?;
    Ok(())
}

fn array_min_items(env: &mut StepEnv<'_>, args: &StepArgs<'_>) -> Result<(), StepError> {
    let field = args.get("field")?;
    let min: usize = args.parse("min")?;
    assertions::assert_array_min_items(env.context.response(), field, min)?;
    Ok(())
}
