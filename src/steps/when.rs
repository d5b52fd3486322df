use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::http::{HttpMethod, RequestDescriptor};

use super::registry::{StepArgs, StepRegistry};
use super::{build_url, table, StepEnv, StepError};

/// Bare `I GET` / `I DELETE` steps use this instead of the configured timeout.
pub const BARE_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub(super) fn register(registry: &mut StepRegistry) -> Result<(), StepError> {
    registry.register(r#"I {method:w} "{path}" with query params:"#, with_query_table)?;
    registry.register(r#"I {method:w} "{path}" with json:"#, with_json_table)?;
    registry.register(r#"I {method:w} "{path}" with fixture "{fixture}""#, with_fixture)?;
    registry.register(r#"I GET "{path}""#, get_simple)?;
    registry.register(r#"I DELETE "{path}""#, delete_simple)?;
    Ok(())
}

fn with_query_table(env: &mut StepEnv<'_>, args: &StepArgs<'_>) -> Result<(), StepError> {
    let method: HttpMethod = args.get("method")?.parse()?;
    let params = table::parse_query(args.table()?);
    let request = RequestDescriptor::new(method, args.get("path")?).with_query(params);
    send(env, &request)
}

fn with_json_table(env: &mut StepEnv<'_>, args: &StepArgs<'_>) -> Result<(), StepError> {
    let method: HttpMethod = args.get("method")?.parse()?;
    let body = table::parse_json_body(args.table()?);
    let request = RequestDescriptor::new(method, args.get("path")?).with_body(body);
    send(env, &request)
}

fn with_fixture(env: &mut StepEnv<'_>, args: &StepArgs<'_>) -> Result<(), StepError> {
    let method: HttpMethod = args.get("method")?.parse()?;
    let reference = args.get("fixture")?;
    let body = match env.data.resolve(reference)? {
        Value::Object(map) => map,
        _ => return Err(StepError::FixtureNotObject(reference.to_string())),
    };
    let request = RequestDescriptor::new(method, args.get("path")?).with_body(body);
    send(env, &request)
}

fn get_simple(env: &mut StepEnv<'_>, args: &StepArgs<'_>) -> Result<(), StepError> {
    let request = RequestDescriptor::new(HttpMethod::Get, args.get("path")?).with_timeout(BARE_REQUEST_TIMEOUT);
    send(env, &request)
}

fn delete_simple(env: &mut StepEnv<'_>, args: &StepArgs<'_>) -> Result<(), StepError> {
    let request = RequestDescriptor::new(HttpMethod::Delete, args.get("path")?).with_timeout(BARE_REQUEST_TIMEOUT);
    send(env, &request)
}

fn send(env: &mut StepEnv<'_>, request: &RequestDescriptor) -> Result<(), StepError> {
    let url = build_url(&env.config.base_url, &request.path)?;
    debug!(method = %request.method, url = %url, "dispatching step request");
    let response = env.client.dispatch(&url, request)?;
    env.context.store_response(response);
    Ok(())
}
