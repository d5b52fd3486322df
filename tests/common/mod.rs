#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use apicheck::config::Config;
use apicheck::data::DataLoader;
use apicheck::http::HttpClient;
use apicheck::steps::{ScenarioContext, StepEnv, StepError, StepRegistry};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;

/// A request as the stub service saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub target: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl Recorded {
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or("")
    }

    pub fn query(&self) -> Option<&str> {
        self.target.split_once('?').map(|(_, query)| query)
    }
}

type Route = dyn Fn(&Recorded) -> (u16, String) + Send + Sync;

#[derive(Clone)]
struct Shared {
    route: Arc<Route>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

/// axum service on a background runtime answering every request through `route`.
pub struct StubServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubServer {
    pub fn start<F>(route: F) -> Self
    where
        F: Fn(&Recorded) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let shared = Shared {
            route: Arc::new(route),
            requests: Arc::clone(&requests),
        };

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                let app = Router::new().fallback(respond).with_state(shared);
                axum::serve(listener, app).await.unwrap();
            });
        });

        Self { addr, requests }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

async fn respond(
    State(shared): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let recorded = Recorded {
        method: method.to_string(),
        target: uri
            .path_and_query()
            .map(|target| target.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string()),
        headers: headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), value.to_str().unwrap_or_default().to_string()))
            .collect(),
        body: String::from_utf8_lossy(&body).into_owned(),
    };
    let (status, payload) = (shared.route)(&recorded);
    shared.requests.lock().unwrap().push(recorded);

    let status = StatusCode::from_u16(status).unwrap();
    if status == StatusCode::NO_CONTENT {
        return status.into_response();
    }
    (status, [(header::CONTENT_TYPE, "application/json")], payload).into_response()
}

/// Configuration pointing at `base_url` with no backoff between retries.
pub fn config_for(base_url: &str, schema_dir: &Path, data_dir: &Path) -> Config {
    Config {
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(5),
        retry_count: 2,
        retry_backoff_factor: 0.0,
        parallel_workers: 2,
        schema_dir: schema_dir.to_path_buf(),
        data_dir: data_dir.to_path_buf(),
        enable_html_report: false,
        enable_allure_report: false,
        ..Config::default()
    }
}

/// Runs steps in one scenario context, stopping at the first error.
pub struct Harness {
    pub config: Config,
    pub registry: StepRegistry,
    pub client: HttpClient,
    pub data: DataLoader,
    pub context: ScenarioContext,
}

impl Harness {
    pub fn new(config: Config) -> Self {
        let registry = StepRegistry::with_default_steps().unwrap();
        let client = HttpClient::new(&config).unwrap();
        let data = DataLoader::new(&config.data_dir);
        Self {
            config,
            registry,
            client,
            data,
            context: ScenarioContext::new(),
        }
    }

    pub fn step(&mut self, text: &str) -> Result<(), StepError> {
        self.step_with_table(text, None)
    }

    pub fn step_with_table(&mut self, text: &str, table: Option<&str>) -> Result<(), StepError> {
        let mut env = StepEnv {
            config: &self.config,
            client: &self.client,
            data: &self.data,
            context: &mut self.context,
        };
        self.registry.run(&mut env, text, table)
    }
}

pub fn users_page(count: usize) -> String {
    let users: Vec<_> = (1..=count)
        .map(|id| {
            serde_json::json!({
                "id": id,
                "email": format!("user{id}@reqres.in"),
                "first_name": "First",
                "last_name": "Last",
                "avatar": format!("https://reqres.in/img/faces/{id}-image.jpg"),
            })
        })
        .collect();
    serde_json::json!({
        "page": 2,
        "per_page": count,
        "total": 12,
        "total_pages": 2,
        "data": users,
    })
    .to_string()
}
