//! HTTP binding executor.
//!
//! Renders the URL, headers and body from tool arguments, sends the request
//! with retry, and maps the response through `response_mapping`. Mutating
//! methods in shadow mode are reported, never sent.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use owlclaw_core::config::HttpSettings;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::{BindingConfig, BindingKind, HttpBinding, HttpMethod, ResponseMapping};
use crate::credentials::CredentialResolver;
use crate::error::BindingError;
use crate::executor::{BindingExecutor, mismatched};
use crate::jsonpath;
use crate::result::{ExecutionResult, ResultStatus};
use crate::retry::{Sleeper, TokioSleeper, run_with_retry};
use crate::template::{self, Credentials};

/// Status and body of one HTTP exchange.
#[derive(Debug)]
struct Reply {
    status: u16,
    body: String,
}

/// Executes `type: http` bindings with a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
    sleeper: Arc<dyn Sleeper>,
}

impl HttpExecutor {
    /// Build an executor whose client follows `settings`.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the client cannot be built.
    pub fn new(settings: &HttpSettings) -> Result<Self, BindingError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .connect_timeout(Duration::from_millis(settings.connect_timeout_ms))
            .pool_idle_timeout(Duration::from_secs(settings.pool_idle_timeout_secs))
            .build()
            .map_err(|e| BindingError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client))
    }

    /// Use an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the sleeper used between retries.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    async fn send_once(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Reply, BindingError> {
        let mut request = self.client.request(to_reqwest(method), url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(request_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(request_error)?;
        Ok(Reply { status, body })
    }
}

#[async_trait]
impl BindingExecutor for HttpExecutor {
    fn binding_type(&self) -> &'static str {
        "http"
    }

    async fn execute(
        &self,
        config: &BindingConfig,
        parameters: &Map<String, Value>,
        resolver: &CredentialResolver,
    ) -> Result<ExecutionResult, BindingError> {
        let BindingKind::Http(http) = &config.kind else {
            return Err(mismatched("http", config));
        };

        if config.is_shadow() && http.method.is_mutating() {
            return shadow_result(http, parameters);
        }

        let url = template::render(&http.url, parameters, resolver)?;
        let headers = template::render_headers(&http.headers, parameters, resolver)?;
        let body = request_body(http, parameters, resolver.into())?;

        let reply = run_with_retry(
            &config.retry,
            config.timeout_ms,
            self.sleeper.as_ref(),
            "http",
            |_| self.send_once(http.method, &url, &headers, body.as_ref()),
        )
        .await?;

        debug!(method = %http.method, status = reply.status, "HTTP response received");
        map_response(&http.response_mapping, reply.status, &reply.body)
    }
}

/// Body for mutating methods: the rendered template, or every argument.
fn request_body(
    http: &HttpBinding,
    parameters: &Map<String, Value>,
    credentials: Credentials<'_>,
) -> Result<Option<Value>, BindingError> {
    if !http.method.is_mutating() {
        return Ok(None);
    }
    match &http.body_template {
        Some(template) => template::render_value(template, parameters, credentials).map(Some),
        None => Ok(Some(Value::Object(parameters.clone()))),
    }
}

/// Intercepted write. References stay unresolved so no secret reaches the result.
fn shadow_result(
    http: &HttpBinding,
    parameters: &Map<String, Value>,
) -> Result<ExecutionResult, BindingError> {
    let url = template::render(&http.url, parameters, Credentials::Redact)?;
    let body = request_body(http, parameters, Credentials::Redact)?.unwrap_or(Value::Null);
    let header_names: Vec<Value> = http
        .headers
        .keys()
        .map(|name| Value::String(name.clone()))
        .collect();

    info!(method = %http.method, "Shadow mode: HTTP write intercepted");

    Ok(ExecutionResult::shadow()
        .with_extra("_method", http.method.as_str())
        .with_extra("_url", url)
        .with_extra("_body", body)
        .with_extra("_headers", header_names))
}

/// Turn a status code and body into a result.
fn map_response(
    mapping: &ResponseMapping,
    status: u16,
    body: &str,
) -> Result<ExecutionResult, BindingError> {
    let parsed = if body.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
    };

    let is_2xx = (200..300).contains(&status);
    let label = mapping.label_for(status).map_or_else(
        || {
            if is_2xx {
                ResultStatus::Success
            } else {
                ResultStatus::Error
            }
        },
        ResultStatus::from,
    );

    let mut result = ExecutionResult::new(label).with_status_code(status);

    if is_2xx {
        let data = match &mapping.path {
            Some(path) => extract(&parsed, path)?.unwrap_or(Value::Null),
            None => parsed,
        };
        result.data = Some(data);
    } else {
        let extracted = match &mapping.error_path {
            Some(path) => extract(&parsed, path)?,
            None => None,
        };
        match extracted {
            Some(error) => result.error = Some(template::value_to_text(&error)),
            None => {
                result.error = Some(format!("HTTP {status}"));
                result.data = Some(parsed);
            }
        }
    }

    Ok(result)
}

fn extract(value: &Value, path: &str) -> Result<Option<Value>, BindingError> {
    jsonpath::extract(value, path).map_err(|e| BindingError::Execution(e.to_string()))
}

const fn to_reqwest(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

/// Classify a reqwest failure. URLs are stripped so resolved credentials in
/// query strings never reach error text.
fn request_error(e: reqwest::Error) -> BindingError {
    let e = e.without_url();
    if e.is_builder() {
        BindingError::InvalidParameters(format!("invalid request: {e}"))
    } else {
        BindingError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MapSource;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }

    fn executor() -> HttpExecutor {
        HttpExecutor::new(&HttpSettings::default()).unwrap()
    }

    fn resolver() -> CredentialResolver {
        CredentialResolver::new().with_environment(MapSource::new().with("API_TOKEN", "abc"))
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn config(raw: Value) -> BindingConfig {
        BindingConfig::parse(&raw).unwrap()
    }

    #[tokio::test]
    async fn test_get_with_path_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orders/42"))
            .and(header("Authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok", "total": 10})))
            .expect(1)
            .mount(&server)
            .await;

        let config = config(json!({
            "type": "http",
            "url": format!("{}/orders/{{id}}", server.uri()),
            "headers": {"Authorization": "Bearer ${API_TOKEN}"},
            "response_mapping": {"path": "total"}
        }));

        let result = executor()
            .execute(&config, &args(json!({"id": "42"})), &resolver())
            .await
            .unwrap();

        assert_eq!(result.status, ResultStatus::Success);
        assert_eq!(result.data, Some(json!(10)));
        assert_eq!(result.status_code, Some(200));
        assert!(!result.shadow);
    }

    #[tokio::test]
    async fn test_post_renders_typed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .and(body_json(json!({"item": "book", "qty": 2, "note": "rush: book"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "o-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let config = config(json!({
            "type": "http",
            "method": "POST",
            "url": format!("{}/orders", server.uri()),
            "body_template": {"item": "{item}", "qty": "{qty}", "note": "rush: {item}"},
            "response_mapping": {"status_codes": {"201": "created"}}
        }));

        let result = executor()
            .execute(&config, &args(json!({"item": "book", "qty": 2})), &resolver())
            .await
            .unwrap();

        assert_eq!(result.status, ResultStatus::Label("created".into()));
        assert_eq!(result.data, Some(json!({"id": "o-1"})));
    }

    #[tokio::test]
    async fn test_post_without_template_sends_arguments() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(body_json(json!({"name": "x", "count": 1})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let config = config(json!({"type": "http", "method": "put", "url": server.uri()}));
        let result = executor()
            .execute(&config, &args(json!({"name": "x", "count": 1})), &resolver())
            .await
            .unwrap();

        assert_eq!(result.status, ResultStatus::Success);
        assert_eq!(result.data, Some(Value::Null));
    }

    #[tokio::test]
    async fn test_shadow_write_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = config(json!({
            "type": "http",
            "method": "POST",
            "mode": "shadow",
            "url": format!("{}/users?key=${{API_TOKEN}}", server.uri()),
            "headers": {"Authorization": "Bearer ${API_TOKEN}"}
        }));

        let result = executor()
            .execute(&config, &args(json!({"name": "x"})), &resolver())
            .await
            .unwrap();

        let value = result.to_value();
        assert_eq!(value["_shadow"], json!(true));
        assert_eq!(value["status"], json!("success"));
        assert_eq!(value["_method"], json!("POST"));
        assert_eq!(value["_body"], json!({"name": "x"}));
        assert_eq!(value["_headers"], json!(["Authorization"]));
        assert!(value["_url"].as_str().unwrap().ends_with("/users?key=${API_TOKEN}"));
        assert!(!value.to_string().contains("abc"));
    }

    #[tokio::test]
    async fn test_shadow_get_matches_active() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2, 3])))
            .expect(2)
            .mount(&server)
            .await;

        let raw = json!({"type": "http", "url": format!("{}/items", server.uri())});
        let active = config(raw.clone());
        let shadow = active.clone().with_mode(crate::config::BindingMode::Shadow);

        let executor = executor();
        let a = executor.execute(&active, &Map::new(), &resolver()).await.unwrap();
        let s = executor.execute(&shadow, &Map::new(), &resolver()).await.unwrap();
        assert_eq!(a, s);
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let server = MockServer::start().await;
        Mock::given(path("/missing"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"error": {"message": "no such order"}})),
            )
            .mount(&server)
            .await;
        Mock::given(path("/broken"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "boom"})))
            .expect(1)
            .mount(&server)
            .await;

        let mapped = config(json!({
            "type": "http",
            "url": format!("{}/missing", server.uri()),
            "response_mapping": {"error_path": "error.message", "status_codes": {"4xx": "not_found"}}
        }));
        let result = executor().execute(&mapped, &Map::new(), &resolver()).await.unwrap();
        assert_eq!(result.status, ResultStatus::Label("not_found".into()));
        assert_eq!(result.error.as_deref(), Some("no such order"));
        assert_eq!(result.status_code, Some(404));

        // HTTP error responses are results, never retried
        let plain = config(json!({"type": "http", "url": format!("{}/broken", server.uri())}));
        let result = executor().execute(&plain, &Map::new(), &resolver()).await.unwrap();
        assert_eq!(result.status, ResultStatus::Error);
        assert_eq!(result.error.as_deref(), Some("HTTP 500"));
        assert_eq!(result.data, Some(json!({"detail": "boom"})));
    }

    #[tokio::test]
    async fn test_timeout_is_retried_with_backoff() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .expect(3)
            .mount(&server)
            .await;

        let config = config(json!({
            "type": "http",
            "url": server.uri(),
            "timeout_ms": 50,
            "retry": {"max_attempts": 3, "backoff_ms": 10, "backoff_multiplier": 3.0}
        }));
        let sleeper = Arc::new(RecordingSleeper::default());
        let executor = executor().with_sleeper(sleeper.clone());

        let err = executor.execute(&config, &Map::new(), &resolver()).await.unwrap_err();
        assert!(matches!(err, BindingError::Timeout { timeout_ms: 50 }));
        assert_eq!(
            *sleeper.delays.lock().unwrap(),
            vec![Duration::from_millis(10), Duration::from_millis(30)]
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let config = config(json!({
            "type": "http",
            "url": "http://127.0.0.1:9/orders?key=${API_TOKEN}",
            "retry": {"max_attempts": 2, "backoff_ms": 1}
        }));
        let sleeper = Arc::new(RecordingSleeper::default());
        let executor = executor().with_sleeper(sleeper.clone());

        let err = executor.execute(&config, &Map::new(), &resolver()).await.unwrap_err();
        assert!(matches!(err, BindingError::Transport(_)));
        assert!(!err.to_string().contains("abc"));
        assert_eq!(sleeper.delays.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_argument_fails_before_request() {
        let config = config(json!({"type": "http", "url": "https://api.example.com/orders/{id}"}));
        let err = executor().execute(&config, &Map::new(), &resolver()).await.unwrap_err();
        assert!(matches!(err, BindingError::InvalidParameters(_)));
    }

    #[test]
    fn test_map_response_non_json_body() {
        let result = map_response(&ResponseMapping::default(), 200, "plain text").unwrap();
        assert_eq!(result.data, Some(json!("plain text")));
    }
}
