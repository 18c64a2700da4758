//! Queue binding executor.
//!
//! Publishes the tool arguments as one message through the adapter
//! registered for the binding's provider. Shadow mode builds the message and
//! reports it without publishing.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use owlclaw_core::SecretValue;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::{BindingConfig, BindingKind, MessageFormat, QueueBinding, QueueProvider};
use crate::credentials::CredentialResolver;
use crate::error::BindingError;
use crate::executor::{BindingExecutor, mismatched};
use crate::result::{ExecutionResult, ResultStatus};
use crate::retry::{Sleeper, TokioSleeper, run_with_retry};
use crate::template::{self, Credentials};

/// A message ready to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Rendered topic.
    pub topic: String,
    /// Encoded payload.
    pub payload: String,
    /// Payload encoding.
    pub format: MessageFormat,
    /// Rendered headers.
    pub headers: Vec<(String, String)>,
}

/// Broker client boundary, one per provider.
#[async_trait]
pub trait QueueAdapter: Send + Sync + fmt::Debug {
    /// Publish `message`, returning the broker's message id when it has one.
    ///
    /// # Errors
    ///
    /// `Transport` or `Timeout` for retryable failures, `Execution` otherwise.
    async fn publish(
        &self,
        connection: &SecretValue,
        message: &QueueMessage,
    ) -> Result<Option<String>, BindingError>;
}

/// Executes `type: queue` bindings.
#[derive(Debug, Clone)]
pub struct QueueExecutor {
    adapters: HashMap<QueueProvider, Arc<dyn QueueAdapter>>,
    sleeper: Arc<dyn Sleeper>,
}

impl Default for QueueExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueExecutor {
    /// Executor with no adapters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Register the adapter for `provider`.
    #[must_use]
    pub fn with_adapter(mut self, provider: QueueProvider, adapter: Arc<dyn QueueAdapter>) -> Self {
        self.adapters.insert(provider, adapter);
        self
    }

    /// Replace the sleeper used between retries.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Providers with a registered adapter, sorted.
    #[must_use]
    pub fn providers(&self) -> Vec<QueueProvider> {
        let mut providers: Vec<_> = self.adapters.keys().copied().collect();
        providers.sort();
        providers
    }
}

#[async_trait]
impl BindingExecutor for QueueExecutor {
    fn binding_type(&self) -> &'static str {
        "queue"
    }

    async fn execute(
        &self,
        config: &BindingConfig,
        parameters: &Map<String, Value>,
        resolver: &CredentialResolver,
    ) -> Result<ExecutionResult, BindingError> {
        let BindingKind::Queue(queue) = &config.kind else {
            return Err(mismatched("queue", config));
        };

        if config.is_shadow() {
            let message = build_message(queue, parameters, Credentials::Redact)?;
            info!(provider = %queue.provider, topic = %message.topic, "Shadow mode: publish intercepted");
            return Ok(ExecutionResult::shadow()
                .with_extra("_provider", queue.provider.as_str())
                .with_extra("_topic", message.topic)
                .with_extra("_message", payload_value(queue.format, &message.payload))
                .with_extra(
                    "_headers",
                    queue
                        .headers
                        .keys()
                        .map(|name| Value::String(name.clone()))
                        .collect::<Vec<_>>(),
                ));
        }

        let adapter = self.adapters.get(&queue.provider).ok_or_else(|| {
            BindingError::Execution(format!(
                "no queue adapter registered for provider '{}'",
                queue.provider
            ))
        })?;

        let connection = resolver.resolve_credential("connection", &queue.connection)?;
        let message = build_message(queue, parameters, resolver.into())?;

        let message_id = run_with_retry(
            &config.retry,
            config.timeout_ms,
            self.sleeper.as_ref(),
            "queue.publish",
            |_| adapter.publish(&connection, &message),
        )
        .await?;

        debug!(provider = %queue.provider, topic = %message.topic, "Message published");
        let mut result = ExecutionResult::new(ResultStatus::Success);
        if let Some(id) = message_id {
            result = result.with_extra("message_id", id);
        }
        Ok(result)
    }
}

/// Render the topic and headers and encode the arguments.
fn build_message(
    queue: &QueueBinding,
    parameters: &Map<String, Value>,
    credentials: Credentials<'_>,
) -> Result<QueueMessage, BindingError> {
    Ok(QueueMessage {
        topic: template::render(&queue.topic, parameters, credentials)?,
        payload: encode_payload(queue.format, parameters)?,
        format: queue.format,
        headers: template::render_headers(&queue.headers, parameters, credentials)?,
    })
}

/// JSON encodes the argument map. Text sends a lone argument as-is and
/// falls back to JSON for anything else.
fn encode_payload(
    format: MessageFormat,
    parameters: &Map<String, Value>,
) -> Result<String, BindingError> {
    if format == MessageFormat::Text && parameters.len() == 1 {
        if let Some(value) = parameters.values().next() {
            return Ok(template::value_to_text(value));
        }
    }
    serde_json::to_string(parameters)
        .map_err(|e| BindingError::InvalidParameters(format!("arguments are not encodable: {e}")))
}

fn payload_value(format: MessageFormat, payload: &str) -> Value {
    match format {
        MessageFormat::Json => {
            serde_json::from_str(payload).unwrap_or_else(|_| Value::String(payload.to_string()))
        }
        MessageFormat::Text => Value::String(payload.to_string()),
    }
}
