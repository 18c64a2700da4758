//! Binding declarations.
//!
//! A declaration is a mapping tagged by `type`. [`BindingConfig::check`]
//! collects every structural and security problem in one pass;
//! [`BindingConfig::parse`] turns a clean declaration into an immutable
//! [`BindingConfig`] that serializes back to the same mapping.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use owlclaw_core::ValidationMode;
use owlclaw_core::scan::{self, detect_secret, detect_secret_field};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigurationError, CredentialError};
use crate::jsonpath;
use crate::query::scan_query;
use crate::retry::RetryConfig;

/// Binding types this schema understands, sorted.
pub const SUPPORTED_TYPES: &[&str] = &["grpc", "http", "queue", "sql"];

static STATUS_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-5]([0-9]{2}|[xX]{2})$").expect("valid status regex"));

/// Whether calls with side effects are performed or intercepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingMode {
    /// Every call is performed.
    #[default]
    Active,
    /// Mutating calls are intercepted and reported instead of performed.
    Shadow,
}

impl BindingMode {
    /// Lowercase label used in results and records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Shadow => "shadow",
        }
    }
}

impl fmt::Display for BindingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP method. Accepted in any case, written upper-case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HttpMethod {
    /// GET
    #[default]
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Whether the method changes remote state.
    #[must_use]
    pub const fn is_mutating(self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => Err(format!(
                "unsupported HTTP method '{s}', expected one of GET, POST, PUT, PATCH, DELETE"
            )),
        }
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HttpMethod> for String {
    fn from(method: HttpMethod) -> Self {
        method.as_str().to_string()
    }
}

/// How an HTTP response becomes an execution result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMapping {
    /// Path into the JSON body selected as `data` on success.
    #[serde(default, alias = "data_path", skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Path into the JSON body selected as `error` on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_path: Option<String>,

    /// Exact code (`"404"`) or class (`"4xx"`) → semantic status label.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub status_codes: BTreeMap<String, String>,
}

impl ResponseMapping {
    /// Whether nothing is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.path.is_none() && self.error_path.is_none() && self.status_codes.is_empty()
    }

    /// Label for `code`: exact match first, then its class.
    #[must_use]
    pub fn label_for(&self, code: u16) -> Option<&str> {
        let exact = code.to_string();
        let class = format!("{}xx", code / 100);
        self.status_codes
            .get(&exact)
            .or_else(|| {
                self.status_codes
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(&class))
                    .map(|(_, label)| label)
            })
            .map(String::as_str)
    }
}

/// REST call declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpBinding {
    /// Request method.
    #[serde(default)]
    pub method: HttpMethod,

    /// URL template with `{param}` and `${VAR}` tokens.
    #[serde(default)]
    pub url: String,

    /// Header templates.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// JSON body template for mutating methods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_template: Option<Value>,

    /// Response handling.
    #[serde(default, skip_serializing_if = "ResponseMapping::is_empty")]
    pub response_mapping: ResponseMapping,
}

/// Message broker family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueProvider {
    /// Apache Kafka.
    Kafka,
    /// RabbitMQ.
    Rabbitmq,
    /// Redis streams or pub/sub.
    Redis,
}

impl QueueProvider {
    /// Lowercase provider name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kafka => "kafka",
            Self::Rabbitmq => "rabbitmq",
            Self::Redis => "redis",
        }
    }
}

impl fmt::Display for QueueProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queue payload encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    /// The argument map as a JSON document.
    #[default]
    Json,
    /// Plain text.
    Text,
}

/// Message publish declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueBinding {
    /// Broker family.
    pub provider: QueueProvider,

    /// Connection string; must be a `${VAR}` reference.
    #[serde(default)]
    pub connection: String,

    /// Topic, exchange or stream name.
    #[serde(default)]
    pub topic: String,

    /// Payload encoding.
    #[serde(default)]
    pub format: MessageFormat,

    /// Message header templates.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

/// SQL statement declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlBinding {
    /// Connection string; must be a `${VAR}` reference.
    #[serde(default)]
    pub connection: String,

    /// Statement text with `:named` placeholders.
    #[serde(default)]
    pub query: String,

    /// Reads only unless explicitly set to false.
    #[serde(default = "default_read_only")]
    pub read_only: bool,

    /// Placeholder name → tool argument name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameter_mapping: BTreeMap<String, String>,

    /// Row cap for reads.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

const fn default_read_only() -> bool {
    true
}

const fn default_max_rows() -> usize {
    1000
}

/// gRPC declaration. Parsed and validated; no built-in executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrpcBinding {
    /// Server endpoint.
    #[serde(default)]
    pub endpoint: String,
    /// Fully qualified service name.
    #[serde(default)]
    pub service: String,
    /// RPC method.
    #[serde(default)]
    pub method: String,
}

/// Protocol-specific part of a declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BindingKind {
    /// REST endpoint.
    Http(HttpBinding),
    /// Message queue publish.
    Queue(QueueBinding),
    /// SQL statement.
    Sql(SqlBinding),
    /// gRPC call.
    Grpc(GrpcBinding),
}

impl BindingKind {
    /// The `type` tag.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Queue(_) => "queue",
            Self::Sql(_) => "sql",
            Self::Grpc(_) => "grpc",
        }
    }
}

/// A validated binding declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Protocol-specific fields, including the `type` tag.
    #[serde(flatten)]
    pub kind: BindingKind,

    /// Execution mode.
    #[serde(default)]
    pub mode: BindingMode,

    /// Per-attempt timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retry policy.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Keys accepted on every declaration.
const COMMON_FIELDS: &[&str] = &["type", "mode", "timeout_ms", "retry"];
const HTTP_FIELDS: &[&str] = &["method", "url", "headers", "body_template", "response_mapping"];
const QUEUE_FIELDS: &[&str] = &["provider", "connection", "topic", "format", "headers"];
const SQL_FIELDS: &[&str] = &[
    "connection",
    "query",
    "read_only",
    "parameter_mapping",
    "max_rows",
];
const GRPC_FIELDS: &[&str] = &["endpoint", "service", "method"];
const RETRY_FIELDS: &[&str] = &["max_attempts", "backoff_ms", "backoff_multiplier", "multiplier"];
const RESPONSE_MAPPING_FIELDS: &[&str] = &["path", "data_path", "error_path", "status_codes"];

/// Keys serde would drop silently. The protocol fields are flattened into
/// the declaration, so `deny_unknown_fields` cannot catch them.
fn unknown_fields(type_name: &str, fields: &Map<String, Value>) -> Vec<String> {
    let protocol = match type_name {
        "http" => HTTP_FIELDS,
        "queue" => QUEUE_FIELDS,
        "sql" => SQL_FIELDS,
        _ => GRPC_FIELDS,
    };

    let mut errors: Vec<String> = fields
        .keys()
        .filter(|key| !COMMON_FIELDS.contains(&key.as_str()) && !protocol.contains(&key.as_str()))
        .map(|key| format!("unknown field '{key}' for {type_name} binding"))
        .collect();

    let nested = [
        ("retry", RETRY_FIELDS),
        ("response_mapping", RESPONSE_MAPPING_FIELDS),
    ];
    for (section, allowed) in nested {
        if let Some(Value::Object(inner)) = fields.get(section) {
            errors.extend(
                inner
                    .keys()
                    .filter(|key| !allowed.contains(&key.as_str()))
                    .map(|key| format!("unknown field '{section}.{key}'")),
            );
        }
    }
    errors
}

const fn default_timeout_ms() -> u64 {
    30_000
}

/// Outcome of checking a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Problems that block registration.
    pub errors: Vec<String>,
    /// Findings reported in lenient mode.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Whether there are no errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Warnings on success, every error otherwise.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` when any error was recorded.
    pub fn into_result(self) -> Result<Vec<String>, ConfigurationError> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(ConfigurationError {
                errors: self.errors,
            })
        }
    }
}

impl BindingConfig {
    /// Wrap `kind` with default mode, timeout and retry policy.
    #[must_use]
    pub fn new(kind: BindingKind) -> Self {
        Self {
            kind,
            mode: BindingMode::default(),
            timeout_ms: default_timeout_ms(),
            retry: RetryConfig::default(),
        }
    }

    /// Set the execution mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: BindingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Parse a declaration in strict mode.
    ///
    /// # Errors
    ///
    /// Returns every problem found.
    pub fn parse(raw: &Value) -> Result<Self, ConfigurationError> {
        Self::parse_with(raw, ValidationMode::Strict).map(|(config, _)| config)
    }

    /// Parse a declaration, returning lenient-mode warnings alongside it.
    ///
    /// # Errors
    ///
    /// Returns every problem found.
    pub fn parse_with(
        raw: &Value,
        mode: ValidationMode,
    ) -> Result<(Self, Vec<String>), ConfigurationError> {
        let (config, report) = Self::analyze(raw, mode);
        let warnings = report.into_result()?;
        config
            .map(|config| (config, warnings))
            .ok_or_else(|| ConfigurationError::single("binding declaration could not be parsed"))
    }

    /// Check a raw declaration without building it.
    #[must_use]
    pub fn check(raw: &Value, mode: ValidationMode) -> ValidationReport {
        Self::analyze(raw, mode).1
    }

    /// Re-check an already parsed config in strict mode.
    ///
    /// # Errors
    ///
    /// Returns every problem found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.report(ValidationMode::Strict).into_result().map(|_| ())
    }

    /// Re-check an already parsed config.
    #[must_use]
    pub fn report(&self, mode: ValidationMode) -> ValidationReport {
        let mut report = ValidationReport {
            errors: self.structural_errors(),
            warnings: Vec::new(),
        };
        match serde_json::to_value(self) {
            Ok(value) => apply_findings(&mut report, security_findings(&value), mode),
            Err(e) => report.errors.push(format!("binding is not serializable: {e}")),
        }
        report
    }

    /// The `type` tag.
    #[must_use]
    pub const fn binding_type(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Whether the config runs in shadow mode.
    #[must_use]
    pub fn is_shadow(&self) -> bool {
        self.mode == BindingMode::Shadow
    }

    /// Whether an invocation has a side effect.
    #[must_use]
    pub const fn is_mutating(&self) -> bool {
        match &self.kind {
            BindingKind::Http(http) => http.method.is_mutating(),
            BindingKind::Queue(_) | BindingKind::Grpc(_) => true,
            BindingKind::Sql(sql) => !sql.read_only,
        }
    }

    /// Every `${VAR}` name the config refers to, sorted and deduplicated.
    #[must_use]
    pub fn credential_references(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut collect = |text: &str| {
            names.extend(scan::credential_references(text).into_iter().map(str::to_string));
        };

        match &self.kind {
            BindingKind::Http(http) => {
                collect(&http.url);
                http.headers.values().for_each(|v| collect(v));
                if let Some(body) = &http.body_template {
                    visit_strings(body, &mut collect);
                }
            }
            BindingKind::Queue(queue) => {
                collect(&queue.connection);
                queue.headers.values().for_each(|v| collect(v));
            }
            BindingKind::Sql(sql) => collect(&sql.connection),
            BindingKind::Grpc(grpc) => collect(&grpc.endpoint),
        }

        names.sort();
        names.dedup();
        names
    }

    fn analyze(raw: &Value, mode: ValidationMode) -> (Option<Self>, ValidationReport) {
        let mut report = ValidationReport::default();

        let Some(fields) = raw.as_object() else {
            report
                .errors
                .push("binding declaration must be a mapping".to_string());
            return (None, report);
        };

        let type_name = match fields.get("type") {
            None => Err("missing required field 'type'".to_string()),
            Some(Value::String(t)) if SUPPORTED_TYPES.contains(&t.as_str()) => Ok(t.as_str()),
            Some(Value::String(t)) => Err(format!(
                "Unsupported binding type '{t}'. Supported types: {}",
                SUPPORTED_TYPES.join(", ")
            )),
            Some(_) => Err("field 'type' must be a string".to_string()),
        };

        if let Ok(type_name) = &type_name {
            report.errors.extend(unknown_fields(type_name, fields));
        }

        let config = match type_name {
            Ok(type_name) => match serde_json::from_value::<Self>(raw.clone()) {
                Ok(config) => Some(config),
                Err(e) => {
                    report.errors.push(format!("invalid {type_name} binding: {e}"));
                    None
                }
            },
            Err(message) => {
                report.errors.push(message);
                None
            }
        };

        if let Some(config) = &config {
            report.errors.extend(config.structural_errors());
        }
        apply_findings(&mut report, security_findings(raw), mode);

        (config, report)
    }

    fn structural_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.timeout_ms == 0 {
            errors.push("timeout_ms must be greater than 0".to_string());
        }
        if self.retry.max_attempts == 0 {
            errors.push("retry.max_attempts must be at least 1".to_string());
        }
        if !(self.retry.backoff_multiplier >= 1.0 && self.retry.backoff_multiplier.is_finite()) {
            errors.push("retry.backoff_multiplier must be a finite number >= 1.0".to_string());
        }

        match &self.kind {
            BindingKind::Http(http) => http_errors(http, &mut errors),
            BindingKind::Queue(queue) => queue_errors(queue, &mut errors),
            BindingKind::Sql(sql) => sql_errors(sql, &mut errors),
            BindingKind::Grpc(grpc) => {
                for (field, value) in [
                    ("endpoint", &grpc.endpoint),
                    ("service", &grpc.service),
                    ("method", &grpc.method),
                ] {
                    if value.trim().is_empty() {
                        errors.push(format!("grpc binding requires '{field}'"));
                    }
                }
            }
        }

        errors
    }
}

fn http_errors(http: &HttpBinding, errors: &mut Vec<String>) {
    let url = http.url.trim();
    if url.is_empty() {
        errors.push("http binding requires 'url'".to_string());
    } else if !(url.starts_with("http://") || url.starts_with("https://") || url.starts_with("${"))
    {
        errors.push("url must start with http://, https:// or a ${VAR} reference".to_string());
    }

    for name in http.headers.keys() {
        if reqwest::header::HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(format!("invalid header name '{name}'"));
        }
    }

    if http.body_template.is_some() && !http.method.is_mutating() {
        errors.push("body_template is not allowed for GET".to_string());
    }

    let mapping = &http.response_mapping;
    for (field, path) in [("path", &mapping.path), ("error_path", &mapping.error_path)] {
        if let Some(path) = path {
            if let Err(e) = jsonpath::parse(path) {
                errors.push(format!("response_mapping.{field}: {e}"));
            }
        }
    }
    for (code, label) in &mapping.status_codes {
        if !STATUS_KEY.is_match(code) {
            errors.push(format!(
                "response_mapping.status_codes key '{code}' must be a status code like 404 or a class like 4xx"
            ));
        }
        if label.trim().is_empty() {
            errors.push(format!("response_mapping.status_codes['{code}'] has an empty label"));
        }
    }
}

fn queue_errors(queue: &QueueBinding, errors: &mut Vec<String>) {
    credential_field_errors("queue", "connection", &queue.connection, errors);
    if queue.topic.trim().is_empty() {
        errors.push("queue binding requires 'topic'".to_string());
    }
}

fn sql_errors(sql: &SqlBinding, errors: &mut Vec<String>) {
    credential_field_errors("sql", "connection", &sql.connection, errors);

    if sql.max_rows == 0 {
        errors.push("max_rows must be at least 1".to_string());
    }

    if sql.query.trim().is_empty() {
        errors.push("sql binding requires 'query'".to_string());
        return;
    }

    let scan = scan_query(&sql.query);
    for marker in &scan.markers {
        errors.push(format!(
            "query contains interpolation marker '{marker}'; use named :placeholders with parameter_mapping"
        ));
    }
    for placeholder in &scan.placeholders {
        if !sql.parameter_mapping.contains_key(placeholder) {
            errors.push(format!(
                "placeholder ':{placeholder}' has no parameter_mapping entry"
            ));
        }
    }
    for (placeholder, argument) in &sql.parameter_mapping {
        if !scan.placeholders.contains(placeholder) {
            errors.push(format!(
                "parameter_mapping entry '{placeholder}' does not match any placeholder in query"
            ));
        }
        if argument.trim().is_empty() {
            errors.push(format!(
                "parameter_mapping entry '{placeholder}' names no argument"
            ));
        }
    }
    if sql.read_only && scan.is_mutating() {
        errors.push(format!(
            "query contains mutating statement ({}) but read_only is true",
            scan.mutating_keywords.join(", ")
        ));
    }
}

/// Credential-typed fields must be references, in every validation mode.
fn credential_field_errors(binding: &str, field: &str, value: &str, errors: &mut Vec<String>) {
    if value.trim().is_empty() {
        errors.push(format!("{binding} binding requires '{field}'"));
        return;
    }

    let reason = if scan::contains_reference(value) {
        detect_secret(value).map(|finding| finding.to_string())
    } else {
        Some("value contains no ${VAR} reference".to_string())
    };

    if let Some(reason) = reason {
        errors.push(
            CredentialError::PlaintextSecret {
                field: field.to_string(),
                reason,
            }
            .to_string(),
        );
    }
}

fn apply_findings(report: &mut ValidationReport, findings: Vec<String>, mode: ValidationMode) {
    match mode {
        ValidationMode::Strict => report.errors.extend(findings),
        ValidationMode::Lenient => {
            for finding in &findings {
                tracing::warn!(finding = %finding, "Possible secret in binding declaration");
            }
            report.warnings.extend(findings);
        }
    }
}

/// Secret-heuristic findings for every string leaf, prefixed with its path.
#[must_use]
pub fn security_findings(raw: &Value) -> Vec<String> {
    let mut findings = Vec::new();
    walk_secrets(raw, "", true, &mut findings);
    findings
}

fn walk_secrets(value: &Value, at: &str, keyed: bool, findings: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if at.is_empty() {
                    key.clone()
                } else {
                    format!("{at}.{key}")
                };
                // Keys in these maps name placeholders and labels, not secrets
                let child_keyed =
                    keyed && !matches!(key.as_str(), "parameter_mapping" | "response_mapping");
                match child {
                    Value::String(s) => {
                        let finding = if child_keyed {
                            detect_secret_field(key, s)
                        } else {
                            detect_secret(s)
                        };
                        if let Some(finding) = finding {
                            findings.push(format!("{path}: {finding}"));
                        }
                    }
                    other => walk_secrets(other, &path, child_keyed, findings),
                }
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                walk_secrets(item, &format!("{at}[{index}]"), keyed, findings);
            }
        }
        Value::String(s) => {
            if let Some(finding) = detect_secret(s) {
                let at = if at.is_empty() { "value" } else { at };
                findings.push(format!("{at}: {finding}"));
            }
        }
        _ => {}
    }
}

fn visit_strings(value: &Value, visit: &mut impl FnMut(&str)) {
    match value {
        Value::String(s) => visit(s),
        Value::Array(items) => items.iter().for_each(|item| visit_strings(item, visit)),
        Value::Object(map) => map.values().for_each(|item| visit_strings(item, visit)),
        _ => {}
    }
}
