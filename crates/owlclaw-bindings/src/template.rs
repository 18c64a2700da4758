//! Single-pass template rendering.
//!
//! `{param}` is replaced by a tool argument and `${VAR}` by a resolved
//! credential. Both kinds are found in one scan of the template, so text
//! inserted for one token is never scanned again.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::credentials::CredentialResolver;
use crate::error::BindingError;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .expect("valid template regex")
});

static WHOLE_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{([A-Za-z_][A-Za-z0-9_]*)\}$").expect("valid param regex"));

/// Text form of an argument: strings verbatim, everything else as JSON.
#[must_use]
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn argument<'a>(params: &'a Map<String, Value>, name: &str) -> Result<&'a Value, BindingError> {
    params.get(name).ok_or_else(|| {
        BindingError::InvalidParameters(format!("missing argument '{name}' required by template"))
    })
}

/// How `${VAR}` tokens are treated while rendering.
#[derive(Debug, Clone, Copy)]
pub enum Credentials<'a> {
    /// Substitute resolved values.
    Resolve(&'a CredentialResolver),
    /// Leave references as written, for previews and shadow results.
    Redact,
}

impl Credentials<'_> {
    fn substitute(self, name: &str, out: &mut String) -> Result<(), BindingError> {
        match self {
            Self::Resolve(resolver) => out.push_str(resolver.lookup(name)?.expose()),
            Self::Redact => {
                out.push_str("${");
                out.push_str(name);
                out.push('}');
            }
        }
        Ok(())
    }
}

impl<'a> From<&'a CredentialResolver> for Credentials<'a> {
    fn from(resolver: &'a CredentialResolver) -> Self {
        Self::Resolve(resolver)
    }
}

/// Render a text template.
///
/// # Errors
///
/// Returns `InvalidParameters` for a missing argument, or `Credential` for
/// an unresolved reference.
pub fn render<'a>(
    template: &str,
    params: &Map<String, Value>,
    credentials: impl Into<Credentials<'a>>,
) -> Result<String, BindingError> {
    let credentials = credentials.into();
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in TOKEN.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);

        if let Some(var) = caps.get(1) {
            credentials.substitute(var.as_str(), &mut out)?;
        } else if let Some(param) = caps.get(2) {
            out.push_str(&value_to_text(argument(params, param.as_str())?));
        }

        last = whole.end();
    }

    out.push_str(&template[last..]);
    Ok(out)
}

/// Render a JSON body template leaf by leaf.
///
/// A string leaf that is exactly `{param}` becomes the typed argument value;
/// other strings are rendered as text. Object keys are left as written.
///
/// # Errors
///
/// Same as [`render`].
pub fn render_value<'a>(
    template: &Value,
    params: &Map<String, Value>,
    credentials: impl Into<Credentials<'a>>,
) -> Result<Value, BindingError> {
    render_value_with(template, params, credentials.into())
}

fn render_value_with(
    template: &Value,
    params: &Map<String, Value>,
    credentials: Credentials<'_>,
) -> Result<Value, BindingError> {
    Ok(match template {
        Value::String(s) => match WHOLE_PARAM.captures(s).and_then(|c| c.get(1)) {
            Some(name) => argument(params, name.as_str())?.clone(),
            None => Value::String(render(s, params, credentials)?),
        },
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| render_value_with(item, params, credentials))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), render_value_with(v, params, credentials)?)))
                .collect::<Result<_, BindingError>>()?,
        ),
        other => other.clone(),
    })
}

/// Render every header value.
///
/// # Errors
///
/// Same as [`render`].
pub fn render_headers<'a>(
    headers: &BTreeMap<String, String>,
    params: &Map<String, Value>,
    credentials: impl Into<Credentials<'a>>,
) -> Result<Vec<(String, String)>, BindingError> {
    let credentials = credentials.into();
    headers
        .iter()
        .map(|(name, value)| Ok((name.clone(), render(value, params, credentials)?)))
        .collect()
}
