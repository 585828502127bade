//! Action payload normalization
//!
//! An action entry's value is either a scalar shorthand (`click: "#save"`)
//! or an options mapping (`click: { selector: "#save", timeout: 5000 }`).
//! Both forms are folded into one [`Payload`] when the document is parsed,
//! so handlers never look at raw YAML.

use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_yaml::Value;

/// Scalar shorthand value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Number(serde_yaml::Number),
    Bool(bool),
}

impl Scalar {
    fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }
}

/// Options recognized in the explicit form. Unknown keys are rejected so a
/// typo like `timout` cannot silently fall back to the default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PayloadOptions {
    #[serde(default, deserialize_with = "scalar_option")]
    pub selector: Option<String>,
    #[serde(default, deserialize_with = "scalar_option")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "scalar_option")]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "scalar_option")]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "scalar_option")]
    pub pattern: Option<String>,
    #[serde(default, deserialize_with = "scalar_option")]
    pub class: Option<String>,
    pub count: Option<u64>,
    pub min: Option<u64>,
    /// Maximum wait in milliseconds
    pub timeout: Option<u64>,
    pub force: Option<bool>,
}

/// String option that also takes a number or boolean, spelled the way the
/// shorthand form spells it
fn scalar_option<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(Scalar::Text(s).as_text())),
        Some(Value::Number(n)) => Ok(Some(Scalar::Number(n).as_text())),
        Some(Value::Bool(b)) => Ok(Some(Scalar::Bool(b).as_text())),
        Some(_) => Err(de::Error::custom("expected a string, number or boolean")),
    }
}

/// Normalized payload of one action entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    pub scalar: Option<Scalar>,
    pub options: PayloadOptions,
}

impl Payload {
    /// Normalize a raw YAML value
    pub fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::String(s) => Ok(Self::scalar(Scalar::Text(s))),
            Value::Number(n) => Ok(Self::scalar(Scalar::Number(n))),
            Value::Bool(b) => Ok(Self::scalar(Scalar::Bool(b))),
            Value::Mapping(_) => {
                let options: PayloadOptions =
                    serde_yaml::from_value(value).map_err(|e| e.to_string())?;
                Ok(Self {
                    scalar: None,
                    options,
                })
            }
            Value::Sequence(_) => Err("expected a scalar or a mapping, found a list".to_string()),
            Value::Tagged(tagged) => Err(format!("unsupported tagged value {}", tagged.tag)),
        }
    }

    pub fn scalar(scalar: Scalar) -> Self {
        Self {
            scalar: Some(scalar),
            options: PayloadOptions::default(),
        }
    }

    /// Shorthand payload holding a string
    pub fn text_shorthand(s: &str) -> Self {
        Self::scalar(Scalar::Text(s.to_string()))
    }

    fn scalar_text(&self) -> Option<String> {
        self.scalar.as_ref().map(Scalar::as_text)
    }

    /// `selector` option, or the shorthand scalar
    pub fn selector(&self) -> Option<String> {
        self.options.selector.clone().or_else(|| self.scalar_text())
    }

    /// `text` option, or the shorthand scalar
    pub fn text(&self) -> Option<String> {
        self.options.text.clone().or_else(|| self.scalar_text())
    }

    /// `value` option, or the shorthand scalar
    pub fn value(&self) -> Option<String> {
        self.options.value.clone().or_else(|| self.scalar_text())
    }

    /// `path` (or `value`) option, or the shorthand scalar
    pub fn path(&self) -> Option<String> {
        self.options
            .path
            .clone()
            .or_else(|| self.options.value.clone())
            .or_else(|| self.scalar_text())
    }

    /// `pattern` option, or the shorthand scalar
    pub fn pattern(&self) -> Option<String> {
        self.options.pattern.clone().or_else(|| self.scalar_text())
    }

    /// Boolean shorthand (`sidebar: true`); `"true"`/`"false"` strings count too
    pub fn flag(&self) -> Option<bool> {
        match &self.scalar {
            Some(Scalar::Bool(b)) => Some(*b),
            Some(Scalar::Text(s)) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn force(&self) -> bool {
        self.options.force.unwrap_or(false)
    }

    /// Explicit `timeout` in milliseconds, otherwise `default`
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.options
            .timeout
            .map(Duration::from_millis)
            .unwrap_or(default)
    }
}
