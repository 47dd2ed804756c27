//! Message specs: YAML documents describing one test message.
//!
//! A spec is rendered as a template first, so it can pull attachments from
//! the library and filler text from `fake`, and is parsed as YAML after:
//!
//! ```yaml
//! headers:
//!   from: Smoke Bot <bot@example.com>
//!   to: [inbox@example.com]
//!   subject: "{{ fake.sentence(4) }}"
//! body: |
//!   {{ fake.paragraph() }}
//! attach:
//!   {{ library | by_extension("pdf") | sample(1, seed=3) | to_list }}
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use minijinja::Environment;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::error::{Result, SmokeError};
use crate::template::{self, RenderContext};

/// A parsed message spec.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Spec {
    /// Message headers.
    #[serde(default)]
    pub headers: MessageHeaders,

    /// Plain-text body.
    pub body: String,

    /// Files to attach, in order. An empty `attach:` key means none.
    #[serde(deserialize_with = "null_as_empty")]
    pub attach: Vec<PathBuf>,
}

/// Headers of a spec. Address lists accept a single string or a list.
/// Any other key is passed through as a custom header.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageHeaders {
    #[serde(default, alias = "From", deserialize_with = "opt_scalar")]
    pub from: Option<String>,

    #[serde(default, alias = "To", deserialize_with = "one_or_many")]
    pub to: Vec<String>,

    #[serde(default, alias = "Cc", deserialize_with = "one_or_many")]
    pub cc: Vec<String>,

    #[serde(default, alias = "Bcc", deserialize_with = "one_or_many")]
    pub bcc: Vec<String>,

    #[serde(default, alias = "Reply-To", deserialize_with = "opt_scalar")]
    pub reply_to: Option<String>,

    #[serde(default, alias = "Subject", deserialize_with = "opt_scalar")]
    pub subject: Option<String>,

    /// Any date format the message builder understands; defaults to now.
    #[serde(default, alias = "Date", deserialize_with = "opt_scalar")]
    pub date: Option<String>,

    #[serde(default, alias = "Message-ID", deserialize_with = "opt_scalar")]
    pub message_id: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Scalar>,
}

/// A YAML scalar kept as text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Text(v) => f.write_str(v),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(Scalar),
    Many(Vec<Scalar>),
}

fn opt_scalar<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|s| s.to_string()))
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s.to_string()],
        Some(OneOrMany::Many(list)) => list.into_iter().map(|s| s.to_string()).collect(),
    })
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<PathBuf>, D::Error> {
    Ok(Option::<Vec<PathBuf>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse an already-rendered spec.
pub fn parse_spec(yaml: &str) -> Result<Spec> {
    let spec: Spec = serde_yaml::from_str(yaml)?;
    debug!(
        attachments = spec.attach.len(),
        body_bytes = spec.body.len(),
        "Parsed spec"
    );
    Ok(spec)
}

/// Render a spec template and parse the result.
pub fn from_yaml(env: &Environment<'_>, spec_yaml: &str, ctx: &RenderContext) -> Result<Spec> {
    let rendered = template::render(env, spec_yaml, ctx)?;
    parse_spec(&rendered)
}

/// Read, render and parse a spec file.
pub fn from_file(env: &Environment<'_>, path: &Path, ctx: &RenderContext) -> Result<Spec> {
    let source = std::fs::read_to_string(path).map_err(|e| SmokeError::io(path, e))?;
    from_yaml(env, &source, ctx).map_err(|e| match e {
        SmokeError::Yaml(inner) => {
            SmokeError::InvalidSpec(format!("{}: {inner}", path.display()))
        }
        other => other,
    })
}
