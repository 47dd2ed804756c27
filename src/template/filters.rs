//! Template filters over attachment libraries.
//!
//! Templates see the library as a plain value, so every filter that needs a
//! library first goes through [`library_arg`], the one place where the
//! template value is checked and turned back into an [`AttachmentLibrary`].

use std::sync::Arc;

use minijinja::value::{Enumerator, Kwargs, Object, ObjectRepr, Value, ValueKind};
use minijinja::{Error, ErrorKind};
use tracing::debug;

use crate::error::SmokeError;
use crate::library::AttachmentLibrary;
use crate::parser::size::parse_size;

/// Libraries behave like a list of `{path, size}` maps inside templates, so
/// `{% for a in library %}`, `library[0].path` and `library | length` work.
impl Object for AttachmentLibrary {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Seq
    }

    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let idx = usize::try_from(key.clone()).ok()?;
        self.attachments().get(idx).map(Value::from_serialize)
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Seq(self.len())
    }
}

/// Check that a filter argument is a library and return it.
pub fn library_arg(value: &Value, filter: &str) -> Result<Arc<AttachmentLibrary>, Error> {
    value.downcast_object::<AttachmentLibrary>().ok_or_else(|| {
        SmokeError::TypeMismatch {
            filter: filter.to_string(),
            found: value.kind().to_string(),
        }
        .into()
    })
}

fn wrap(library: AttachmentLibrary) -> Value {
    Value::from_object(library)
}

// ── Library queries ─────────────────────────────────────────────

pub fn by_exact_name(library: &Value, name: &str) -> Result<Value, Error> {
    Ok(wrap(library_arg(library, "by_exact_name")?.by_exact_name(name)))
}

pub fn by_contains(library: &Value, term: &str) -> Result<Value, Error> {
    Ok(wrap(library_arg(library, "by_contains")?.by_contains(term)))
}

pub fn by_extension(library: &Value, ext: &str) -> Result<Value, Error> {
    Ok(wrap(library_arg(library, "by_extension")?.by_extension(ext)))
}

pub fn by_directory(library: &Value, dir: &str) -> Result<Value, Error> {
    Ok(wrap(library_arg(library, "by_directory")?.by_directory(dir)))
}

/// Byte bounds as integers. A missing or zero maximum means unbounded.
pub fn by_size_range(
    library: &Value,
    min_bytes: u64,
    max_bytes: Option<u64>,
) -> Result<Value, Error> {
    let library = library_arg(library, "by_size_range")?;
    Ok(wrap(library.by_size_range(min_bytes, max_bytes.unwrap_or(0))))
}

/// Size bounds as human-readable strings (`"1.5kb"`, `"2 MiB"`) or integers.
///
/// `minimum` and `maximum` may be given positionally or as keywords and
/// both default to 0. A zero maximum means unbounded.
pub fn filesize(
    library: &Value,
    minimum: Option<Value>,
    maximum: Option<Value>,
    kwargs: Kwargs,
) -> Result<Value, Error> {
    let library = library_arg(library, "filesize")?;
    let minimum = kwargs.get::<Option<Value>>("minimum")?.or(minimum);
    let maximum = kwargs.get::<Option<Value>>("maximum")?.or(maximum);
    kwargs.assert_all_used()?;

    let min_bytes = size_value(minimum.as_ref())?;
    let max_bytes = size_value(maximum.as_ref())?;
    Ok(wrap(library.by_size_range(min_bytes, max_bytes)))
}

fn size_value(value: Option<&Value>) -> Result<u64, Error> {
    let Some(value) = value else {
        return Ok(0);
    };
    match value.kind() {
        ValueKind::Undefined | ValueKind::None => Ok(0),
        ValueKind::Number => u64::try_from(value.clone()).map_err(|_| {
            SmokeError::invalid_format(&value.to_string(), "size must be a whole, non-negative number")
                .into()
        }),
        _ => match value.as_str() {
            Some(text) => Ok(parse_size(text)?),
            None => Err(SmokeError::invalid_format(
                &value.to_string(),
                format!("expected a size string, got {}", value.kind()),
            )
            .into()),
        },
    }
}

/// Random pick of `count` attachments.
///
/// Without a seed one is drawn at random and logged, so a run can be
/// reproduced from the debug log.
pub fn sample(
    library: &Value,
    count: Option<usize>,
    seed: Option<u64>,
    kwargs: Kwargs,
) -> Result<Value, Error> {
    let library = library_arg(library, "sample")?;
    let count = match kwargs.get::<Option<usize>>("count")?.or(count) {
        Some(count) => count,
        None => {
            return Err(Error::new(
                ErrorKind::MissingArgument,
                "sample needs the number of attachments to pick",
            ))
        }
    };
    let seed = match kwargs.get::<Option<u64>>("seed")?.or(seed) {
        Some(seed) => seed,
        None => {
            let seed = rand::random::<u64>();
            debug!(seed, count, "No sample seed given, drew one");
            seed
        }
    };
    kwargs.assert_all_used()?;

    Ok(wrap(library.sample(count, seed)?))
}

// ── Rendering helpers ───────────────────────────────────────────

/// One `- <path>` line per attachment, ready to drop into a YAML list.
pub fn to_list(library: &Value) -> Result<String, Error> {
    let library = library_arg(library, "to_list")?;
    Ok(library
        .iter()
        .map(|a| format!("- {}", a.display_path()))
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Join items into one string. The default separator indents continuation
/// lines by two spaces, which keeps YAML block scalars intact.
pub fn join_lines(items: &Value, separator: Option<&str>) -> Result<String, Error> {
    let separator = separator.unwrap_or("\n  ");
    Ok(items
        .try_iter()?
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(separator))
}

/// Force arbitrary bytes into ASCII by taking each byte modulo 128.
///
/// Accepts bytes, strings, or a sequence of integers.
pub fn to_ascii_text(value: &Value) -> Result<String, Error> {
    if let Some(bytes) = value.as_bytes() {
        return Ok(bytes.iter().map(|&b| char::from(b % 128)).collect());
    }
    value
        .try_iter()?
        .map(|item| {
            i64::try_from(item.clone())
                .map(|n| char::from(n.rem_euclid(128) as u8))
                .map_err(|_| {
                    Error::new(
                        ErrorKind::InvalidOperation,
                        format!("to_ascii_text expects integers, got {}", item.kind()),
                    )
                })
        })
        .collect()
}
