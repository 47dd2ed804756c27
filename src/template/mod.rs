//! Template rendering for message specs.
//!
//! [`create_environment`] builds the filter vocabulary once. The resulting
//! environment is passed by reference to every [`render`] call, together
//! with a [`RenderContext`] that provides:
//!
//! - `library`: the attachment library (see [`filters`] for the queries)
//! - `fake`: a [`fake::Fake`] text generator
//! - `now(format=none)`: the current UTC time, RFC 2822 unless a
//!   `strftime` format is given
//! - `new_id()`: a random UUID
//!
//! ```jinja
//! attach:
//!   {{ library | by_extension("pdf") | sample(2, seed=7) | to_list | indent(2) }}
//! ```

pub mod fake;
pub mod filters;

use std::fmt::Write;

use minijinja::{context, Environment, Error, ErrorKind, UndefinedBehavior, Value};
use tracing::debug;

use crate::error::Result;
use crate::library::AttachmentLibrary;

use self::fake::Fake;

/// Build the template environment with every library filter registered.
pub fn create_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);

    env.add_filter("by_exact_name", filters::by_exact_name);
    env.add_filter("by_contains", filters::by_contains);
    env.add_filter("by_extension", filters::by_extension);
    env.add_filter("by_directory", filters::by_directory);
    env.add_filter("by_size_range", filters::by_size_range);
    env.add_filter("filesize", filters::filesize);
    env.add_filter("sample", filters::sample);
    env.add_filter("to_list", filters::to_list);
    env.add_filter("join_lines", filters::join_lines);
    env.add_filter("to_ascii_text", filters::to_ascii_text);

    env.add_filter("filename", filters::by_exact_name);
    env.add_filter("like", filters::by_contains);
    env.add_filter("filetype", filters::by_extension);
    env.add_filter("directory", filters::by_directory);
    env.add_filter("randomly_pick", filters::sample);
    env.add_filter("to_array", filters::to_list);
    env.add_filter("collapse", filters::join_lines);
    env.add_filter("to_ascii", filters::to_ascii_text);

    env
}

/// Values available to a template while it renders.
#[derive(Debug, Clone)]
pub struct RenderContext {
    library: AttachmentLibrary,
    fake_seed: Option<u64>,
}

impl RenderContext {
    pub fn new(library: AttachmentLibrary) -> Self {
        Self {
            library,
            fake_seed: None,
        }
    }

    /// Seed `fake` so repeated renders produce the same text.
    pub fn with_fake_seed(mut self, seed: Option<u64>) -> Self {
        self.fake_seed = seed;
        self
    }

    pub fn library(&self) -> &AttachmentLibrary {
        &self.library
    }

    fn to_value(&self) -> Value {
        context! {
            library => Value::from_object(self.library.clone()),
            fake => Value::from_object(Fake::new(self.fake_seed)),
            now => Value::from_function(now),
            new_id => Value::from_function(new_id),
        }
    }
}

/// Render `source` with the given context.
pub fn render(env: &Environment<'_>, source: &str, ctx: &RenderContext) -> Result<String> {
    debug!(
        bytes = source.len(),
        attachments = ctx.library.len(),
        "Rendering template"
    );
    Ok(env.render_str(source, ctx.to_value())?)
}

/// Run a filter chain such as `by_extension("pdf") | sample(2, 7)` against
/// the context's library and return the narrowed library.
///
/// An empty chain returns the whole library.
pub fn query(env: &Environment<'_>, filters: &str, ctx: &RenderContext) -> Result<AttachmentLibrary> {
    let filters = filters.trim().trim_start_matches('|').trim();
    if filters.is_empty() {
        return Ok(ctx.library.clone());
    }
    let source = format!("library | {filters}");
    let value = env.compile_expression(&source)?.eval(ctx.to_value())?;
    let library = filters::library_arg(&value, "query")?;
    debug!(filters, matched = library.len(), "Ran library query");
    Ok(std::sync::Arc::unwrap_or_clone(library))
}

fn now(format: Option<&str>) -> std::result::Result<String, Error> {
    let now = chrono::Utc::now();
    let Some(format) = format else {
        return Ok(now.to_rfc2822());
    };
    let mut out = String::new();
    write!(out, "{}", now.format(format)).map_err(|_| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("invalid time format '{format}'"),
        )
    })?;
    Ok(out)
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SmokeError;
    use crate::model::attachment::Attachment;

    fn context() -> RenderContext {
        RenderContext::new(AttachmentLibrary::wrap(vec![
            Attachment::new("root_file_1.txt", 1000),
            Attachment::new("root_file_2.txt", 1000),
            Attachment::new("pdf_file.pdf", 1000),
            Attachment::new("big_file.txt", 2000),
        ]))
    }

    #[test]
    fn test_render_filter_chain() {
        let env = create_environment();
        let out = render(
            &env,
            r#"{{ library | by_exact_name("root_file_1.txt") | to_list }}"#,
            &context(),
        )
        .unwrap();
        assert_eq!(out, "- root_file_1.txt");
    }

    #[test]
    fn test_render_legacy_names() {
        let env = create_environment();
        let out = render(
            &env,
            r#"{{ library | filename("root_file_1.txt") | to_array }}"#,
            &context(),
        )
        .unwrap();
        assert_eq!(out, "- root_file_1.txt");
    }

    #[test]
    fn test_render_library_as_sequence() {
        let env = create_environment();
        let out = render(
            &env,
            "{{ library | length }}:{% for a in library | filesize(minimum='1.5kb') %}{{ a.path }}={{ a.size }}{% endfor %}",
            &context(),
        )
        .unwrap();
        assert_eq!(out, "4:big_file.txt=2000");
    }

    #[test]
    fn test_render_sample_with_keyword_seed() {
        let env = create_environment();
        let template = "{{ library | sample(2, seed=1337) | to_list }}";
        let first = render(&env, template, &context()).unwrap();
        let second = render(&env, template, &context()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.lines().count(), 2);
    }

    #[test]
    fn test_render_type_mismatch() {
        let env = create_environment();
        let err = render(&env, r#"{{ "text" | to_list }}"#, &context()).unwrap_err();
        assert!(matches!(err, SmokeError::Template(_)));
        assert!(err.to_string().contains("to_list"));
    }

    #[test]
    fn test_render_helpers() {
        let env = create_environment();
        let ctx = context().with_fake_seed(Some(5));
        let out = render(
            &env,
            "{{ new_id() | length }} {{ now('%Y') | length }} {{ fake.ascii(12) | length }}",
            &ctx,
        )
        .unwrap();
        assert_eq!(out, "36 4 12");

        let a = render(&env, "{{ fake.sentence() }}", &ctx).unwrap();
        let b = render(&env, "{{ fake.sentence() }}", &ctx).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_render_bad_time_format() {
        let env = create_environment();
        assert!(render(&env, "{{ now('%Q') }}", &context()).is_err());
    }

    #[test]
    fn test_query_filter_chain() {
        let env = create_environment();
        let ctx = context();
        let txt = query(&env, r#"by_extension("txt") | filesize(maximum=1000)"#, &ctx).unwrap();
        assert_eq!(txt.len(), 2);
        assert_eq!(query(&env, "  ", &ctx).unwrap().len(), 4);
        assert_eq!(query(&env, "| sample(3, 1)", &ctx).unwrap().len(), 3);
    }

    #[test]
    fn test_query_must_end_in_a_library() {
        let env = create_environment();
        assert!(query(&env, "to_list", &context()).is_err());
        assert!(query(&env, "by_extension(", &context()).is_err());
    }

    #[test]
    fn test_render_undefined_is_an_error() {
        let env = create_environment();
        assert!(render(&env, "{{ missing }}", &context()).is_err());
    }
}
