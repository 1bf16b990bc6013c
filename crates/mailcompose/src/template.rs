//! Lazily rendered section bodies.

/// Values passed to a template at render time.
pub type Locals = serde_json::Map<String, serde_json::Value>;

/// Error reported by a template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TemplateError {
    message: String,
}

impl TemplateError {
    /// Creates a template error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Renders a section body from locals.
///
/// Rendering happens while the message is being encoded, not when the
/// section is added. Any `Fn(&Locals) -> Result<Vec<u8>, TemplateError>`
/// closure is a template:
///
/// ```
/// use mailcompose::{Locals, Template, TemplateError};
///
/// let greeting = |locals: &Locals| -> Result<Vec<u8>, TemplateError> {
///     let name = locals
///         .get("name")
///         .and_then(|v| v.as_str())
///         .ok_or_else(|| TemplateError::new("missing name"))?;
///     Ok(format!("Hello, {name}!").into_bytes())
/// };
///
/// let mut locals = Locals::new();
/// locals.insert("name".into(), "Ada".into());
/// assert_eq!(greeting.render(&locals).unwrap(), b"Hello, Ada!");
/// ```
pub trait Template: Send + Sync {
    /// Renders the template into raw body bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`TemplateError`] if rendering fails.
    fn render(&self, locals: &Locals) -> Result<Vec<u8>, TemplateError>;
}

impl<F> Template for F
where
    F: Fn(&Locals) -> Result<Vec<u8>, TemplateError> + Send + Sync,
{
    fn render(&self, locals: &Locals) -> Result<Vec<u8>, TemplateError> {
        self(locals)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    struct Static(&'static str);

    impl Template for Static {
        fn render(&self, _locals: &Locals) -> Result<Vec<u8>, TemplateError> {
            Ok(self.0.as_bytes().to_vec())
        }
    }

    #[test]
    fn test_struct_template() {
        let template = Static("fixed");
        assert_eq!(template.render(&Locals::new()).unwrap(), b"fixed");
    }

    #[test]
    fn test_closure_template_error() {
        let failing = |_: &Locals| -> Result<Vec<u8>, TemplateError> {
            Err(TemplateError::new("boom"))
        };
        let err = failing.render(&Locals::new()).unwrap_err();
        assert_eq!(err.message(), "boom");
        assert_eq!(err.to_string(), "boom");
    }
}
