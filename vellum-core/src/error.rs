use std::fmt;

// Re-export Span from shared types
pub use vellum_types::Span;

/// Errors that can occur while compiling a vellum document.
#[derive(Debug, thiserror::Error)]
pub enum VellumError {
    #[error("Parse error at {span:?}: {message}")]
    Parse { span: Span, message: String },

    #[error("Frontmatter error: {message}")]
    Frontmatter { message: String },

    #[error("Unresolved reference at {span:?}: no function named '{name}'")]
    UnresolvedReference { span: Span, name: String },

    #[error("Invalid call to '{name}' at {span:?}: {message}")]
    ArityMismatch {
        span: Span,
        name: String,
        message: String,
    },

    #[error("Type mismatch in call to '{name}' at {span:?}: parameter '{parameter}' expects {expected}, got {found}")]
    TypeMismatch {
        span: Span,
        name: String,
        parameter: String,
        expected: String,
        found: String,
    },

    #[error("Invalid lambda invocation: expected {expected} arguments, got {got}")]
    LambdaArityMismatch { expected: usize, got: usize },

    #[error("Runtime error in '{name}' at {span:?}: {message}")]
    Runtime {
        span: Span,
        name: String,
        message: String,
    },

    #[error("Invalid value '{raw}': {message}")]
    IllegalRawValue { raw: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VellumError>;

impl VellumError {
    /// The function the error originates from, if any.
    ///
    /// Errors raised deep inside nested scopes keep the innermost function
    /// name, so the surfaced message always names the call that failed.
    pub fn function_name(&self) -> Option<&str> {
        match self {
            VellumError::UnresolvedReference { name, .. }
            | VellumError::ArityMismatch { name, .. }
            | VellumError::TypeMismatch { name, .. }
            | VellumError::Runtime { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            VellumError::Parse { span, .. }
            | VellumError::UnresolvedReference { span, .. }
            | VellumError::ArityMismatch { span, .. }
            | VellumError::TypeMismatch { span, .. }
            | VellumError::Runtime { span, .. } => Some(*span),
            _ => None,
        }
    }

    pub(crate) fn runtime(span: Span, name: impl Into<String>, message: impl Into<String>) -> Self {
        VellumError::Runtime {
            span,
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Disposition of call-site errors during expansion.
///
/// `Strict` aborts the whole compilation on the first failing call site.
/// `Lenient` replaces the failing call's output with a visible error box and
/// keeps expanding the rest of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    Strict,
    #[default]
    Lenient,
}

/// Display context for better error messages
pub struct ErrorContext<'a> {
    pub source: &'a str,
    pub error: &'a VellumError,
}

impl<'a> ErrorContext<'a> {
    pub fn new(source: &'a str, error: &'a VellumError) -> Self {
        Self { source, error }
    }

    /// Get line and column numbers (1-indexed)
    pub fn line_col(&self) -> Option<(usize, usize)> {
        let span = self.error.span()?;
        let start = span.start.min(self.source.len());

        let line = self.source[..start].matches('\n').count() + 1;
        let line_start = self.source[..start]
            .rfind('\n')
            .map(|pos| pos + 1)
            .unwrap_or(0);
        let col = start - line_start + 1;

        Some((line, col))
    }
}

impl<'a> fmt::Display for ErrorContext<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line_col() {
            Some((line, col)) => {
                writeln!(f, "Error at line {}, column {}:", line, col)?;
                write!(f, "  {}", self.error)
            }
            None => write!(f, "Error: {}", self.error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_name_propagation() {
        let err = VellumError::Runtime {
            span: Span::new(4, 10),
            name: "divide".to_string(),
            message: "division by zero".to_string(),
        };
        assert_eq!(err.function_name(), Some("divide"));
    }

    #[test]
    fn test_error_context_line_col() {
        let source = "first line\n.broken {x}\n";
        let err = VellumError::UnresolvedReference {
            span: Span::new(11, 18),
            name: "broken".to_string(),
        };
        let ctx = ErrorContext::new(source, &err);
        assert_eq!(ctx.line_col(), Some((2, 1)));
    }
}
