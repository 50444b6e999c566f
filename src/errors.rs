//! Shared helpers for presenting `RuleError` to hosts.

use std::fmt::Write as _;

use disallowed_errors::{RuleError, RuleResult};

/// Convenient alias for results used across the crate.
pub type Result<T> = RuleResult<T>;

/// Render an error with its stable code, context payload, and cause.
pub fn render_error(err: &RuleError) -> String {
    let mut message = err.to_string();
    if let Some(source) = err.source_ref() {
        let _ = write!(&mut message, ": caused by {}", source);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use disallowed_errors::{enverr, ErrorCode};
    use std::io;

    #[test]
    fn render_includes_context_and_cause() {
        let err = enverr!(ErrorCode::Io, "failed to read 'rules.toml'")
            .with_context("path", "rules.toml")
            .with_source(io::Error::new(io::ErrorKind::NotFound, "no such file"));
        assert_eq!(
            render_error(&err),
            "[ERR_IO] failed to read 'rules.toml' (path=rules.toml): caused by no such file"
        );
    }
}
