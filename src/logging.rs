//! Diagnostics utilities: structured logging and JSON error trailers.

mod logger;
mod trailer;

pub use logger::{init_rust_logging_with_default, log_rule_error, with_error_code};
pub use trailer::emit_error_trailer;

#[cfg(test)]
pub use trailer::set_error_trailer_writer_for_tests;

use crate::policy::RulesPolicy;

pub fn apply_policy(policy: &RulesPolicy) {
    logger::apply_logger_policy(policy);
    trailer::set_json_errors_enabled(policy.json_errors);
}

/// Report `err` through the logger and, when enabled, as a JSON trailer.
pub fn report_rule_error(label: &str, err: &disallowed_errors::RuleError) {
    log_rule_error(label, err);
    emit_error_trailer(err);
}
