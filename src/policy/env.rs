//! Environment variable parsing for policy overrides.

use crate::policy::model::{apply_policy_update, PolicyPath, PolicyUpdate};
use disallowed_errors::{usage, ErrorCode, RuleResult};
use std::env;

/// Environment variable controlling log level for the crate.
pub const ENV_LOG_LEVEL: &str = "DISALLOWED_CALLS_LOG_LEVEL";
/// Environment variable pointing to a log destination file.
pub const ENV_LOG_FILE: &str = "DISALLOWED_CALLS_LOG_FILE";
/// Environment variable enabling JSON error trailers on stderr.
pub const ENV_JSON_ERRORS: &str = "DISALLOWED_CALLS_JSON_ERRORS";

/// Load policy overrides from environment variables.
///
/// Nothing is applied when any variable is invalid.
pub fn configure_policy_from_env() -> RuleResult<()> {
    let mut update = PolicyUpdate::default();

    if let Ok(value) = env::var(ENV_LOG_LEVEL) {
        update.log_level = Some(value);
    }

    if let Ok(value) = env::var(ENV_LOG_FILE) {
        let path = if value.trim().is_empty() {
            PolicyPath::Clear
        } else {
            PolicyPath::Value(value.into())
        };
        update.log_file = Some(path);
    }

    if let Ok(value) = env::var(ENV_JSON_ERRORS) {
        let enabled = parse_bool(&value)
            .map_err(|err| err.with_context("variable", ENV_JSON_ERRORS))?;
        update.json_errors = Some(enabled);
    }

    apply_policy_update(update);
    Ok(())
}

pub(crate) fn parse_bool(value: &str) -> RuleResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" => Ok(true),
        "0" | "false" | "f" | "no" | "n" => Ok(false),
        other => Err(usage!(
            ErrorCode::InvalidConfigValue,
            "invalid boolean value '{}' (expected true/false)",
            other
        )),
    }
}
