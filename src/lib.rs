//! Translate "disallowed call" configuration into rule objects for a static-analysis host.
//!
//! The host hands over configuration entries (typically deserialised from its own
//! config files) and receives [`DisallowedCall`] rules, one per normalised call name.
//! [`load_disallowed_calls`] wraps the document loader with logging and error
//! reporting for hosts that want the whole pipeline.

pub mod errors;
pub mod logging;
pub mod policy;
pub mod rules;

pub use crate::errors::Result;
pub use crate::rules::model::{
    CallCategory, DisallowedCall, DisallowedCallConfig, DisallowedCallSet, RuleSetSummary,
    RuleSetSummaryEntry, RuleSource,
};
pub use crate::rules::factory::{translate, DisallowedCallFactory};
pub use crate::rules::loader::RuleSetLoader;
pub use crate::rules::normalize::normalize_call;
pub use crate::rules::params::{ParamId, ParamMatcher, ParamMatchers, ParamValue};
pub use disallowed_errors::{ErrorCode, ErrorKind, RuleError, RuleResult};

use std::path::PathBuf;

/// Default log filter when neither `RUST_LOG` nor the policy sets one.
pub const DEFAULT_LOG_FILTER: &str = "disallowed_calls=warn";

/// Load rule documents with logging and policy initialised from the environment.
///
/// Failures are logged and, when JSON errors are enabled, written as a trailer
/// before being returned.
pub fn load_disallowed_calls(
    inline: &[(&str, &str)],
    paths: &[PathBuf],
) -> RuleResult<DisallowedCallSet> {
    logging::init_rust_logging_with_default(DEFAULT_LOG_FILTER);
    let result = policy::configure_policy_from_env()
        .and_then(|()| DisallowedCallSet::from_inline_and_paths(inline, paths));
    if let Err(err) = &result {
        logging::report_rule_error("failed to load disallowed calls", err);
    }
    result
}
