//! Runtime configuration policy for rule loading diagnostics.

mod env;
mod model;

pub use env::{configure_policy_from_env, ENV_JSON_ERRORS, ENV_LOG_FILE, ENV_LOG_LEVEL};
pub use model::{apply_policy_update, policy_snapshot, PolicyPath, PolicyUpdate, RulesPolicy};

#[cfg(test)]
pub(crate) use model::reset_policy_for_tests;

/// Serialises tests that touch the process-wide policy or environment.
#[cfg(test)]
pub(crate) fn test_lock() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::Mutex;
    static LOCK: Mutex<()> = Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
