//! Policy data structures and in-memory management.

use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::RwLock;

static POLICY: OnceCell<RwLock<RulesPolicy>> = OnceCell::new();

fn policy_cell() -> &'static RwLock<RulesPolicy> {
    POLICY.get_or_init(|| RwLock::new(RulesPolicy::default()))
}

/// Process-wide runtime configuration for rule loading diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RulesPolicy {
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
    pub json_errors: bool,
}

impl RulesPolicy {
    pub(crate) fn apply_update(&mut self, update: PolicyUpdate) {
        if let Some(level) = update.log_level {
            self.log_level = match level.trim() {
                "" => None,
                other => Some(other.to_string()),
            };
        }
        if let Some(path) = update.log_file {
            self.log_file = match path {
                PolicyPath::Clear => None,
                PolicyPath::Value(pb) => Some(pb),
            };
        }
        if let Some(json_errors) = update.json_errors {
            self.json_errors = json_errors;
        }
    }
}

/// Requested change to a path-valued setting.
#[derive(Debug, Clone)]
pub enum PolicyPath {
    Clear,
    Value(PathBuf),
}

/// Mutation record for the policy; `None` leaves a setting untouched.
#[derive(Debug, Default, Clone)]
pub struct PolicyUpdate {
    pub log_level: Option<String>,
    pub log_file: Option<PolicyPath>,
    pub json_errors: Option<bool>,
}

/// Snapshot the current policy.
pub fn policy_snapshot() -> RulesPolicy {
    match policy_cell().read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Apply the provided update to the global policy and propagate logging changes.
pub fn apply_policy_update(update: PolicyUpdate) {
    let mut guard = match policy_cell().write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    guard.apply_update(update);
    crate::logging::apply_policy(&guard);
}

#[cfg(test)]
pub(crate) fn reset_policy_for_tests() {
    apply_policy_update(PolicyUpdate {
        log_level: Some(String::new()),
        log_file: Some(PolicyPath::Clear),
        json_errors: Some(false),
    });
}
