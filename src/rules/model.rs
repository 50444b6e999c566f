//! Disallowed-call data models: raw configuration entries and resolved rules.

use crate::rules::keyed::OrderedMap;
use crate::rules::normalize::normalize_call;
use crate::rules::params::{ParamId, ParamMatchers, ParamValue};
use crate::rules::summary;
use disallowed_errors::{usage, ErrorCode, RuleResult};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// One configuration item as written by the user.
///
/// Every field is optional at this level; the factory decides which
/// combinations are valid. Keys meant for other host components (such as
/// `errorIdentifier` or `errorTip`) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisallowedCallConfig {
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub allow_in: Option<Vec<String>>,
    #[serde(default)]
    pub allow_in_functions: Option<Vec<String>>,
    #[serde(default)]
    pub allow_in_methods: Option<Vec<String>>,
    #[serde(default)]
    pub allow_params_in_allowed: Option<OrderedMap<ParamId, ParamValue>>,
    #[serde(default)]
    pub allow_params_in_allowed_any_value: Option<Vec<ParamId>>,
    #[serde(default)]
    pub allow_params_anywhere: Option<OrderedMap<ParamId, ParamValue>>,
    #[serde(default)]
    pub allow_params_anywhere_any_value: Option<Vec<ParamId>>,
    #[serde(default)]
    pub allow_except_params: Option<OrderedMap<ParamId, ParamValue>>,
    #[serde(default)]
    pub allow_except_case_insensitive_params: Option<OrderedMap<ParamId, ParamValue>>,
}

impl DisallowedCallConfig {
    /// Configured call name: `function` first, then `method`; empty strings count as unset.
    pub fn call_name(&self) -> Option<&str> {
        non_empty(self.function.as_deref()).or_else(|| non_empty(self.method.as_deref()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// A forbidden call signature handed to the host analysis engine.
#[derive(Debug, Clone, PartialEq)]
pub struct DisallowedCall {
    pub(crate) call: String,
    pub(crate) message: Option<String>,
    pub(crate) allow_in: Vec<String>,
    pub(crate) allow_in_calls: Vec<String>,
    pub(crate) allow_params_in_allowed: ParamMatchers,
    pub(crate) allow_params_anywhere: ParamMatchers,
    pub(crate) allow_except_params: ParamMatchers,
}

impl DisallowedCall {
    /// Normalised call name, also used as the de-duplication key.
    pub fn key(&self) -> &str {
        &self.call
    }

    pub fn call(&self) -> &str {
        &self.call
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Path matchers where the call is permitted.
    pub fn allow_in(&self) -> &[String] {
        &self.allow_in
    }

    /// Normalised names of calls that may contain this call.
    pub fn allow_in_calls(&self) -> &[String] {
        &self.allow_in_calls
    }

    /// Parameter exceptions that apply inside [`Self::allow_in_calls`].
    pub fn allow_params_in_allowed(&self) -> &ParamMatchers {
        &self.allow_params_in_allowed
    }

    /// Parameter exceptions that apply regardless of the calling context.
    pub fn allow_params_anywhere(&self) -> &ParamMatchers {
        &self.allow_params_anywhere
    }

    pub fn allow_except_params(&self) -> &ParamMatchers {
        &self.allow_except_params
    }

    /// Whether `caller` (normalised before comparison) may contain this call.
    pub fn is_allowed_in_call(&self, caller: &str) -> bool {
        let caller = normalize_call(caller);
        self.allow_in_calls.iter().any(|allowed| *allowed == caller)
    }

    /// Compile [`Self::allow_in`] into a glob set.
    pub fn allow_in_globs(&self) -> RuleResult<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.allow_in {
            let glob = Glob::new(pattern).map_err(|err| {
                usage!(
                    ErrorCode::InvalidGlob,
                    "invalid 'allowIn' pattern '{}' for '{}'",
                    pattern,
                    self.call
                )
                .with_source(err)
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|err| {
            usage!(
                ErrorCode::InvalidGlob,
                "failed to compile 'allowIn' patterns for '{}'",
                self.call
            )
            .with_source(err)
        })
    }

    /// Whether `path` matches any [`Self::allow_in`] pattern.
    pub fn is_allowed_path(&self, path: &Path) -> RuleResult<bool> {
        if self.allow_in.is_empty() {
            return Ok(false);
        }
        Ok(self.allow_in_globs()?.is_match(path))
    }
}

/// Host configuration list a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallCategory {
    Function,
    Method,
    Static,
}

impl CallCategory {
    pub const ALL: [CallCategory; 3] = [
        CallCategory::Function,
        CallCategory::Method,
        CallCategory::Static,
    ];

    /// Name of the configuration list holding entries of this category.
    pub fn parameter(self) -> &'static str {
        match self {
            CallCategory::Function => "disallowedFunctionCalls",
            CallCategory::Method => "disallowedMethodCalls",
            CallCategory::Static => "disallowedStaticCalls",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CallCategory::Function => "function",
            CallCategory::Method => "method",
            CallCategory::Static => "static",
        }
    }
}

/// Source document that contributed entries to a rule set.
#[derive(Debug, Clone)]
pub struct RuleSource {
    pub path: PathBuf,
    pub sha256: String,
    pub function_entries: usize,
    pub method_entries: usize,
    pub static_entries: usize,
}

impl RuleSource {
    pub fn entries(&self, category: CallCategory) -> usize {
        match category {
            CallCategory::Function => self.function_entries,
            CallCategory::Method => self.method_entries,
            CallCategory::Static => self.static_entries,
        }
    }
}

/// Summary of the sources behind a rule set, for diagnostics.
#[derive(Debug, Clone)]
pub struct RuleSetSummary {
    pub entries: Vec<RuleSetSummaryEntry>,
}

/// Single entry in the rule set summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSetSummaryEntry {
    pub path: PathBuf,
    pub sha256: String,
    pub entries: usize,
}

/// Translated rules for every category, ready for the host engine.
#[derive(Debug, Clone)]
pub struct DisallowedCallSet {
    pub(crate) function_calls: Vec<DisallowedCall>,
    pub(crate) method_calls: Vec<DisallowedCall>,
    pub(crate) static_calls: Vec<DisallowedCall>,
    pub(crate) sources: Vec<RuleSource>,
}

impl DisallowedCallSet {
    pub fn function_calls(&self) -> &[DisallowedCall] {
        &self.function_calls
    }

    pub fn method_calls(&self) -> &[DisallowedCall] {
        &self.method_calls
    }

    pub fn static_calls(&self) -> &[DisallowedCall] {
        &self.static_calls
    }

    pub fn calls(&self, category: CallCategory) -> &[DisallowedCall] {
        match category {
            CallCategory::Function => &self.function_calls,
            CallCategory::Method => &self.method_calls,
            CallCategory::Static => &self.static_calls,
        }
    }

    /// Documents ingested to build this set, in ingestion order.
    pub fn sources(&self) -> &[RuleSource] {
        &self.sources
    }

    pub fn summary(&self) -> RuleSetSummary {
        summary::build_summary(&self.sources)
    }
}
