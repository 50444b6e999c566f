//! Rule set summaries used for diagnostics output.

use crate::rules::model::{CallCategory, RuleSetSummary, RuleSetSummaryEntry, RuleSource};

/// Build a summary object from the ingested sources list.
pub fn build_summary(sources: &[RuleSource]) -> RuleSetSummary {
    let entries = sources
        .iter()
        .map(|source| RuleSetSummaryEntry {
            path: source.path.clone(),
            sha256: source.sha256.clone(),
            entries: CallCategory::ALL
                .iter()
                .map(|category| source.entries(*category))
                .sum(),
        })
        .collect();
    RuleSetSummary { entries }
}
