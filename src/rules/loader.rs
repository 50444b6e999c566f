//! Rule document loader (TOML/JSON ingestion, per-category aggregation).

use crate::rules::factory::DisallowedCallFactory;
use crate::rules::model::{
    CallCategory, DisallowedCall, DisallowedCallConfig, DisallowedCallSet, RuleSource,
};
use disallowed_errors::{enverr, usage, ErrorCode, RuleResult};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Helper aggregating inline and file sources into a translated rule set.
#[derive(Default)]
pub struct RuleSetLoader {
    function_calls: Vec<DisallowedCallConfig>,
    method_calls: Vec<DisallowedCallConfig>,
    static_calls: Vec<DisallowedCallConfig>,
    sources: Vec<RuleSource>,
}

impl RuleSetLoader {
    /// Ingest a rule document from the filesystem. `.json` files are parsed as
    /// JSON, everything else as TOML.
    pub fn ingest_file(&mut self, path: &Path) -> RuleResult<()> {
        let contents = fs::read_to_string(path).map_err(|err| {
            enverr!(
                ErrorCode::Io,
                "failed to read disallowed-call config '{}'",
                path.display()
            )
            .with_context("path", path.display().to_string())
            .with_source(err)
        })?;

        let format = DocumentFormat::for_path(path);
        self.ingest_source(path, &contents, format)
    }

    /// Ingest an inline TOML document (used for bundled defaults).
    pub fn ingest_inline(&mut self, label: &str, contents: &str) -> RuleResult<()> {
        let pseudo_path = PathBuf::from(format!("<inline:{label}>"));
        self.ingest_source(&pseudo_path, contents, DocumentFormat::Toml)
    }

    /// Number of documents ingested so far.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Translate every category, producing the resolved rule set.
    pub fn finish(self) -> RuleResult<DisallowedCallSet> {
        if self.sources.is_empty() {
            return Err(usage!(
                ErrorCode::InvalidConfigValue,
                "no disallowed-call sources were ingested"
            ));
        }

        let factory = DisallowedCallFactory::new();
        let function_calls =
            translate_category(&factory, CallCategory::Function, &self.function_calls)?;
        let method_calls = translate_category(&factory, CallCategory::Method, &self.method_calls)?;
        let static_calls = translate_category(&factory, CallCategory::Static, &self.static_calls)?;

        log::info!(
            function_rules = function_calls.len(),
            method_rules = method_calls.len(),
            static_rules = static_calls.len(),
            sources = self.sources.len();
            "loaded disallowed-call rules"
        );

        Ok(DisallowedCallSet {
            function_calls,
            method_calls,
            static_calls,
            sources: self.sources,
        })
    }

    fn ingest_source(
        &mut self,
        path: &Path,
        contents: &str,
        format: DocumentFormat,
    ) -> RuleResult<()> {
        let checksum = calculate_sha256(contents);
        let raw = format.parse(contents).map_err(|message| {
            usage!(
                ErrorCode::InvalidConfigValue,
                "failed to parse disallowed-call config '{}': {}",
                path.display(),
                message
            )
            .with_context("path", path.display().to_string())
        })?;

        log::debug!(
            path:% = path.display(),
            function_entries = raw.function_calls.len(),
            method_entries = raw.method_calls.len(),
            static_entries = raw.static_calls.len();
            "ingested disallowed-call config"
        );

        self.sources.push(RuleSource {
            path: path.to_path_buf(),
            sha256: checksum,
            function_entries: raw.function_calls.len(),
            method_entries: raw.method_calls.len(),
            static_entries: raw.static_calls.len(),
        });
        self.function_calls.extend(raw.function_calls);
        self.method_calls.extend(raw.method_calls);
        self.static_calls.extend(raw.static_calls);
        Ok(())
    }
}

impl DisallowedCallSet {
    /// Translate the given rule files.
    pub fn from_paths(paths: &[PathBuf]) -> RuleResult<Self> {
        Self::from_inline_and_paths(&[], paths)
    }

    /// Translate labelled inline TOML documents, then rule files. Later
    /// sources replace rules with the same call name from earlier ones.
    pub fn from_inline_and_paths(
        inline: &[(&str, &str)],
        paths: &[PathBuf],
    ) -> RuleResult<Self> {
        let mut loader = RuleSetLoader::default();
        inline
            .iter()
            .try_for_each(|(label, contents)| loader.ingest_inline(label, contents))?;
        paths.iter().try_for_each(|path| loader.ingest_file(path))?;
        loader.finish()
    }
}

fn translate_category(
    factory: &DisallowedCallFactory,
    category: CallCategory,
    entries: &[DisallowedCallConfig],
) -> RuleResult<Vec<DisallowedCall>> {
    let calls = factory
        .create_from_config(entries)
        .map_err(|err| err.with_context("category", category.parameter()))?;

    let collapsed = entries.len() - calls.len();
    if collapsed > 0 {
        log::debug!(
            category = category.parameter(),
            collapsed = collapsed;
            "entries sharing a call name replaced earlier rules"
        );
    }
    Ok(calls)
}

pub(crate) fn calculate_sha256(contents: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents.as_bytes());
    let digest = hasher.finalize();
    format!("{:x}", digest)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentFormat {
    Toml,
    Json,
}

impl DocumentFormat {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Toml,
        }
    }

    fn parse(self, contents: &str) -> Result<RawRuleDocument, String> {
        match self {
            DocumentFormat::Toml => toml::from_str(contents).map_err(|err| err.to_string()),
            DocumentFormat::Json => serde_json::from_str(contents).map_err(|err| err.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRuleDocument {
    #[serde(default, rename = "disallowedFunctionCalls")]
    pub function_calls: Vec<DisallowedCallConfig>,
    #[serde(default, rename = "disallowedMethodCalls")]
    pub method_calls: Vec<DisallowedCallConfig>,
    #[serde(default, rename = "disallowedStaticCalls")]
    pub static_calls: Vec<DisallowedCallConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::params::{ParamId, ParamMatcher};
    use std::io::Write;
    use tempfile::tempdir;

    const DEFAULTS: &str = r#"
        [[disallowedFunctionCalls]]
        function = "eval()"
        message = "eval is evil"

        [[disallowedFunctionCalls]]
        function = "\\var_dump()"
        allowIn = ["tests/*"]

        [[disallowedMethodCalls]]
        method = "PDO::query()"
        allowParamsAnywhere = { 1 = "SELECT 1" }
        allowExceptCaseInsensitiveParams = { mode = "ro" }
    "#;

    #[test]
    fn inline_document_is_translated_per_category() -> RuleResult<()> {
        let mut loader = RuleSetLoader::default();
        loader.ingest_inline("defaults", DEFAULTS)?;
        let set = loader.finish()?;

        let keys: Vec<_> = set.function_calls().iter().map(|c| c.key()).collect();
        assert_eq!(keys, vec!["eval", "var_dump"]);
        assert_eq!(set.function_calls()[0].message(), Some("eval is evil"));
        assert_eq!(set.function_calls()[1].allow_in(), ["tests/*".to_string()]);

        let query = &set.method_calls()[0];
        assert_eq!(query.key(), "PDO::query");
        assert_eq!(
            query.allow_params_anywhere().get(&ParamId::Position(1)),
            Some(&ParamMatcher::ExactValue("SELECT 1".into()))
        );
        assert_eq!(
            query.allow_except_params().get(&ParamId::Name("mode".into())),
            Some(&ParamMatcher::CaseInsensitiveValue("ro".into()))
        );
        assert!(set.static_calls().is_empty());

        let source = &set.sources()[0];
        assert_eq!(source.path, PathBuf::from("<inline:defaults>"));
        assert_eq!(source.sha256, calculate_sha256(DEFAULTS));
        assert_eq!(source.function_entries, 2);
        assert_eq!(source.method_entries, 1);
        assert_eq!(source.static_entries, 0);
        Ok(())
    }

    #[test]
    fn later_sources_override_earlier_rules() -> RuleResult<()> {
        let mut loader = RuleSetLoader::default();
        loader.ingest_inline("defaults", DEFAULTS)?;
        loader.ingest_inline(
            "project",
            r#"
            [[disallowedFunctionCalls]]
            function = "eval"
            allowIn = ["legacy/*"]
            "#,
        )?;
        let set = loader.finish()?;

        assert_eq!(set.function_calls().len(), 2);
        let eval = &set.function_calls()[0];
        assert_eq!(eval.key(), "eval");
        assert_eq!(eval.message(), None);
        assert_eq!(eval.allow_in(), ["legacy/*".to_string()]);
        assert_eq!(set.summary().entries.len(), 2);
        Ok(())
    }

    #[test]
    fn json_files_are_detected_by_extension() -> RuleResult<()> {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("rules.json");
        let mut file = fs::File::create(&path).expect("create json");
        write!(
            file,
            r#"{{"disallowedStaticCalls": [{{"method": "\\Foo::bar()", "allowParamsAnywhereAnyValue": [0]}}]}}"#
        )
        .expect("write json");

        let mut loader = RuleSetLoader::default();
        loader.ingest_file(&path)?;
        let set = loader.finish()?;
        let bar = &set.static_calls()[0];
        assert_eq!(bar.key(), "Foo::bar");
        assert_eq!(
            bar.allow_params_anywhere().get(&ParamId::Position(0)),
            Some(&ParamMatcher::AnyValue)
        );
        Ok(())
    }

    #[test]
    fn unreadable_file_is_an_environment_error() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("missing.toml");
        let mut loader = RuleSetLoader::default();
        let err = loader.ingest_file(&missing).expect_err("missing file");
        assert_eq!(err.code, ErrorCode::Io);
        assert_eq!(err.kind, disallowed_errors::ErrorKind::Environment);
        assert_eq!(
            err.context_value("path"),
            Some(missing.display().to_string().as_str())
        );
    }

    #[test]
    fn entry_keys_for_other_components_are_ignored() -> RuleResult<()> {
        let mut loader = RuleSetLoader::default();
        loader.ingest_inline(
            "host",
            r#"
            [[disallowedFunctionCalls]]
            function = "eval"
            message = "no eval"
            errorIdentifier = "no.eval"
            errorTip = "see docs"
            "#,
        )?;
        let set = loader.finish()?;
        assert_eq!(set.function_calls().len(), 1);
        assert_eq!(set.function_calls()[0].message(), Some("no eval"));
        Ok(())
    }

    #[test]
    fn unknown_document_sections_are_rejected() {
        let mut loader = RuleSetLoader::default();
        let err = loader
            .ingest_inline(
                "typo",
                r#"
                [[disallowedFunctionCall]]
                function = "eval"
                "#,
            )
            .expect_err("unknown section");
        assert_eq!(err.code, ErrorCode::InvalidConfigValue);
        assert_eq!(loader.source_count(), 0);
    }

    #[test]
    fn translation_errors_carry_category_and_entry() -> RuleResult<()> {
        let mut loader = RuleSetLoader::default();
        loader.ingest_inline(
            "broken",
            r#"
            [[disallowedMethodCalls]]
            method = "Foo::bar"

            [[disallowedMethodCalls]]
            message = "who am I?"
            "#,
        )?;
        let err = loader.finish().expect_err("nameless entry");
        assert_eq!(err.code, ErrorCode::MissingCallName);
        assert_eq!(err.context_value("category"), Some("disallowedMethodCalls"));
        assert_eq!(err.context_value("entry"), Some("1"));
        Ok(())
    }

    #[test]
    fn finishing_without_sources_fails() {
        let err = RuleSetLoader::default()
            .finish()
            .expect_err("no sources");
        assert_eq!(err.code, ErrorCode::InvalidConfigValue);
    }
}
