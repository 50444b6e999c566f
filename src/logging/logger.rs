//! JSON-lines `log` backend. Each record becomes one object carrying the run
//! id, the active error code, and any key-value pairs attached at the call site.

use std::cell::Cell;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::sync::{Mutex, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use disallowed_errors::{ErrorCode, RuleError};
use log::kv::{self, Key, VisitSource};
use log::{LevelFilter, Log, Metadata, Record};
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::render_error;
use crate::policy::RulesPolicy;

thread_local! {
    static ACTIVE_ERROR_CODE: Cell<Option<ErrorCode>> = Cell::new(None);
}

/// `None` when the host had already installed its own logger.
static LOGGER: OnceCell<Option<&'static RulesLogger>> = OnceCell::new();

fn installed() -> Option<&'static RulesLogger> {
    LOGGER.get().copied().flatten()
}

/// Install the JSON logger once per process. `RUST_LOG` overrides `default_filter`.
pub fn init_rust_logging_with_default(default_filter: &str) {
    LOGGER.get_or_init(|| {
        let fallback = LevelRules::parse(default_filter)
            .unwrap_or_else(|| LevelRules::uniform(LevelFilter::Warn));
        let initial = std::env::var("RUST_LOG")
            .ok()
            .and_then(|directives| fallback.with_directives(&directives))
            .unwrap_or_else(|| fallback.clone());

        let logger: &'static RulesLogger =
            Box::leak(Box::new(RulesLogger::new(fallback, initial)));
        log::set_logger(logger).ok().map(|()| {
            log::set_max_level(logger.ceiling());
            logger
        })
    });
}

pub(crate) fn apply_logger_policy(policy: &RulesPolicy) {
    if let Some(logger) = installed() {
        logger.apply_policy(policy);
    }
}

/// Run `op` with `code` attached to every log record it emits on this thread.
pub fn with_error_code<F, R>(code: ErrorCode, op: F) -> R
where
    F: FnOnce() -> R,
{
    let previous = ACTIVE_ERROR_CODE.with(|cell| cell.replace(Some(code)));
    let result = op();
    ACTIVE_ERROR_CODE.with(|cell| cell.set(previous));
    result
}

pub fn log_rule_error(label: &str, err: &RuleError) {
    with_error_code(err.code, || {
        log::error!(
            target: "disallowed_calls::errors",
            error_kind = err.kind.as_str();
            "{}: {}",
            label,
            render_error(err)
        );
    });
}

pub(crate) fn snapshot_run_id() -> Option<String> {
    installed().map(|logger| logger.run_id.clone())
}

struct RulesLogger {
    run_id: String,
    fallback: LevelRules,
    rules: RwLock<LevelRules>,
    sink: Mutex<Box<dyn Write + Send>>,
}

impl RulesLogger {
    fn new(fallback: LevelRules, initial: LevelRules) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            fallback,
            rules: RwLock::new(initial),
            sink: Mutex::new(Box::new(io::stderr())),
        }
    }

    fn ceiling(&self) -> LevelFilter {
        match self.rules.read() {
            Ok(rules) => rules.ceiling(),
            Err(poisoned) => poisoned.into_inner().ceiling(),
        }
    }

    fn apply_policy(&self, policy: &RulesPolicy) {
        let requested = policy
            .log_level
            .as_deref()
            .map(str::trim)
            .filter(|directives| !directives.is_empty());
        let rules = match requested {
            None => self.fallback.clone(),
            Some(directives) => self.fallback.with_directives(directives).unwrap_or_else(|| {
                with_error_code(ErrorCode::InvalidConfigValue, || {
                    log::warn!(
                        target: "disallowed_calls::logging",
                        directives = directives;
                        "invalid log level filter; using the default"
                    );
                });
                self.fallback.clone()
            }),
        };
        log::set_max_level(rules.ceiling());
        if let Ok(mut current) = self.rules.write() {
            *current = rules;
        }

        let sink: Box<dyn Write + Send> = match &policy.log_file {
            None => Box::new(io::stderr()),
            Some(path) => match OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => Box::new(file),
                Err(err) => {
                    with_error_code(ErrorCode::Io, || {
                        log::warn!(
                            target: "disallowed_calls::logging",
                            path:% = path.display();
                            "cannot open log file, staying on stderr: {}",
                            err
                        );
                    });
                    Box::new(io::stderr())
                }
            },
        };
        if let Ok(mut current) = self.sink.lock() {
            *current = sink;
        }
    }

    fn emit(&self, line: &LogLine<'_>) {
        let mut bytes = serde_json::to_vec(line).unwrap_or_else(|err| {
            serde_json::json!({
                "run_id": self.run_id,
                "message": format!("unencodable log record: {err}"),
            })
            .to_string()
            .into_bytes()
        });
        bytes.push(b'\n');

        let written = match self.sink.lock() {
            Ok(mut sink) => sink.write_all(&bytes).and_then(|()| sink.flush()),
            Err(_) => Err(io::Error::new(io::ErrorKind::Other, "log sink lock poisoned")),
        };
        if written.is_err() {
            let _ = io::stderr().lock().write_all(&bytes);
        }
    }
}

impl Log for RulesLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.rules
            .read()
            .map(|rules| rules.level_for(metadata.target()) >= metadata.level())
            .unwrap_or(false)
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = LogLine {
            ts_micros: timestamp_micros(),
            run_id: &self.run_id,
            level: record.level().as_str(),
            target: record.target(),
            message: record.args().to_string(),
            error_code: ACTIVE_ERROR_CODE.with(Cell::get).map(ErrorCode::as_str),
            location: record
                .file()
                .zip(record.line())
                .map(|(file, line)| format!("{file}:{line}")),
            fields: collect_fields(record),
        };
        self.emit(&line);
    }

    fn flush(&self) {
        if let Ok(mut sink) = self.sink.lock() {
            let _ = sink.flush();
        }
    }
}

#[derive(Serialize)]
struct LogLine<'a> {
    ts_micros: u64,
    run_id: &'a str,
    level: &'static str,
    target: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    fields: Map<String, Value>,
}

fn timestamp_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

fn collect_fields(record: &Record<'_>) -> Map<String, Value> {
    let mut collector = FieldCollector::default();
    // A source failing midway keeps the fields visited so far.
    let _ = record.key_values().visit(&mut collector);
    collector.0
}

#[derive(Default)]
struct FieldCollector(Map<String, Value>);

impl<'kvs> VisitSource<'kvs> for FieldCollector {
    fn visit_pair(&mut self, key: Key<'kvs>, value: kv::Value<'kvs>) -> Result<(), kv::Error> {
        self.0.insert(key.as_str().to_string(), json_value(&value));
        Ok(())
    }
}

fn json_value(value: &kv::Value<'_>) -> Value {
    if let Some(flag) = value.to_bool() {
        Value::Bool(flag)
    } else if let Some(number) = value.to_u64() {
        Value::from(number)
    } else if let Some(number) = value.to_i64() {
        Value::from(number)
    } else if let Some(text) = value.to_borrowed_str() {
        Value::from(text)
    } else {
        Value::String(value.to_string())
    }
}

/// `RUST_LOG`-style level directives: a default plus per-target-prefix overrides.
#[derive(Debug, Clone, PartialEq)]
struct LevelRules {
    default: LevelFilter,
    targets: Vec<(String, LevelFilter)>,
}

impl LevelRules {
    fn uniform(default: LevelFilter) -> Self {
        Self {
            default,
            targets: Vec::new(),
        }
    }

    fn parse(directives: &str) -> Option<Self> {
        Self::uniform(LevelFilter::Warn).with_directives(directives)
    }

    /// Parse `directives` keeping this default level unless they set one.
    /// `None` if any level is unknown.
    fn with_directives(&self, directives: &str) -> Option<Self> {
        let mut rules = Self::uniform(self.default);
        for directive in directives.split(',').map(str::trim) {
            match directive.split_once('=') {
                _ if directive.is_empty() => {}
                Some((target, level)) => {
                    rules
                        .targets
                        .push((target.trim().to_string(), level.trim().parse().ok()?));
                }
                None => rules.default = directive.parse().ok()?,
            }
        }
        Some(rules)
    }

    /// Longest matching target prefix wins; `a::b` matches `a` but not `ab`.
    fn level_for(&self, target: &str) -> LevelFilter {
        self.targets
            .iter()
            .filter(|(prefix, _)| {
                target
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
            })
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(self.default, |(_, level)| *level)
    }

    fn ceiling(&self) -> LevelFilter {
        self.targets
            .iter()
            .map(|(_, level)| *level)
            .fold(self.default, |ceiling, level| ceiling.max(level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::kv::ToValue;
    use log::Level;

    #[test]
    fn longest_target_prefix_decides_the_level() {
        let rules = LevelRules::parse("warn,disallowed_calls=info,disallowed_calls::rules=debug")
            .expect("valid directives");
        assert_eq!(
            rules.level_for("disallowed_calls::rules::loader"),
            LevelFilter::Debug
        );
        assert_eq!(rules.level_for("disallowed_calls::logging"), LevelFilter::Info);
        assert_eq!(rules.level_for("disallowed_callsx"), LevelFilter::Warn);
        assert_eq!(rules.level_for("other"), LevelFilter::Warn);
        assert_eq!(rules.ceiling(), LevelFilter::Debug);
    }

    #[test]
    fn directives_keep_the_base_default() {
        let base = LevelRules::uniform(LevelFilter::Error);
        let rules = base
            .with_directives("disallowed_calls=trace")
            .expect("valid directives");
        assert_eq!(rules.level_for("elsewhere"), LevelFilter::Error);
        assert_eq!(rules.level_for("disallowed_calls"), LevelFilter::Trace);
    }

    #[test]
    fn unknown_levels_are_rejected() {
        assert!(LevelRules::parse("loud").is_none());
        assert!(LevelRules::parse("disallowed_calls=chatty").is_none());
    }

    #[test]
    fn key_values_become_typed_fields() {
        let pairs: [(&str, &dyn ToValue); 3] = [
            ("category", &"disallowedMethodCalls"),
            ("collapsed", &2u64),
            ("strict", &true),
        ];
        let fields = collect_fields(
            &Record::builder()
                .target("disallowed_calls::rules::loader")
                .level(Level::Debug)
                .args(format_args!("collapsed entries"))
                .key_values(&pairs)
                .build(),
        );

        assert_eq!(
            fields.get("category"),
            Some(&Value::from("disallowedMethodCalls"))
        );
        assert_eq!(fields.get("collapsed"), Some(&Value::from(2u64)));
        assert_eq!(fields.get("strict"), Some(&Value::Bool(true)));
    }
}
