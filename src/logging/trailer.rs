use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use disallowed_errors::RuleError;
use once_cell::sync::OnceCell;

use super::logger;

static JSON_ERRORS_ENABLED: AtomicBool = AtomicBool::new(false);
static ERROR_TRAILER_WRITER: OnceCell<Mutex<Box<dyn Write + Send>>> = OnceCell::new();

pub(crate) fn set_json_errors_enabled(enabled: bool) {
    JSON_ERRORS_ENABLED.store(enabled, Ordering::SeqCst);
}

/// Write a single-line JSON description of `err` when JSON errors are enabled.
pub fn emit_error_trailer(err: &RuleError) {
    if !JSON_ERRORS_ENABLED.load(Ordering::SeqCst) {
        return;
    }

    let mut context = serde_json::Map::new();
    for (key, value) in &err.context {
        context.insert((*key).to_string(), serde_json::Value::String(value.clone()));
    }

    let payload = serde_json::json!({
        "run_id": logger::snapshot_run_id(),
        "error_code": err.code.as_str(),
        "error_kind": err.kind.as_str(),
        "message": err.message(),
        "context": context,
        "cause": err.source_ref().map(|source| source.to_string()),
    });

    let Ok(mut bytes) = serde_json::to_vec(&payload) else {
        return;
    };
    bytes.push(b'\n');
    match ERROR_TRAILER_WRITER.get() {
        Some(writer) => {
            if let Ok(mut guard) = writer.lock() {
                let _ = guard.write_all(&bytes);
                let _ = guard.flush();
            }
        }
        None => {
            let mut stderr = io::stderr().lock();
            let _ = stderr.write_all(&bytes);
            let _ = stderr.flush();
        }
    }
}

#[cfg(test)]
pub fn set_error_trailer_writer_for_tests(writer: Box<dyn Write + Send>) {
    let _ = ERROR_TRAILER_WRITER.set(Mutex::new(writer));
}
