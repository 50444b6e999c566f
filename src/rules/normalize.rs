//! Call-name normalisation shared by rule keys and allowed-caller lists.

const CALL_SUFFIX: &str = "()";

/// Canonical form of a configured call name.
///
/// Drops a single trailing `()` and then every leading namespace separator, so
/// `\Foo\bar()` and `Foo\bar` resolve to the same key. Separators inside the
/// name are left alone.
pub fn normalize_call(call: &str) -> String {
    let call = call.strip_suffix(CALL_SUFFIX).unwrap_or(call);
    call.trim_start_matches('\\').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_invocation_suffix() {
        assert_eq!(normalize_call("foo()"), "foo");
        assert_eq!(normalize_call("Foo\\Bar::baz()"), "Foo\\Bar::baz");
    }

    #[test]
    fn strips_only_leading_separators() {
        assert_eq!(normalize_call("\\Foo\\bar"), "Foo\\bar");
        assert_eq!(normalize_call("\\\\strtolower()"), "strtolower");
        assert_eq!(normalize_call("\\Foo\\bar()"), "Foo\\bar");
    }

    #[test]
    fn removes_suffix_once() {
        assert_eq!(normalize_call("foo()()"), "foo()");
        assert_eq!(normalize_call("()"), "");
    }

    #[test]
    fn leaves_plain_names_untouched() {
        assert_eq!(normalize_call("setProperty"), "setProperty");
        assert_eq!(normalize_call("Foo::bar("), "Foo::bar(");
    }

    // A doubled `()` suffix is the one input where a second pass changes the
    // result, since only one suffix is removed per pass.
    #[test]
    fn normalisation_is_idempotent() {
        for raw in [
            "foo()",
            "\\Foo\\bar()",
            "\\\\a\\b",
            "()",
            "",
            "Foo::bar",
            "\\()",
        ] {
            let once = normalize_call(raw);
            assert_eq!(normalize_call(&once), once, "input {raw:?}");
        }
    }
}
