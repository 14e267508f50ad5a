//! Built-in regular expressions

use regex::Regex;

/// Compile a pattern written into this workspace's source
///
/// These patterns are constants, so a compile failure is a bug and panics on
/// first use of the owning static.
pub fn builtin(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => panic!("invalid built-in pattern {pattern}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use crate::patterns::*;

    #[test]
    fn test_builtin_compiles() {
        assert!(builtin(r"^v[0-9]+$").is_match("v12"));
    }

    #[test]
    #[should_panic(expected = "invalid built-in pattern")]
    fn test_builtin_rejects_broken_pattern() {
        let _ = builtin("(unclosed");
    }
}
