//! Export-name validity.

/// Reserved words, which can never be binding identifiers.
const RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// True if `name` can be imported as a binding of the same name.
///
/// Names picked up from string keys (`exports['a-b']`) can be anything; only
/// legal identifiers that are not reserved words survive.
pub fn is_valid_export_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !is_identifier_start(first) || !chars.all(is_identifier_part) {
        return false;
    }
    !RESERVED_WORDS.contains(&name)
}

fn is_identifier_start(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphabetic()
}

fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c) || c.is_numeric() || c == '\u{200c}' || c == '\u{200d}'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["a", "_private", "$", "__esModule", "camelCase2", "ünïcode"] {
            assert!(is_valid_export_name(name), "{}", name);
        }
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", "2fast", "kebab-case", "a.b", "with space", "default", "class"] {
            assert!(!is_valid_export_name(name), "{}", name);
        }
    }
}
