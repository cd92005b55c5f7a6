//! WDL 1.1 reserved words

use once_cell::sync::Lazy;
use std::collections::HashSet;

static KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "Array",
        "Boolean",
        "File",
        "Float",
        "Int",
        "Map",
        "None",
        "Object",
        "Pair",
        "String",
        "after",
        "alias",
        "as",
        "call",
        "command",
        "else",
        "if",
        "import",
        "in",
        "input",
        "left",
        "meta",
        "object",
        "output",
        "parameter_meta",
        "right",
        "runtime",
        "scatter",
        "struct",
        "task",
        "then",
        "version",
        "workflow",
    ]
    .into_iter()
    .collect()
});

/// Names of the built-in types that open a declaration.
static TYPE_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "Array", "Boolean", "File", "Float", "Int", "Map", "Object", "Pair", "String",
    ]
    .into_iter()
    .collect()
});

/// Check if a word is reserved. `true` and `false` lex as boolean literals instead.
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(word)
}

pub fn is_type_keyword(word: &str) -> bool {
    TYPE_NAMES.contains(word)
}

/// Keywords that open a top-level document element
pub fn is_document_keyword(word: &str) -> bool {
    matches!(word, "version" | "import" | "struct" | "task" | "workflow")
}

/// Keywords that open a workflow or task element
pub fn is_element_keyword(word: &str) -> bool {
    matches!(
        word,
        "input"
            | "output"
            | "meta"
            | "parameter_meta"
            | "runtime"
            | "command"
            | "call"
            | "scatter"
            | "if"
    )
}

/// Check if a string is a valid identifier (not a keyword)
pub fn is_valid_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !is_keyword(word)
        && word != "true"
        && word != "false"
}
