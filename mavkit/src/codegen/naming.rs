use std::collections::HashMap;

use crate::errors::CodegenError;

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub",
    "ref", "return", "self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use",
    "where", "while", "abstract", "become", "box", "do", "final", "macro", "override", "priv",
    "try", "typeof", "unsized", "virtual", "yield",
];

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield", "self",
];

/// Converts `UPPER_SNAKE` or `lower_snake` names to `PascalCase`.
pub(crate) fn pascal_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for word in name.split('_').filter(|w| !w.is_empty()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.extend(chars.flat_map(|c| c.to_lowercase()));
        }
    }
    prefix_digit(out)
}

/// Converts a name to `snake_case` collapsing repeated underscores.
pub(crate) fn snake_case(name: &str) -> String {
    let words: Vec<String> = name
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();
    prefix_digit(words.join("_"))
}

/// Converts a name to `UPPER_SNAKE_CASE`.
pub(crate) fn upper_snake_case(name: &str) -> String {
    snake_case(name).to_uppercase()
}

/// Escapes Rust keywords with a trailing underscore.
pub(crate) fn rust_ident(ident: String) -> String {
    if RUST_KEYWORDS.contains(&ident.as_str()) {
        format!("{ident}_")
    } else {
        ident
    }
}

/// Escapes Python keywords with a trailing underscore.
pub(crate) fn python_ident(ident: String) -> String {
    if PYTHON_KEYWORDS.contains(&ident.as_str()) {
        format!("{ident}_")
    } else {
        ident
    }
}

fn prefix_digit(ident: String) -> String {
    match ident.chars().next() {
        Some(c) if c.is_ascii_digit() => format!("_{ident}"),
        None => "_".to_string(),
        _ => ident,
    }
}

/// Registry of identifiers rendered within one scope of a generated file.
#[derive(Debug)]
pub(crate) struct Scope<'a> {
    backend: &'a str,
    idents: HashMap<String, String>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(backend: &'a str) -> Self {
        Self {
            backend,
            idents: HashMap::new(),
        }
    }

    /// Registers `ident` rendered from `source`.
    ///
    /// Fails if another source already rendered as the same identifier.
    pub(crate) fn claim(&mut self, ident: &str, source: &str) -> Result<(), CodegenError> {
        match self.idents.get(ident) {
            Some(first) if first != source => Err(CodegenError::NameClash {
                backend: self.backend.to_string(),
                ident: ident.to_string(),
                first: first.clone(),
                second: source.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.idents.insert(ident.to_string(), source.to_string());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod naming_tests {
    use super::*;

    #[test]
    fn case_conversion() {
        assert_eq!(pascal_case("GPS_RAW_INT"), "GpsRawInt");
        assert_eq!(pascal_case("HEARTBEAT"), "Heartbeat");
        assert_eq!(pascal_case("FOO__BAR"), "FooBar");
        assert_eq!(pascal_case("3D_FIX"), "_3dFix");
        assert_eq!(snake_case("MAV_TYPE"), "mav_type");
        assert_eq!(snake_case("custom_mode"), "custom_mode");
        assert_eq!(upper_snake_case("Mav_Type"), "MAV_TYPE");
    }

    #[test]
    fn keywords() {
        assert_eq!(rust_ident("type".to_string()), "type_");
        assert_eq!(rust_ident("kind".to_string()), "kind");
        assert_eq!(python_ident("from".to_string()), "from_");
        assert_eq!(python_ident("type".to_string()), "type");
    }

    #[test]
    fn clashes() {
        let mut scope = Scope::new("rust");
        scope.claim("FooBar", "FOO_BAR").unwrap();
        scope.claim("FooBar", "FOO_BAR").unwrap();

        assert_eq!(
            scope.claim("FooBar", "FOO__BAR"),
            Err(CodegenError::NameClash {
                backend: "rust".to_string(),
                ident: "FooBar".to_string(),
                first: "FOO_BAR".to_string(),
                second: "FOO__BAR".to_string(),
            })
        );
    }
}
