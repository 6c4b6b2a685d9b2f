//! Irregular-aware English pluralization of field names.
//!
//! Only the last word of a CamelCase name is inflected, so
//! `SecurityGroupId` becomes `SecurityGroupIds` and `GraphVertex` becomes
//! `GraphVertices`.

/// Words that are the same in singular and plural.
const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "metadata",
    "news",
    "series",
    "species",
];

/// Irregular (singular, plural) pairs.
const IRREGULAR: &[(&str, &str)] = &[
    ("analysis", "analyses"),
    ("axis", "axes"),
    ("child", "children"),
    ("criterion", "criteria"),
    ("datum", "data"),
    ("index", "indices"),
    ("man", "men"),
    ("matrix", "matrices"),
    ("person", "people"),
    ("phenomenon", "phenomena"),
    ("vertex", "vertices"),
];

/// Plural form of a field name.
pub fn pluralize(name: &str) -> String {
    let (head, last) = split_last_word(name);
    if last.is_empty() {
        return name.to_string();
    }
    let lower = last.to_ascii_lowercase();

    if UNCOUNTABLE.contains(&lower.as_str()) {
        return name.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == lower) {
        return format!("{head}{}", match_case(last, plural));
    }
    if IRREGULAR.iter().any(|(_, plural)| *plural == lower) {
        return name.to_string();
    }

    regular_plural(name, &lower)
}

/// Plural by suffix rules alone; `lower` is the lowercased last word.
fn regular_plural(name: &str, lower: &str) -> String {
    let bytes = lower.as_bytes();
    let n = bytes.len();
    if n >= 2 && bytes[n - 1] == b'y' && !is_vowel(bytes[n - 2]) {
        return format!("{}ies", &name[..name.len() - 1]);
    }
    if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        return format!("{name}es");
    }
    format!("{name}s")
}

/// Every accepted plural of a field name: the irregular form if there is
/// one, and the regular form unless the word is uncountable.
fn plurals(name: &str) -> Vec<String> {
    let (_, last) = split_last_word(name);
    let lower = last.to_ascii_lowercase();
    let mut forms = vec![pluralize(name)];
    if !last.is_empty() && !UNCOUNTABLE.contains(&lower.as_str()) {
        let regular = regular_plural(name, &lower);
        if !forms.contains(&regular) {
            forms.push(regular);
        }
    }
    forms
}

/// Whether two field names are singular/plural forms of each other.
///
/// Words with an irregular plural also accept the regular one, so
/// `Indexes` and `Indices` both match `Index`.
pub fn equivalent(a: &str, b: &str) -> bool {
    plurals(a).iter().any(|p| p.eq_ignore_ascii_case(b))
        || plurals(b).iter().any(|p| p.eq_ignore_ascii_case(a))
}

/// Split `SecurityGroupId` into (`SecurityGroup`, `Id`).
fn split_last_word(name: &str) -> (&str, &str) {
    let start = name
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_ascii_uppercase())
        .map(|(i, _)| i)
        .unwrap_or(0);
    name.split_at(start)
}

fn match_case(original: &str, replacement: &str) -> String {
    if original.starts_with(|c: char| c.is_ascii_uppercase()) {
        let mut chars = replacement.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    } else {
        replacement.to_string()
    }
}

fn is_vowel(b: u8) -> bool {
    matches!(b, b'a' | b'e' | b'i' | b'o' | b'u')
}
