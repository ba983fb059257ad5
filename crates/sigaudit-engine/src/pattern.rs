use sigaudit_types::WILDCARD;

/// A target name as a matcher over observed entity names.
///
/// `*` alone matches everything. Any other name containing `*` matches by
/// case-insensitive containment of the text left after removing every `*`.
/// A name without `*` only matches itself, case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePattern {
    Any,
    Contains(String),
    Exact(String),
}

impl NamePattern {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if !trimmed.contains(WILDCARD) {
            return NamePattern::Exact(trimmed.to_string());
        }
        let literal: String = trimmed.chars().filter(|c| *c != WILDCARD).collect();
        let literal = literal.trim().to_lowercase();
        if literal.is_empty() {
            NamePattern::Any
        } else {
            NamePattern::Contains(literal)
        }
    }

    pub fn is_wildcard(&self) -> bool {
        !matches!(self, NamePattern::Exact(_))
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Any => true,
            NamePattern::Contains(literal) => name.to_lowercase().contains(literal.as_str()),
            NamePattern::Exact(expected) => name == expected,
        }
    }
}
