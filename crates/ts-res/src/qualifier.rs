//! Qualifier types and the qualifier registry.

use crate::error::{Error, Result};
use fxhash::FxHashMap as HashMap;
use std::fmt;

/// A single value supplied by a runtime context for some qualifier. A
/// context may supply a comma-separated list; scoring for a list is the
/// max over elements, weighted 1, 0.9, 0.81, ... by position, for every
/// qualifier type kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextValue {
    Single(String),
    List(Vec<String>),
}

impl ContextValue {
    pub fn parse(raw: &str) -> ContextValue {
        if raw.contains(',') {
            ContextValue::List(raw.split(',').map(|s| s.trim().to_string()).collect())
        } else {
            ContextValue::Single(raw.to_string())
        }
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            ContextValue::Single(v) => Box::new(std::iter::once(v.as_str())),
            ContextValue::List(vs) => Box::new(vs.iter().map(String::as_str)),
        }
    }
}

/// The closed set of qualifier kinds. New kinds require a new enum
/// variant, never a runtime registration of behavior.
#[derive(Debug, Clone)]
pub enum QualifierTypeKind {
    /// BCP-47-shaped language tag matching with fallback scoring. This
    /// implements only canonicalization and fallback scoring; it is not
    /// a full BCP-47 validator.
    Language,
    /// ISO 3166 / UN M.49 region matching. `regions` maps a region group
    /// code (e.g. "150" for Europe) to the territory codes it contains.
    Territory { regions: HashMap<String, Vec<String>> },
    /// A finite enumerated set of values.
    Literal {
        values: Vec<String>,
        case_sensitive: bool,
    },
}

/// A registered qualifier type: its kind plus the context-list acceptance
/// flag shared across all kinds.
#[derive(Debug, Clone)]
pub struct QualifierType {
    name: String,
    kind: QualifierTypeKind,
    allow_context_list: bool,
}

impl QualifierType {
    pub fn new(name: impl Into<String>, kind: QualifierTypeKind, allow_context_list: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            allow_context_list,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn allow_context_list(&self) -> bool {
        self.allow_context_list
    }

    /// Validates a candidate-side value against this type.
    pub fn validate(&self, value: &str) -> Result<()> {
        match &self.kind {
            QualifierTypeKind::Language => {
                if value.is_empty() || !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
                    return Err(invalid(self, value, "not a well-formed language tag"));
                }
                Ok(())
            }
            QualifierTypeKind::Territory { .. } => {
                if value.len() < 2 || !value.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return Err(invalid(self, value, "not a well-formed territory code"));
                }
                Ok(())
            }
            QualifierTypeKind::Literal {
                values,
                case_sensitive,
            } => {
                let found = values.iter().any(|v| eq_literal(v, value, *case_sensitive));
                if found {
                    Ok(())
                } else {
                    Err(invalid(self, value, "not one of the enumerated values"))
                }
            }
        }
    }

    /// Canonicalizes a value for interning.
    pub fn canonicalize(&self, value: &str) -> String {
        match &self.kind {
            QualifierTypeKind::Language => canonicalize_language(value),
            QualifierTypeKind::Territory { .. } => value.to_ascii_uppercase(),
            QualifierTypeKind::Literal { case_sensitive, .. } => {
                if *case_sensitive {
                    value.to_string()
                } else {
                    value.to_ascii_lowercase()
                }
            }
        }
    }

    /// Scores a single candidate value against a single context value,
    /// in `[0.0, 1.0]`, per this type's kind-specific scoring policy.
    fn score_one(&self, candidate: &str, context: &str) -> f64 {
        match &self.kind {
            QualifierTypeKind::Language => score_language(candidate, context),
            QualifierTypeKind::Territory { regions } => score_territory(candidate, context, regions),
            QualifierTypeKind::Literal { case_sensitive, .. } => {
                if eq_literal(candidate, context, *case_sensitive) {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Scores a candidate value against a (possibly list-valued) context
    /// value. List scoring takes the max over elements weighted by
    /// position: 1, 0.9, 0.81, ...
    pub fn score(&self, candidate: &str, context: &ContextValue) -> f64 {
        match context {
            ContextValue::Single(v) => self.score_one(candidate, v),
            ContextValue::List(_) if !self.allow_context_list => 0.0,
            ContextValue::List(_) => context
                .iter()
                .enumerate()
                .map(|(i, v)| self.score_one(candidate, v) * 0.9f64.powi(i as i32))
                .fold(0.0, f64::max),
        }
    }
}

fn invalid(t: &QualifierType, value: &str, reason: &str) -> Error {
    Error::InvalidValue {
        type_name: t.name.clone(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn eq_literal(a: &str, b: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        a == b
    } else {
        crate::collate::eq_caseless(a, b)
    }
}

fn canonicalize_language(tag: &str) -> String {
    tag.split('-')
        .enumerate()
        .map(|(i, part)| match i {
            0 => part.to_ascii_lowercase(),
            1 if part.len() == 4 => {
                let mut c = part.chars();
                c.next()
                    .map(|f| f.to_ascii_uppercase().to_string())
                    .unwrap_or_default()
                    + &c.as_str().to_ascii_lowercase()
            }
            _ => part.to_ascii_uppercase(),
        })
        .collect::<Vec<_>>()
        .join("-")
}

fn lang_parts(tag: &str) -> Vec<String> {
    canonicalize_language(tag)
        .split('-')
        .map(str::to_string)
        .collect()
}

/// Language scoring: exact canonical match is 1.0; same primary language
/// with differing script/region degrades monotonically through 0.5..0.8;
/// unrelated primary languages score 0.0.
fn score_language(candidate: &str, context: &str) -> f64 {
    let c = lang_parts(candidate);
    let x = lang_parts(context);
    if c.is_empty() || x.is_empty() {
        return 0.0;
    }
    if c == x {
        return 1.0;
    }
    if c[0] != x[0] {
        return 0.0;
    }
    match (c.len(), x.len()) {
        (1, _) | (_, 1) => 0.6,
        _ if c.get(1) == x.get(1) => 0.8,
        _ => 0.5,
    }
}

/// Territory scoring: exact ISO code match is 1.0; membership in an
/// enclosing UN M.49 region named by the candidate is 0.5; otherwise 0.0.
fn score_territory(candidate: &str, context: &str, regions: &HashMap<String, Vec<String>>) -> f64 {
    let candidate = candidate.to_ascii_uppercase();
    let context = context.to_ascii_uppercase();
    if candidate == context {
        return 1.0;
    }
    if let Some(members) = regions.get(&candidate) {
        if members.iter().any(|m| m.eq_ignore_ascii_case(&context)) {
            return 0.5;
        }
    }
    0.0
}

/// The registry of known qualifier types. Types are kept in registration
/// order so that `into_vec` produces the deterministic, handle-stable
/// array the bundle format requires.
#[derive(Debug, Default)]
pub struct QualifierTypeRegistry {
    by_name: HashMap<String, usize>,
    table: Vec<QualifierType>,
}

impl QualifierTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, t: QualifierType) -> Result<()> {
        if self.by_name.contains_key(&t.name) {
            return Err(Error::DuplicateQualifierType(t.name.clone()));
        }
        self.by_name.insert(t.name.clone(), self.table.len());
        self.table.push(t);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&QualifierType> {
        self.by_name
            .get(name)
            .map(|&i| &self.table[i])
            .ok_or_else(|| Error::UnknownQualifierType(name.to_string()))
    }

    pub fn into_vec(self) -> Vec<QualifierType> {
        self.table
    }
}

/// A named qualifier bound to a qualifier type.
#[derive(Debug, Clone)]
pub struct Qualifier {
    name: String,
    type_name: String,
    default_priority: i16,
    token: Option<String>,
    token_is_optional: bool,
}

impl Qualifier {
    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
        default_priority: i16,
        token: Option<String>,
        token_is_optional: bool,
    ) -> Result<Self> {
        let name = name.into();
        if !is_valid_identifier(&name) {
            return Err(Error::InvalidQualifierName(name));
        }
        if !(0..=1000).contains(&default_priority) {
            return Err(Error::InvalidValue {
                type_name: "Qualifier.defaultPriority".to_string(),
                value: default_priority.to_string(),
                reason: "must be in [0, 1000]".to_string(),
            });
        }
        Ok(Self {
            name,
            type_name: type_name.into(),
            default_priority,
            token,
            token_is_optional,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn type_name(&self) -> &str {
        &self.type_name
    }
    pub fn default_priority(&self) -> i16 {
        self.default_priority
    }
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
    pub fn token_is_optional(&self) -> bool {
        self.token_is_optional
    }
}

pub(crate) fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// The registry of named qualifiers. Names and tokens live in separate
/// namespaces; `get_by_name_or_token` tries name first, then token.
/// Qualifiers are kept in registration order for deterministic output.
#[derive(Debug, Default)]
pub struct QualifierRegistry {
    by_name: HashMap<String, usize>,
    by_token: HashMap<String, usize>,
    table: Vec<Qualifier>,
}

impl QualifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, q: Qualifier) -> Result<()> {
        if self.by_name.contains_key(&q.name) {
            return Err(Error::DuplicateQualifier(q.name.clone()));
        }
        let idx = self.table.len();
        if let Some(token) = &q.token {
            self.by_token.insert(token.clone(), idx);
        }
        self.by_name.insert(q.name.clone(), idx);
        self.table.push(q);
        Ok(())
    }

    pub fn get_by_name(&self, name: &str) -> Result<&Qualifier> {
        self.by_name
            .get(name)
            .map(|&i| &self.table[i])
            .ok_or_else(|| Error::UnknownQualifier(name.to_string()))
    }

    pub fn get_by_name_or_token(&self, name_or_token: &str) -> Result<&Qualifier> {
        if let Some(&i) = self.by_name.get(name_or_token) {
            return Ok(&self.table[i]);
        }
        if let Some(&i) = self.by_token.get(name_or_token) {
            return Ok(&self.table[i]);
        }
        Err(Error::UnknownQualifier(name_or_token.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Qualifier> {
        self.table.iter()
    }

    pub fn into_vec(self) -> Vec<Qualifier> {
        self.table
    }
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Single(v) => write!(f, "{v}"),
            ContextValue::List(vs) => write!(f, "{}", vs.join(",")),
        }
    }
}
