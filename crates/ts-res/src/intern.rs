//! Condition / ConditionSet / Decision interners.
//!
//! Each interner deduplicates its inputs by a canonical string key and
//! hands back a small dense `Handle`. Handles are stable and never
//! renumbered within a build.

use crate::error::{Error, Result};
use fxhash::FxHashMap as HashMap;

/// A dense, zero-based index into an interner's table.
pub type Handle = u32;

/// The only currently-supported condition operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Matches,
}

impl Operator {
    fn as_str(&self) -> &'static str {
        match self {
            Operator::Matches => "matches",
        }
    }
}

/// `(qualifier, operator, value, priority)`. `value` is already
/// canonicalized by the qualifier's type before a `Condition` is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Condition {
    qualifier: String,
    operator: Operator,
    value: String,
    priority: i16,
}

impl Condition {
    pub fn new(qualifier: impl Into<String>, value: impl Into<String>, priority: i16) -> Self {
        Self {
            qualifier: qualifier.into(),
            operator: Operator::Matches,
            value: value.into(),
            priority,
        }
    }

    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }
    pub fn operator(&self) -> Operator {
        self.operator
    }
    pub fn value(&self) -> &str {
        &self.value
    }
    pub fn priority(&self) -> i16 {
        self.priority
    }

    fn canonical_key(&self) -> String {
        format!("{}={}@{}", self.qualifier, self.value, self.priority)
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} (priority {})",
            self.qualifier,
            self.operator.as_str(),
            self.value,
            self.priority
        )
    }
}

/// Deduplicates conditions into dense handles.
#[derive(Debug, Default)]
pub struct ConditionInterner {
    by_key: HashMap<String, Handle>,
    table: Vec<Condition>,
}

impl ConditionInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, condition: Condition) -> Handle {
        let key = condition.canonical_key();
        if let Some(&h) = self.by_key.get(&key) {
            return h;
        }
        let h = self.table.len() as Handle;
        self.table.push(condition);
        self.by_key.insert(key, h);
        h
    }

    pub fn get(&self, handle: Handle) -> &Condition {
        &self.table[handle as usize]
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle, &Condition)> {
        self.table.iter().enumerate().map(|(i, c)| (i as Handle, c))
    }

    pub fn into_vec(self) -> Vec<Condition> {
        self.table
    }
}

/// A deduplicated set of conditions, at most one per qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionSet {
    /// Condition handles, sorted by the owning qualifier's name to make
    /// the canonical key (and therefore equality) order-independent.
    conditions: Vec<Handle>,
}

impl ConditionSet {
    pub fn conditions(&self) -> &[Handle] {
        &self.conditions
    }

    pub fn is_unconditional(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Reserved handle of the unconditional (empty) condition set.
pub const UNCONDITIONAL: Handle = 0;

/// Deduplicates condition sets; handle 0 is always the unconditional set.
#[derive(Debug)]
pub struct ConditionSetInterner {
    by_key: HashMap<String, Handle>,
    table: Vec<ConditionSet>,
}

impl Default for ConditionSetInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionSetInterner {
    pub fn new() -> Self {
        let mut s = Self {
            by_key: HashMap::default(),
            table: Vec::new(),
        };
        let h = s.intern_sorted(Vec::new(), &ConditionInterner::new()).unwrap();
        debug_assert_eq!(h, UNCONDITIONAL);
        s
    }

    /// Interns a set of condition handles. Conditions must not repeat a
    /// qualifier.
    pub fn intern(
        &mut self,
        mut handles: Vec<Handle>,
        conditions: &ConditionInterner,
    ) -> Result<Handle> {
        handles.sort_by(|a, b| conditions.get(*a).qualifier().cmp(conditions.get(*b).qualifier()));
        self.intern_sorted(handles, conditions)
    }

    fn intern_sorted(
        &mut self,
        handles: Vec<Handle>,
        conditions: &ConditionInterner,
    ) -> Result<Handle> {
        let mut seen = std::collections::HashSet::new();
        for &h in &handles {
            let q = conditions.get(h).qualifier();
            if !seen.insert(q) {
                return Err(Error::DuplicateQualifierInSet(q.to_string()));
            }
        }
        let key = handles
            .iter()
            .map(|h| conditions.get(*h).qualifier().to_string() + "=" + &h.to_string())
            .collect::<Vec<_>>()
            .join(",");
        if let Some(&h) = self.by_key.get(&key) {
            return Ok(h);
        }
        let h = self.table.len() as Handle;
        self.table.push(ConditionSet { conditions: handles });
        self.by_key.insert(key, h);
        Ok(h)
    }

    pub fn get(&self, handle: Handle) -> &ConditionSet {
        &self.table[handle as usize]
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle, &ConditionSet)> {
        self.table.iter().enumerate().map(|(i, c)| (i as Handle, c))
    }

    pub fn into_vec(self) -> Vec<ConditionSet> {
        self.table
    }
}

/// An ordered sequence of condition-set handles selecting among a
/// resource's candidates. The unconditional set may appear at most
/// once, and only as the last element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    condition_sets: Vec<Handle>,
}

impl Decision {
    pub fn condition_sets(&self) -> &[Handle] {
        &self.condition_sets
    }
}

/// Deduplicates decisions.
#[derive(Debug, Default)]
pub struct DecisionInterner {
    by_key: HashMap<String, Handle>,
    table: Vec<Decision>,
}

impl DecisionInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, condition_sets: Vec<Handle>) -> Result<Handle> {
        if let Some(pos) = condition_sets
            .iter()
            .position(|&h| h == UNCONDITIONAL)
        {
            if pos != condition_sets.len() - 1 {
                return Err(Error::MisplacedUnconditionalSet);
            }
        }
        let key = condition_sets
            .iter()
            .map(Handle::to_string)
            .collect::<Vec<_>>()
            .join(",");
        if let Some(&h) = self.by_key.get(&key) {
            return Ok(h);
        }
        let h = self.table.len() as Handle;
        self.table.push(Decision { condition_sets });
        self.by_key.insert(key, h);
        Ok(h)
    }

    pub fn get(&self, handle: Handle) -> &Decision {
        &self.table[handle as usize]
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle, &Decision)> {
        self.table.iter().enumerate().map(|(i, c)| (i as Handle, c))
    }

    pub fn into_vec(self) -> Vec<Decision> {
        self.table
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn condition_interning_is_idempotent() {
        let mut t = ConditionInterner::new();
        let a = t.intern(Condition::new("home", "US", 100));
        let b = t.intern(Condition::new("home", "US", 100));
        let c = t.intern(Condition::new("home", "CA", 100));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn condition_set_zero_is_unconditional() {
        let sets = ConditionSetInterner::new();
        assert!(sets.get(UNCONDITIONAL).is_unconditional());
        assert_eq!(sets.len(), 1);
    }

    #[test]
    fn condition_set_rejects_duplicate_qualifier() {
        let mut conditions = ConditionInterner::new();
        let mut sets = ConditionSetInterner::new();
        let a = conditions.intern(Condition::new("home", "US", 100));
        let b = conditions.intern(Condition::new("home", "CA", 100));
        let err = sets.intern(vec![a, b], &conditions).unwrap_err();
        assert!(matches!(err, Error::DuplicateQualifierInSet(_)));
    }

    #[test]
    fn condition_set_ordering_is_independent_of_insertion_order() {
        let mut conditions = ConditionInterner::new();
        let mut sets = ConditionSetInterner::new();
        let home = conditions.intern(Condition::new("home", "US", 100));
        let lang = conditions.intern(Condition::new("language", "en", 100));
        let s1 = sets.intern(vec![home, lang], &conditions).unwrap();
        let s2 = sets.intern(vec![lang, home], &conditions).unwrap();
        assert_eq!(s1, s2);
    }

    #[test]
    fn decision_rejects_unconditional_not_last() {
        let mut d = DecisionInterner::new();
        let err = d.intern(vec![UNCONDITIONAL, 1]).unwrap_err();
        assert!(matches!(err, Error::MisplacedUnconditionalSet));
    }
}
