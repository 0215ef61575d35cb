//! Runtime context: a map of qualifier name to value.

use crate::qualifier::ContextValue;
use fxhash::FxHashMap as HashMap;

/// `{qualifier-name -> string | string[]}`. The list form is only
/// meaningful for qualifier types that declare `allow_context_list` —
/// the registry/resolver reject it otherwise.
#[derive(Debug, Clone, Default)]
pub struct Context {
    values: HashMap<String, ContextValue>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, qualifier: impl Into<String>, value: ContextValue) -> &mut Self {
        self.values.insert(qualifier.into(), value);
        self
    }

    pub fn with(mut self, qualifier: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(qualifier, ContextValue::parse(&value.into()));
        self
    }

    pub fn get(&self, qualifier: &str) -> Option<&ContextValue> {
        self.values.get(qualifier)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, String)> for Context {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut ctx = Context::new();
        for (k, v) in iter {
            ctx.set(k, ContextValue::parse(&v));
        }
        ctx
    }
}
