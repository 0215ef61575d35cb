//! Resource types, candidates, and resources.

use crate::error::{Error, Result};
use fxhash::FxHashMap as HashMap;
use serde_json::Value;

/// How a partial candidate is combined with the base value it overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum MergeMethod {
    /// The overlay wins wholesale.
    Replace,
    /// Recursively merge objects; overlay keys win; arrays and primitives
    /// are replaced atomically.
    Augment,
}

/// The payload of one resource candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceValue {
    Json(Value),
    Blob(Vec<u8>),
}

/// One possible value of a resource, tied to a specific condition set by
/// ordinal position in the resource's candidate list.
#[derive(Debug, Clone)]
pub struct Candidate {
    value: ResourceValue,
    is_partial: bool,
    merge_method: MergeMethod,
}

impl Candidate {
    pub fn new(value: ResourceValue, is_partial: bool, merge_method: MergeMethod) -> Self {
        Self {
            value,
            is_partial,
            merge_method,
        }
    }

    pub fn value(&self) -> &ResourceValue {
        &self.value
    }
    pub fn is_partial(&self) -> bool {
        self.is_partial
    }
    pub fn merge_method(&self) -> MergeMethod {
        self.merge_method
    }
}

/// The kind of a resource type's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceTypeKind {
    Json,
    /// An opaque byte blob. Blobs never support partial composition:
    /// attempting to merge two blob candidates is always an error.
    Blob,
}

/// `(name, kind)` plus the merge operation for partial composition.
#[derive(Debug, Clone)]
pub struct ResourceType {
    name: String,
    kind: ResourceTypeKind,
}

impl ResourceType {
    pub fn new(name: impl Into<String>, kind: ResourceTypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> ResourceTypeKind {
        self.kind
    }

    /// Combines `base` with `overlay` under `method`.
    pub fn merge(
        &self,
        base: &ResourceValue,
        overlay: &ResourceValue,
        method: MergeMethod,
    ) -> Result<ResourceValue> {
        match (self.kind, base, overlay) {
            (ResourceTypeKind::Blob, _, _) => Err(Error::UnsupportedMerge(self.name.clone())),
            (ResourceTypeKind::Json, ResourceValue::Json(base), ResourceValue::Json(overlay)) => {
                Ok(ResourceValue::Json(match method {
                    MergeMethod::Replace => overlay.clone(),
                    MergeMethod::Augment => json_augment(base.clone(), overlay.clone()),
                }))
            }
            _ => Err(Error::UnsupportedMerge(self.name.clone())),
        }
    }

    /// The resource-type-defined empty value used as a merge base when no
    /// non-partial candidate contributes one.
    pub fn empty_value(&self) -> ResourceValue {
        match self.kind {
            ResourceTypeKind::Json => ResourceValue::Json(Value::Object(Default::default())),
            ResourceTypeKind::Blob => ResourceValue::Blob(Vec::new()),
        }
    }
}

/// Recursively merges JSON objects; overlay keys win. Arrays and
/// primitives are replaced atomically.
fn json_augment(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (k, v) in overlay_map {
                let merged = match base_map.remove(&k) {
                    Some(base_v) => json_augment(base_v, v),
                    None => v,
                };
                base_map.insert(k, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// The registry of resource types, kept in registration order for
/// deterministic handle assignment.
#[derive(Debug, Default)]
pub struct ResourceTypeRegistry {
    by_name: HashMap<String, usize>,
    table: Vec<ResourceType>,
}

impl ResourceTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, t: ResourceType) -> Result<()> {
        if self.by_name.contains_key(&t.name) {
            return Err(Error::DuplicateResourceType(t.name.clone()));
        }
        self.by_name.insert(t.name.clone(), self.table.len());
        self.table.push(t);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&ResourceType> {
        self.by_name
            .get(name)
            .map(|&i| &self.table[i])
            .ok_or_else(|| Error::UnknownResourceType(name.to_string()))
    }

    pub fn into_vec(self) -> Vec<ResourceType> {
        self.table
    }
}

/// A named entity with a decision and a parallel list of candidates.
/// `candidates.len() == decision's condition-set count` is an invariant
/// enforced at resource construction time.
#[derive(Debug, Clone)]
pub struct Resource {
    id: String,
    resource_type: String,
    decision: crate::intern::Handle,
    candidates: Vec<Candidate>,
}

impl Resource {
    pub fn new(
        id: impl Into<String>,
        resource_type: impl Into<String>,
        decision: crate::intern::Handle,
        candidates: Vec<Candidate>,
    ) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            decision,
            candidates,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }
    pub fn decision(&self) -> crate::intern::Handle {
        self.decision
    }
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn augment_recursively_merges_objects_and_replaces_arrays() {
        let base = json!({"a": 1, "nested": {"x": 1, "y": 2}, "list": [1, 2]});
        let overlay = json!({"b": 2, "nested": {"y": 3}, "list": [9]});
        let merged = json_augment(base, overlay);
        assert_eq!(merged, json!({"a": 1, "b": 2, "nested": {"x": 1, "y": 3}, "list": [9]}));
    }

    #[test]
    fn blob_merge_is_unsupported() {
        let t = ResourceType::new("blob", ResourceTypeKind::Blob);
        let err = t
            .merge(
                &ResourceValue::Blob(vec![1]),
                &ResourceValue::Blob(vec![2]),
                MergeMethod::Augment,
            )
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedMerge(_)));
    }
}
