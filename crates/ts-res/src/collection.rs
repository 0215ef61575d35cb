//! The frozen, read-only compiled collection.
//!
//! All cross-references in a `CompiledCollection` are plain indices into
//! its own arrays. Array position *is* the handle — this is what lets a
//! bundle be self-describing and lets `BundleBuilder` compute a stable
//! checksum over it.

use crate::intern::{Condition, ConditionSet, Decision};
use crate::qualifier::{Qualifier, QualifierType};
use crate::resource::{Candidate, MergeMethod, Resource, ResourceType, ResourceValue};
use crate::tree::ResourceTree;
use serde::Serialize;

/// A frozen snapshot produced by `ResourceManagerBuilder::compile`. Every
/// vector here is indexed by the handle type used elsewhere in the crate
/// (`intern::Handle`, `tree::ResourceHandle`, or a plain
/// qualifier/resource-type index).
#[derive(Debug)]
pub struct CompiledCollection {
    pub qualifier_types: Vec<QualifierType>,
    pub qualifiers: Vec<Qualifier>,
    pub resource_types: Vec<ResourceType>,
    pub conditions: Vec<Condition>,
    pub condition_sets: Vec<ConditionSet>,
    pub decisions: Vec<Decision>,
    pub resources: Vec<Resource>,
    pub tree: ResourceTree,
}

/// A serializable, canonical projection of a `CompiledCollection` used
/// only to compute the bundle checksum. It intentionally excludes the
/// `ResourceTree`, whose structure is fully recoverable from
/// `resources[*].id` — the checksum covers content, not incidental index
/// layout.
#[derive(Serialize)]
struct Canonical<'a> {
    qualifier_types: Vec<CanonicalQualifierType<'a>>,
    qualifiers: Vec<CanonicalQualifier<'a>>,
    resource_types: Vec<&'a str>,
    conditions: Vec<(&'a str, &'a str, i16)>,
    condition_sets: Vec<&'a [u32]>,
    decisions: Vec<&'a [u32]>,
    resources: Vec<CanonicalResource<'a>>,
}

#[derive(Serialize)]
struct CanonicalQualifierType<'a> {
    name: &'a str,
    allow_context_list: bool,
}

#[derive(Serialize)]
struct CanonicalQualifier<'a> {
    name: &'a str,
    type_name: &'a str,
    default_priority: i16,
    token: Option<&'a str>,
}

#[derive(Serialize)]
struct CanonicalResource<'a> {
    id: &'a str,
    resource_type: &'a str,
    decision: u32,
    candidates: Vec<CanonicalCandidate<'a>>,
}

/// The full payload of one candidate, not just its count — a bit flipped
/// anywhere in here must change the checksum.
#[derive(Serialize)]
struct CanonicalCandidate<'a> {
    value: CanonicalValue<'a>,
    is_partial: bool,
    merge_method: MergeMethod,
}

#[derive(Serialize)]
#[serde(tag = "kind")]
enum CanonicalValue<'a> {
    Json { value: &'a serde_json::Value },
    Blob { bytes: &'a [u8] },
}

impl<'a> From<&'a ResourceValue> for CanonicalValue<'a> {
    fn from(value: &'a ResourceValue) -> Self {
        match value {
            ResourceValue::Json(value) => CanonicalValue::Json { value },
            ResourceValue::Blob(bytes) => CanonicalValue::Blob { bytes },
        }
    }
}

impl<'a> From<&'a Candidate> for CanonicalCandidate<'a> {
    fn from(candidate: &'a Candidate) -> Self {
        CanonicalCandidate {
            value: candidate.value().into(),
            is_partial: candidate.is_partial(),
            merge_method: candidate.merge_method(),
        }
    }
}

impl CompiledCollection {
    /// The deterministic byte encoding hashed to produce the bundle
    /// checksum. Canonicalisation orders arrays by handle index (already
    /// true by construction) and omits nothing — every candidate's value,
    /// partiality, and merge method is included, not merely counted.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let canonical = Canonical {
            qualifier_types: self
                .qualifier_types
                .iter()
                .map(|t| CanonicalQualifierType {
                    name: t.name(),
                    allow_context_list: t.allow_context_list(),
                })
                .collect(),
            qualifiers: self
                .qualifiers
                .iter()
                .map(|q| CanonicalQualifier {
                    name: q.name(),
                    type_name: q.type_name(),
                    default_priority: q.default_priority(),
                    token: q.token(),
                })
                .collect(),
            resource_types: self.resource_types.iter().map(ResourceType::name).collect(),
            conditions: self
                .conditions
                .iter()
                .map(|c| (c.qualifier(), c.value(), c.priority()))
                .collect(),
            condition_sets: self.condition_sets.iter().map(|s| s.conditions()).collect(),
            decisions: self.decisions.iter().map(|d| d.condition_sets()).collect(),
            resources: self
                .resources
                .iter()
                .map(|r| CanonicalResource {
                    id: r.id(),
                    resource_type: r.resource_type(),
                    decision: r.decision(),
                    candidates: r.candidates().iter().map(CanonicalCandidate::from).collect(),
                })
                .collect(),
        };
        // serde_json's default map/struct encoding is field-order stable
        // for structs (it is not a map), so this is deterministic byte-
        // for-byte across builds over identical inputs.
        serde_json::to_vec(&canonical).expect("canonical collection always serializes")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::builder::{CandidateDecl, ConditionDecl, ResourceDecl, ResourceManagerBuilder};
    use crate::qualifier::{Qualifier, QualifierType, QualifierTypeKind};
    use crate::resource::{MergeMethod, ResourceTypeKind};
    use serde_json::json;

    fn sample_collection() -> CompiledCollection {
        let mut b = ResourceManagerBuilder::new();
        b.register_qualifier_type(QualifierType::new(
            "territory",
            QualifierTypeKind::Territory {
                regions: Default::default(),
            },
            false,
        ))
        .unwrap();
        b.register_qualifier(Qualifier::new("home", "territory", 100, None, false).unwrap())
            .unwrap();
        b.register_resource_type(ResourceType::new("json", ResourceTypeKind::Json))
            .unwrap();
        b.add_resource(ResourceDecl {
            id: "welcome".into(),
            resource_type: "json".into(),
            candidates: vec![CandidateDecl {
                conditions: vec![ConditionDecl::new("home", "US")],
                value: ResourceValue::Json(json!("Hi")),
                is_partial: false,
                merge_method: MergeMethod::Replace,
            }],
        })
        .unwrap();
        b.compile().unwrap()
    }

    #[test]
    fn canonical_bytes_is_a_stable_snapshot_of_the_collection_shape() {
        let collection = sample_collection();
        let value: serde_json::Value = serde_json::from_slice(&collection.canonical_bytes()).unwrap();
        insta::assert_yaml_snapshot!(value);
    }

    #[test]
    fn flipping_a_candidate_value_byte_changes_the_checksum() {
        let collection = sample_collection();
        let original = collection.canonical_bytes();

        let mut b = ResourceManagerBuilder::new();
        b.register_qualifier_type(QualifierType::new(
            "territory",
            QualifierTypeKind::Territory {
                regions: Default::default(),
            },
            false,
        ))
        .unwrap();
        b.register_qualifier(Qualifier::new("home", "territory", 100, None, false).unwrap())
            .unwrap();
        b.register_resource_type(ResourceType::new("json", ResourceTypeKind::Json))
            .unwrap();
        b.add_resource(ResourceDecl {
            id: "welcome".into(),
            resource_type: "json".into(),
            candidates: vec![CandidateDecl {
                conditions: vec![ConditionDecl::new("home", "US")],
                value: ResourceValue::Json(json!("Hi!")),
                is_partial: false,
                merge_method: MergeMethod::Replace,
            }],
        })
        .unwrap();
        let tampered = b.compile().unwrap().canonical_bytes();

        assert_ne!(original, tampered);
    }

    #[test]
    fn flipping_merge_method_changes_the_checksum() {
        let collection = sample_collection();
        let original = collection.canonical_bytes();

        let mut b = ResourceManagerBuilder::new();
        b.register_qualifier_type(QualifierType::new(
            "territory",
            QualifierTypeKind::Territory {
                regions: Default::default(),
            },
            false,
        ))
        .unwrap();
        b.register_qualifier(Qualifier::new("home", "territory", 100, None, false).unwrap())
            .unwrap();
        b.register_resource_type(ResourceType::new("json", ResourceTypeKind::Json))
            .unwrap();
        b.add_resource(ResourceDecl {
            id: "welcome".into(),
            resource_type: "json".into(),
            candidates: vec![CandidateDecl {
                conditions: vec![ConditionDecl::new("home", "US")],
                value: ResourceValue::Json(json!("Hi")),
                is_partial: true,
                merge_method: MergeMethod::Augment,
            }],
        })
        .unwrap();
        let tampered = b.compile().unwrap().canonical_bytes();

        assert_ne!(original, tampered);
    }
}
