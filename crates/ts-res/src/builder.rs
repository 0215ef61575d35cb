//! The builder crossroads: validates declarations, interns conditions,
//! condition sets, and decisions, assembles resources into the tree, and
//! freezes everything into a `CompiledCollection`.

use crate::collection::CompiledCollection;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::intern::{Condition, ConditionInterner, ConditionSetInterner, DecisionInterner, Handle};
use crate::qualifier::{QualifierRegistry, QualifierTypeRegistry};
use crate::resource::{Candidate, Resource, ResourceType, ResourceTypeRegistry, ResourceValue};
use crate::tree::ResourceTree;

/// One authored condition, prior to qualifier/value validation and
/// interning. `priority` defaults to the qualifier's `default_priority`
/// when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionDecl {
    pub qualifier: String,
    pub value: String,
    pub priority: Option<i16>,
}

impl ConditionDecl {
    pub fn new(qualifier: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            qualifier: qualifier.into(),
            value: value.into(),
            priority: None,
        }
    }

    pub fn with_priority(mut self, priority: i16) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// One authored candidate, prior to interning.
#[derive(Debug, Clone)]
pub struct CandidateDecl {
    pub conditions: Vec<ConditionDecl>,
    pub value: ResourceValue,
    pub is_partial: bool,
    pub merge_method: crate::resource::MergeMethod,
}

/// One authored resource declaration, as produced by an importer or
/// handed directly to the builder.
#[derive(Debug, Clone)]
pub struct ResourceDecl {
    pub id: String,
    pub resource_type: String,
    pub candidates: Vec<CandidateDecl>,
}

/// Aggregates the qualifier/resource-type registries, the three
/// interners, and the resource tree; validates cross-references; and
/// produces the compiled collection.
pub struct ResourceManagerBuilder {
    qualifier_types: QualifierTypeRegistry,
    qualifiers: QualifierRegistry,
    resource_types: ResourceTypeRegistry,
    conditions: ConditionInterner,
    condition_sets: ConditionSetInterner,
    decisions: DecisionInterner,
    resources: Vec<Resource>,
    tree: ResourceTree,
}

impl Default for ResourceManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceManagerBuilder {
    pub fn new() -> Self {
        Self {
            qualifier_types: QualifierTypeRegistry::new(),
            qualifiers: QualifierRegistry::new(),
            resource_types: ResourceTypeRegistry::new(),
            conditions: ConditionInterner::new(),
            condition_sets: ConditionSetInterner::new(),
            decisions: DecisionInterner::new(),
            resources: Vec::new(),
            tree: ResourceTree::new(),
        }
    }

    pub fn register_qualifier_type(&mut self, t: crate::qualifier::QualifierType) -> Result<()> {
        self.qualifier_types.register(t)
    }

    pub fn register_qualifier(&mut self, q: crate::qualifier::Qualifier) -> Result<()> {
        self.qualifier_types.get(q.type_name())?;
        self.qualifiers.add(q)
    }

    pub fn register_resource_type(&mut self, t: ResourceType) -> Result<()> {
        self.resource_types.register(t)
    }

    pub fn qualifiers(&self) -> &QualifierRegistry {
        &self.qualifiers
    }

    pub fn qualifier_types(&self) -> &QualifierTypeRegistry {
        &self.qualifier_types
    }

    pub fn num_resources(&self) -> usize {
        self.resources.len()
    }

    pub fn num_candidates(&self) -> usize {
        self.resources.iter().map(|r| r.candidates().len()).sum()
    }

    /// Every key must be a known qualifier; every value must validate
    /// against that qualifier's type.
    pub fn validate_context(&self, ctx: &Context) -> Result<()> {
        for (name, value) in ctx.iter() {
            let qualifier = match self.qualifiers.get_by_name(name) {
                Ok(q) => q,
                Err(_) => {
                    tracing::warn!(qualifier = name, "context references unknown qualifier");
                    continue;
                }
            };
            let qtype = self.qualifier_types.get(qualifier.type_name())?;
            match value {
                crate::qualifier::ContextValue::Single(v) => {
                    qtype
                        .validate(v)
                        .map_err(|e| Error::InvalidContext(format!("{name}: {e}")))?;
                }
                crate::qualifier::ContextValue::List(vs) => {
                    if !qtype.allow_context_list() {
                        return Err(Error::InvalidContext(format!(
                            "{name}: qualifier type does not accept a list of values"
                        )));
                    }
                    for v in vs {
                        qtype
                            .validate(v)
                            .map_err(|e| Error::InvalidContext(format!("{name}: {e}")))?;
                    }
                }
            }
        }
        Ok(())
    }

    fn intern_condition(&mut self, decl: &ConditionDecl) -> Result<Handle> {
        let qualifier = self.qualifiers.get_by_name_or_token(&decl.qualifier)?;
        let qtype = self.qualifier_types.get(qualifier.type_name())?;
        qtype.validate(&decl.value)?;
        let canonical = qtype.canonicalize(&decl.value);
        let priority = decl.priority.unwrap_or_else(|| qualifier.default_priority());
        Ok(self
            .conditions
            .intern(Condition::new(qualifier.name(), canonical, priority)))
    }

    /// Validates id, resource type, every candidate's value, and every
    /// condition; interns conditions/condition-sets/decision; and
    /// appends the resource to the tree.
    pub fn add_resource(&mut self, decl: ResourceDecl) -> Result<()> {
        self.try_add_resource(&decl).map_err(|e| Error::WhileCompiling {
            id: decl.id.clone(),
            source: Box::new(e),
        })
    }

    fn try_add_resource(&mut self, decl: &ResourceDecl) -> Result<()> {
        self.resource_types.get(&decl.resource_type)?;

        let mut condition_set_handles = Vec::with_capacity(decl.candidates.len());
        let mut candidates = Vec::with_capacity(decl.candidates.len());
        for candidate in &decl.candidates {
            let mut handles = Vec::with_capacity(candidate.conditions.len());
            for cond in &candidate.conditions {
                handles.push(self.intern_condition(cond)?);
            }
            let set = self.condition_sets.intern(handles, &self.conditions)?;
            condition_set_handles.push(set);
            candidates.push(Candidate::new(
                candidate.value.clone(),
                candidate.is_partial,
                candidate.merge_method,
            ));
        }

        if candidates.len() != condition_set_handles.len() {
            return Err(Error::CandidateDecisionMismatch {
                id: decl.id.clone(),
                candidates: candidates.len(),
                condition_sets: condition_set_handles.len(),
            });
        }

        let decision = self.decisions.intern(condition_set_handles)?;
        let resource = Resource::new(decl.id.clone(), decl.resource_type.clone(), decision, candidates);

        let handle = self.resources.len() as u32;
        self.tree.insert(&decl.id, handle)?;
        self.resources.push(resource);
        tracing::debug!(id = %decl.id, candidates = self.resources[handle as usize].candidates().len(), "interned resource");
        Ok(())
    }

    /// Freezes the builder into a read-only `CompiledCollection`.
    pub fn compile(self) -> Result<CompiledCollection> {
        Ok(CompiledCollection {
            qualifier_types: self.qualifier_types.into_vec(),
            qualifiers: self.qualifiers.into_vec(),
            resource_types: self.resource_types.into_vec(),
            conditions: self.conditions.into_vec(),
            condition_sets: self.condition_sets.into_vec(),
            decisions: self.decisions.into_vec(),
            resources: self.resources,
            tree: self.tree,
        })
    }
}
