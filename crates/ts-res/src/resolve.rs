//! The resolver: scores a resource's candidates against a runtime context,
//! discards non-matches, and composes partial candidates into a final
//! value.

use crate::config::ResolverConfig;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::intern::{ConditionSet, Handle};
use crate::manager::ResourceManager;
use crate::qualifier::QualifierType;
use crate::resource::{Candidate, ResourceValue};
use std::fmt;

/// The outcome of a successful resolution: the composed value, the score
/// of its highest-scoring contributor, and the condition sets that
/// contributed to it, in contribution order (highest score first). The
/// last entry is the base; everything before it is a partial overlay.
#[derive(Debug, Clone)]
pub struct ResolvedValue {
    pub value: ResourceValue,
    pub score: f64,
    pub contributors: Vec<Handle>,
}

impl fmt::Display for ResolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "score={:.3} via {} condition set(s)", self.score, self.contributors.len())
    }
}

/// One scored candidate, prior to sorting.
struct Scored<'a> {
    condition_set: Handle,
    candidate: &'a Candidate,
    score: f64,
}

/// A frozen `ResourceManager` plus the tunables under which it is
/// resolved.
pub struct Resolver<'a> {
    manager: &'a ResourceManager,
    config: ResolverConfig,
}

impl<'a> Resolver<'a> {
    pub fn new(manager: &'a ResourceManager) -> Self {
        Self {
            manager,
            config: ResolverConfig::default(),
        }
    }

    pub fn with_config(manager: &'a ResourceManager, config: ResolverConfig) -> Self {
        Self { manager, config }
    }

    /// Resolves `id` against `ctx`. `NotFound` and `NoMatchingCandidate`
    /// are returned as errors but are expected, user-visible outcomes
    /// rather than exceptional conditions — see the note on `Error`.
    pub fn resolve(&self, id: &str, ctx: &Context) -> Result<ResolvedValue> {
        self.validate_context(ctx)?;

        let handle = self.manager.get_resource_handle(id)?;
        let collection = self.manager.collection();
        let resource = &collection.resources[handle as usize];
        let resource_type = self.manager.resource_type(resource.resource_type())?;
        let decision = &collection.decisions[resource.decision() as usize];

        let mut scored: Vec<Scored> = decision
            .condition_sets()
            .iter()
            .zip(resource.candidates())
            .map(|(&cs_handle, candidate)| Scored {
                condition_set: cs_handle,
                candidate,
                score: self.score_condition_set(&collection.condition_sets[cs_handle as usize], ctx),
            })
            .filter(|s| s.score > 0.0)
            .collect();

        if scored.is_empty() {
            return Err(Error::NoMatchingCandidate(id.to_string()));
        }

        // Sort by (score desc, decision position asc) — ties keep the
        // decision's authored precedence. `sort_by` is stable, so a
        // simple score-desc comparison preserves original
        // (position-ascending) order among equal scores.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());

        let top = &scored[0];
        if !top.candidate.is_partial() {
            tracing::debug!(id, score = top.score, "resolved to a non-partial candidate");
            return Ok(ResolvedValue {
                value: top.candidate.value().clone(),
                score: top.score,
                contributors: vec![top.condition_set],
            });
        }

        self.compose(id, resource_type, &scored)
    }

    /// Validates every context entry against the qualifier (if known) it
    /// names; unknown qualifiers are tolerated and ignored, mirroring
    /// `ResourceManagerBuilder::validate_context`.
    fn validate_context(&self, ctx: &Context) -> Result<()> {
        for (name, value) in ctx.iter() {
            let qualifier = match self.manager.qualifier_by_name(name) {
                Ok(q) => q,
                Err(_) => {
                    tracing::warn!(qualifier = name, "context references unknown qualifier");
                    continue;
                }
            };
            let qtype = self.manager.qualifier_type(qualifier.type_name())?;
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

    /// A condition set's score is the priority-weighted average of its
    /// conditions' scores: `Σ(p_i · s_i) / Σ(p_i)`. Any condition scoring
    /// exactly 0 (including one whose qualifier has no context value)
    /// zeroes the whole set. The unconditional set always scores the
    /// configured floor.
    fn score_condition_set(&self, set: &ConditionSet, ctx: &Context) -> f64 {
        if set.is_unconditional() {
            return self.config.unconditional_floor;
        }
        let collection = self.manager.collection();
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        for &handle in set.conditions() {
            let condition = &collection.conditions[handle as usize];
            let qtype = match self.qualifier_type_for(condition.qualifier()) {
                Some(t) => t,
                None => return 0.0,
            };
            let context_value = match ctx.get(condition.qualifier()) {
                Some(v) => v,
                None => return 0.0,
            };
            let s = qtype.score(condition.value(), context_value);
            if s == 0.0 {
                return 0.0;
            }
            let weight = condition.priority() as f64 / 1000.0;
            weighted_sum += weight * s;
            weight_total += weight;
        }
        if weight_total == 0.0 {
            return 0.0;
        }
        weighted_sum / weight_total
    }

    fn qualifier_type_for(&self, qualifier_name: &str) -> Option<&QualifierType> {
        let qualifier = self.manager.qualifier_by_name(qualifier_name).ok()?;
        self.manager.qualifier_type(qualifier.type_name()).ok()
    }

    /// Composes a run of partial candidates onto the first non-partial
    /// base found further down the score-ordered list, applying partials
    /// from lowest to highest score so the highest-scoring overlay wins.
    fn compose(
        &self,
        id: &str,
        resource_type: &crate::resource::ResourceType,
        scored: &[Scored],
    ) -> Result<ResolvedValue> {
        let base_idx = scored.iter().position(|s| !s.candidate.is_partial());
        let overlay_range = &scored[..base_idx.unwrap_or(scored.len())];

        let mut value = match base_idx {
            Some(i) => scored[i].candidate.value().clone(),
            None => resource_type.empty_value(),
        };
        for entry in overlay_range.iter().rev() {
            value = resource_type.merge(&value, entry.candidate.value(), entry.candidate.merge_method())?;
        }

        let mut contributors: Vec<Handle> = overlay_range.iter().map(|s| s.condition_set).collect();
        if let Some(i) = base_idx {
            contributors.push(scored[i].condition_set);
        }
        if contributors.is_empty() {
            return Err(Error::NoMatchingCandidate(id.to_string()));
        }

        let top_score = scored[0].score;
        tracing::debug!(id, score = top_score, contributors = contributors.len(), "composed partial candidates");
        Ok(ResolvedValue {
            value,
            score: top_score,
            contributors,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::builder::{CandidateDecl, ConditionDecl, ResourceDecl, ResourceManagerBuilder};
    use crate::qualifier::{Qualifier, QualifierType, QualifierTypeKind};
    use crate::resource::{MergeMethod, ResourceType, ResourceTypeKind};
    use serde_json::json;

    fn manager_with_welcome() -> ResourceManager {
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
            candidates: vec![
                CandidateDecl {
                    conditions: vec![ConditionDecl::new("home", "US")],
                    value: ResourceValue::Json(json!("Hi")),
                    is_partial: false,
                    merge_method: MergeMethod::Replace,
                },
                CandidateDecl {
                    conditions: vec![ConditionDecl::new("home", "CA")],
                    value: ResourceValue::Json(json!("Bonjour-eh")),
                    is_partial: false,
                    merge_method: MergeMethod::Replace,
                },
                CandidateDecl {
                    conditions: vec![],
                    value: ResourceValue::Json(json!("Hello")),
                    is_partial: false,
                    merge_method: MergeMethod::Replace,
                },
            ],
        })
        .unwrap();
        ResourceManager::from_collection(b.compile().unwrap())
    }

    #[test]
    fn resolves_exact_match_over_unconditional_fallback() {
        let manager = manager_with_welcome();
        let resolver = Resolver::new(&manager);
        let ctx = Context::new().with("home", "US");
        let resolved = resolver.resolve("welcome", &ctx).unwrap();
        assert_eq!(resolved.value, ResourceValue::Json(json!("Hi")));
        assert_eq!(resolved.score, 1.0);
    }

    #[test]
    fn falls_back_to_unconditional_when_nothing_matches() {
        let manager = manager_with_welcome();
        let resolver = Resolver::new(&manager);
        let ctx = Context::new().with("home", "FR");
        let resolved = resolver.resolve("welcome", &ctx).unwrap();
        assert_eq!(resolved.value, ResourceValue::Json(json!("Hello")));
        assert_eq!(resolved.score, 0.5);
    }

    #[test]
    fn missing_resource_is_not_found() {
        let manager = manager_with_welcome();
        let resolver = Resolver::new(&manager);
        let err = resolver.resolve("nope", &Context::new()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn partial_candidates_compose_lowest_to_highest_score() {
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
            id: "settings".into(),
            resource_type: "json".into(),
            candidates: vec![
                CandidateDecl {
                    conditions: vec![ConditionDecl::new("home", "US")],
                    value: ResourceValue::Json(json!({"currency": "USD"})),
                    is_partial: true,
                    merge_method: MergeMethod::Augment,
                },
                CandidateDecl {
                    conditions: vec![],
                    value: ResourceValue::Json(json!({"currency": "XXX", "locale": "en"})),
                    is_partial: false,
                    merge_method: MergeMethod::Replace,
                },
            ],
        })
        .unwrap();
        let manager = ResourceManager::from_collection(b.compile().unwrap());
        let resolver = Resolver::new(&manager);
        let ctx = Context::new().with("home", "US");
        let resolved = resolver.resolve("settings", &ctx).unwrap();
        assert_eq!(resolved.value, ResourceValue::Json(json!({"currency": "USD", "locale": "en"})));
        assert_eq!(resolved.score, 1.0);
        assert_eq!(resolved.contributors.len(), 2);
    }

    #[test]
    fn scenario_three_partials_compose_over_a_language_fallback_chain() {
        let mut b = ResourceManagerBuilder::new();
        b.register_qualifier_type(QualifierType::new("language", QualifierTypeKind::Language, false))
            .unwrap();
        b.register_qualifier(Qualifier::new("lang", "language", 100, None, false).unwrap())
            .unwrap();
        b.register_resource_type(ResourceType::new("json", ResourceTypeKind::Json))
            .unwrap();
        b.add_resource(ResourceDecl {
            id: "strings".into(),
            resource_type: "json".into(),
            candidates: vec![
                CandidateDecl {
                    conditions: vec![ConditionDecl::new("lang", "en-US")],
                    value: ResourceValue::Json(json!({"a": 1})),
                    is_partial: true,
                    merge_method: MergeMethod::Augment,
                },
                CandidateDecl {
                    conditions: vec![ConditionDecl::new("lang", "en")],
                    value: ResourceValue::Json(json!({"a": 0, "b": 2})),
                    is_partial: true,
                    merge_method: MergeMethod::Augment,
                },
                CandidateDecl {
                    conditions: vec![],
                    value: ResourceValue::Json(json!({"c": 3})),
                    is_partial: false,
                    merge_method: MergeMethod::Augment,
                },
            ],
        })
        .unwrap();
        let manager = ResourceManager::from_collection(b.compile().unwrap());
        let resolver = Resolver::new(&manager);
        let ctx = Context::new().with("lang", "en-US");
        let resolved = resolver.resolve("strings", &ctx).unwrap();
        assert_eq!(resolved.value, ResourceValue::Json(json!({"a": 1, "b": 2, "c": 3})));
        assert_eq!(resolved.contributors.len(), 3);
    }
}
