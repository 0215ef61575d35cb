pub mod builder;
pub mod collate;
pub mod collection;
pub mod config;
pub mod context;
pub mod error;
pub mod intern;
pub mod manager;
pub mod qualifier;
pub mod resolve;
pub mod resource;
pub mod tree;

pub use builder::{CandidateDecl, ConditionDecl, ResourceDecl, ResourceManagerBuilder};
pub use collection::CompiledCollection;
pub use config::{load_config_file, ResolverConfig};
pub use context::Context;
pub use error::{Error, Result};
pub use intern::{Condition, ConditionSet, Decision, Handle, Operator};
pub use manager::ResourceManager;
pub use qualifier::{
    ContextValue, Qualifier, QualifierType, QualifierTypeKind, QualifierRegistry, QualifierTypeRegistry,
};
pub use resolve::{ResolvedValue, Resolver};
pub use resource::{
    Candidate, MergeMethod, Resource, ResourceType, ResourceTypeKind, ResourceTypeRegistry, ResourceValue,
};
pub use tree::{ResourceHandle, ResourceId, ResourceTree, TreeView};
