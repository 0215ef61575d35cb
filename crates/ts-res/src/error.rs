/// Errors produced by the qualifier registries, interners, resource tree,
/// and builder. Resolution failures that are expected, user-visible outcomes
/// (`NotFound`, `NoMatchingCandidate`) live here too, but callers should
/// treat them as values rather than exceptional conditions.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("qualifier type '{0}' is already registered")]
    DuplicateQualifierType(String),
    #[error("qualifier type '{0}' is not registered")]
    UnknownQualifierType(String),
    #[error("qualifier '{0}' is already registered")]
    DuplicateQualifier(String),
    #[error("qualifier '{0}' is not registered")]
    UnknownQualifier(String),
    #[error("invalid qualifier name '{0}': must match [A-Za-z_][A-Za-z0-9_-]*")]
    InvalidQualifierName(String),

    #[error("invalid value '{value}' for qualifier type '{type_name}': {reason}")]
    InvalidValue {
        type_name: String,
        value: String,
        reason: String,
    },

    #[error("condition set contains more than one condition for qualifier '{0}'")]
    DuplicateQualifierInSet(String),

    #[error("decision may contain the unconditional set at most once, and only as its last element")]
    MisplacedUnconditionalSet,

    #[error("resource type '{0}' is already registered")]
    DuplicateResourceType(String),
    #[error("resource type '{0}' is not registered")]
    UnknownResourceType(String),

    #[error("invalid resource id component '{0}': must match [A-Za-z_][A-Za-z0-9_-]*")]
    InvalidResourceName(String),
    #[error("path conflict at '{0}': a resource id cannot be both a leaf and a branch")]
    PathConflict(String),
    #[error("resource '{0}' not found")]
    NotFound(String),
    #[error("'{0}' is a branch, not a resource")]
    IsABranch(String),
    #[error("'{0}' is a resource, not a branch")]
    IsALeaf(String),

    #[error("resource '{id}' has {candidates} candidate(s) but its decision has {condition_sets} condition set(s)")]
    CandidateDecisionMismatch {
        id: String,
        candidates: usize,
        condition_sets: usize,
    },

    #[error("context value '{0}' is invalid")]
    InvalidContext(String),

    #[error("no candidate of '{0}' matched the supplied context")]
    NoMatchingCandidate(String),

    #[error("merge of two '{0}' candidates is not supported")]
    UnsupportedMerge(String),

    #[error("bundle checksum mismatch: expected {expected}, computed {computed}")]
    IntegrityVerificationFailed { expected: String, computed: String },

    #[error("bundle checksum '{0}' has an unrecognized length; cannot infer a hash normaliser")]
    UnknownChecksumFormat(String),

    #[error("while importing '{path}': {source}")]
    WhileImporting {
        path: String,
        #[source]
        source: Box<Error>,
    },

    #[error("while compiling resource '{id}': {source}")]
    WhileCompiling {
        id: String,
        #[source]
        source: Box<Error>,
    },

    #[error("'{0}' does not name a qualifier or token, and is ambiguous among: {1:?}")]
    AmbiguousTerseToken(String, Vec<String>),

    #[error("malformed importable: {0}")]
    MalformedImportable(String),
    #[error("unknown importable type '{0}'")]
    UnknownImportableType(String),

    #[error("invalid config file '{path}': {reason}")]
    InvalidConfigFile { path: String, reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
