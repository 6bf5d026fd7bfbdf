//! Error types shared by the tree, codec, and builder

use std::error::Error;
use std::fmt;

/// Boxed error type for error sources
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Result type alias for vsd operations
pub type Result<T> = std::result::Result<T, VsdError>;

/// A vsd operation error with rich diagnostics
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub struct VsdError {
    kind: VsdErrorKind,
    #[source]
    source: Option<BoxError>,
    #[help]
    help: Option<String>,
    context: Option<String>,
}

/// POSIX-style error categories reused as a taxonomy for tree and codec failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VsdErrorKind {
    /// Nil input, malformed path, type mismatch, or parse failure
    InvalidArgument,
    /// Unknown path, id, or signature
    NotFound,
    /// A path traversed through a leaf
    NotADirectory,
    /// A scalar operation addressed a branch
    IsADirectory,
    /// `unsubscribe` found no matching registration
    NoSubscriber,
    /// Encode buffer exhausted
    NoSpace,
    /// Inbound payload ended before a record completed
    Truncated,
    /// Inbound payload named a branch, or a `stream`/`none` leaf, where a scalar record was expected
    UnsupportedKind,
    /// Decode referenced a subtree signature absent from the local tree
    UnknownSignature,
    /// Construction-time duplicate `numeric_id`
    DuplicateId,
    /// The transport adapter failed to deliver an outbound payload
    Transport,
}

impl VsdError {
    /// Create a new error with the given kind and optional source
    pub fn new(kind: VsdErrorKind, source: Option<BoxError>) -> Self {
        Self {
            kind,
            source,
            help: None,
            context: None,
        }
    }

    /// Attach a help message
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Attach free-form context
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// The error's category
    pub fn kind(&self) -> VsdErrorKind {
        self.kind
    }

    // Constructors for each taxonomy member

    /// A nil input, malformed path, type mismatch, or string-parse failure
    pub fn invalid_argument(context: impl Into<String>) -> Self {
        Self::new(VsdErrorKind::InvalidArgument, None).with_context(context)
    }

    /// An unknown path, numeric id, or subtree signature
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        Self::new(VsdErrorKind::NotFound, None).with_context(format!("{resource} not found: {id}"))
    }

    /// A path traversed through a leaf before it was exhausted
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::new(VsdErrorKind::NotADirectory, None)
            .with_context(path.into())
            .with_help("every non-final path component must name a branch")
    }

    /// A scalar operation addressed a branch
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::new(VsdErrorKind::IsADirectory, None)
            .with_context(path.into())
            .with_help("value accessors only apply to leaves")
    }

    /// `unsubscribe` found no matching registration on the node
    pub fn no_subscriber() -> Self {
        Self::new(VsdErrorKind::NoSubscriber, None)
    }

    /// The encode buffer was exhausted before the subtree finished serializing
    pub fn no_space(needed: usize, capacity: usize) -> Self {
        Self::new(VsdErrorKind::NoSpace, None)
            .with_context(format!("needed at least {needed} bytes, buffer holds {capacity}"))
    }

    /// The inbound payload ended mid-record
    pub fn truncated(context: impl Into<String>) -> Self {
        Self::new(VsdErrorKind::Truncated, None).with_context(context)
    }

    /// The inbound payload named a branch, or a `stream`/`none` leaf
    pub fn unsupported_kind(context: impl Into<String>) -> Self {
        Self::new(VsdErrorKind::UnsupportedKind, None).with_context(context)
    }

    /// Decode referenced a subtree signature absent from the local tree
    pub fn unknown_signature(signature: u32) -> Self {
        Self::new(VsdErrorKind::UnknownSignature, None)
            .with_context(format!("signature 0x{signature:08x}"))
            .with_help("peers must share the same signal specification")
    }

    /// Construction-time duplicate `numeric_id`
    pub fn duplicate_id(id: u32) -> Self {
        Self::new(VsdErrorKind::DuplicateId, None).with_context(format!("id {id}"))
    }

    /// The transport adapter failed to deliver an outbound payload
    pub fn transport(source: BoxError) -> Self {
        Self::new(VsdErrorKind::Transport, Some(source))
    }
}

impl fmt::Display for VsdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(ctx) = &self.context {
            write!(f, ": {ctx}")?;
        }
        if let Some(src) = &self.source {
            write!(f, ": {src}")?;
        }
        Ok(())
    }
}
