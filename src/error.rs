use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "config.byte_budget")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected range, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "slot_pool", "google_web")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the transpool runtime.
///
/// Per-item and per-batch failures never surface here: they are absorbed by the
/// slots and turned into "still pending" state. What remains are structural
/// violations (pool misuse, bad configuration) and errors raised by collaborators
/// such as transforms and stores.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Slot pool exhausted: cannot create slot {index}, capacity is {capacity}")]
    PoolExhaustion { index: usize, capacity: usize },

    #[error("Invalid slot access: slot {index} does not exist ({created} created)")]
    InvalidSlotAccess { index: usize, created: usize },

    #[error("Slot {index} is already reserved")]
    SlotAlreadyReserved { index: usize },

    /// A transform call failed. `retryable` classifies the failure for logs
    /// and callers; the orchestrator requeues every failed batch regardless
    /// until its attempts run out.
    #[error("Transform error: {message}{}", format_context(.context))]
    Transform {
        message: String,
        retryable: bool,
        context: ErrorContext,
    },

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new runtime error with structured context
    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Create a transform error that a later attempt may succeed on.
    pub fn transform(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Transform {
            message: msg.into(),
            retryable: true,
            context,
        }
    }

    /// Create a transform error that retrying will not fix.
    pub fn transform_fatal(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Transform {
            message: msg.into(),
            retryable: false,
            context,
        }
    }

    /// Shorthand for a runtime error without context.
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::runtime_with_context(msg, ErrorContext::new())
    }

    /// Whether this error reflects misuse of the pool rather than a failed call.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::PoolExhaustion { .. }
                | Error::InvalidSlotAccess { .. }
                | Error::SlotAlreadyReserved { .. }
                | Error::Configuration { .. }
        )
    }

    /// Whether the failure is likely transient. Informational only.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transform { retryable, .. } => *retryable,
            Error::Io(_) => true,
            _ => false,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. }
            | Error::Transform { context, .. }
            | Error::Runtime { context, .. } => Some(context),
            _ => None,
        }
    }
}
