use core::fmt;
use thiserror::Error;

/// Stage of a transaction at which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStage {
    Start,
    Statement,
    Commit,
    Rollback,
}

impl fmt::Display for TransactionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStage::Start => write!(f, "start"),
            TransactionStage::Statement => write!(f, "statement"),
            TransactionStage::Commit => write!(f, "commit"),
            TransactionStage::Rollback => write!(f, "rollback"),
        }
    }
}

/// Kind of a [`WeaveError`], independent of any context wrapped around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidType,
    InvalidMethodChain,
    Syntax,
    NotFound,
    Found,
    Empty,
    FailedOperation,
    FailedTransaction(TransactionStage),
    BadConnection,
    Configuration,
    DependencyCycle,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeaveError {
    /// Schema derivation was handed something that is not a record
    #[error("Invalid type: {0}")]
    InvalidType(String),

    /// A builder method was called where the statement kind or state forbids it
    #[error("Invalid method chaining: {0}")]
    InvalidMethodChain(String),

    /// Malformed value counts, unresolved fields or aliases
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// No rows found, or a dependency that is not registered
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rows found when the query was told to fail on found
    #[error("Found: {0}")]
    Found(String),

    /// An empty list where at least one element is required
    #[error("Empty: {0}")]
    Empty(String),

    /// The executor failed to run a statement
    #[error("Failed operation: {0}")]
    FailedOperation(String),

    #[error("Failed transaction {stage}: {message}")]
    FailedTransaction {
        stage: TransactionStage,
        message: String,
    },

    /// Opening or pinging the connection failed
    #[error("Bad connection: {0}")]
    BadConnection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The table dependency graph loops back on itself
    #[error("Dependency cycle: {0}")]
    DependencyCycle(String),

    /// Descriptive context appended to an underlying error
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<WeaveError>,
    },

    /// A subordinate failure (rollback, compensation) raised while handling `source`
    #[error("{source}\n\t{joined}")]
    Joined {
        source: Box<WeaveError>,
        joined: Box<WeaveError>,
    },
}

impl WeaveError {
    pub fn transaction(stage: TransactionStage, message: impl Into<String>) -> Self {
        WeaveError::FailedTransaction {
            stage,
            message: message.into(),
        }
    }

    /// Root kind of this error, looking through `Context` and `Joined` wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WeaveError::InvalidType(_) => ErrorKind::InvalidType,
            WeaveError::InvalidMethodChain(_) => ErrorKind::InvalidMethodChain,
            WeaveError::Syntax(_) => ErrorKind::Syntax,
            WeaveError::NotFound(_) => ErrorKind::NotFound,
            WeaveError::Found(_) => ErrorKind::Found,
            WeaveError::Empty(_) => ErrorKind::Empty,
            WeaveError::FailedOperation(_) => ErrorKind::FailedOperation,
            WeaveError::FailedTransaction { stage, .. } => ErrorKind::FailedTransaction(*stage),
            WeaveError::BadConnection(_) => ErrorKind::BadConnection,
            WeaveError::Configuration(_) => ErrorKind::Configuration,
            WeaveError::DependencyCycle(_) => ErrorKind::DependencyCycle,
            WeaveError::Context { source, .. } => source.kind(),
            WeaveError::Joined { source, .. } => source.kind(),
        }
    }

    /// Wraps this error with a description of what was being attempted.
    pub fn context(self, context: impl Into<String>) -> Self {
        WeaveError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Attaches `other` under this error. A `None` leaves the error unchanged.
    pub fn join(self, other: Option<WeaveError>) -> Self {
        match other {
            Some(joined) => WeaveError::Joined {
                source: Box::new(self),
                joined: Box::new(joined),
            },
            None => self,
        }
    }

    /// The subordinate error attached with [`WeaveError::join`], if any.
    pub fn joined(&self) -> Option<&WeaveError> {
        match self {
            WeaveError::Joined { joined, .. } => Some(joined),
            WeaveError::Context { source, .. } => source.joined(),
            _ => None,
        }
    }
}

/// Result type for pgweave operations
pub type Result<T> = std::result::Result<T, WeaveError>;
