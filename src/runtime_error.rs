use crate::lang::value::BlockId;
use crate::registry::RegistryError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackKind {
    Code,
    Data,
}

impl std::fmt::Display for StackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackKind::Code => write!(f, "code"),
            StackKind::Data => write!(f, "data"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("{stack} stack is empty (in '{op}')")]
    EmptyStack { stack: StackKind, op: String },

    #[error("type mismatch in '{op}': expected {expected}, got {found}")]
    TypeMismatch {
        op: String,
        expected: &'static str,
        found: String,
    },

    #[error("unbound name: {0}")]
    UnboundName(String),

    #[error("unknown block: {0}")]
    UnknownBlock(BlockId),

    #[error("block {0} is already closed")]
    SealedBlock(BlockId),

    #[error("no block ids left after {0}")]
    BlockIdsExhausted(BlockId),

    #[error("'(' without a block to close")]
    UnbalancedBlock,

    #[error("block {0} is never closed")]
    UnterminatedBlock(BlockId),

    #[error("'[' without a list to close")]
    UnbalancedList,

    #[error("list is never closed")]
    UnterminatedList,

    #[error("nested list literals are not supported")]
    NestedList,

    #[error("pointer {pointer} is outside memory of {capacity} cells (in '{op}')")]
    OutOfBounds {
        op: &'static str,
        pointer: i64,
        capacity: usize,
    },

    #[error("call depth limit exceeded ({0}) - possible infinite recursion")]
    CallDepthExceeded(usize),

    #[error("execution step limit exceeded ({0})")]
    StepLimitExceeded(usize),

    #[error("stack size limit exceeded ({0})")]
    StackLimitExceeded(usize),

    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}

impl From<RegistryError> for ErrorKind {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownBlock(id) => ErrorKind::UnknownBlock(id),
            RegistryError::Sealed(id) => ErrorKind::SealedBlock(id),
            RegistryError::IdsExhausted(id) => ErrorKind::BlockIdsExhausted(id),
        }
    }
}

/// A fatal runtime failure, with the blocks it unwound through.
#[derive(Debug)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub call_stack: Vec<String>,
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "runtime error: {}", self.kind)?;

        if !self.call_stack.is_empty() {
            write!(f, "\n  call stack:")?;

            for (i, frame) in self.call_stack.iter().rev().enumerate() {
                write!(f, "\n    {}: {}", i, frame)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl RuntimeError {
    pub fn new(kind: ErrorKind) -> Self {
        RuntimeError {
            kind,
            call_stack: Vec::new(),
        }
    }

    /// Record a frame the error unwound through; innermost first.
    pub fn with_context(mut self, context: &str) -> Self {
        self.call_stack.push(context.to_string());
        self
    }
}

impl From<ErrorKind> for RuntimeError {
    fn from(kind: ErrorKind) -> Self {
        RuntimeError::new(kind)
    }
}

impl From<RegistryError> for RuntimeError {
    fn from(err: RegistryError) -> Self {
        RuntimeError::new(err.into())
    }
}

impl From<std::io::Error> for RuntimeError {
    fn from(err: std::io::Error) -> Self {
        RuntimeError::new(err.into())
    }
}
