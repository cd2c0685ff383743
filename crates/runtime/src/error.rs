//! Error taxonomy for the runtime (§7). Each variant is a plain enum with a
//! hand-written `Display`/`Error` impl, matching the teacher's own
//! `CodeGenError` convention rather than reaching for `thiserror`.

use loom_core::{TypeError, ValueError};
use std::fmt;

/// Static validation failure raised while composing a wire: type mismatch,
/// missing required variable, a Set/Ref scoping conflict, an out-of-range or
/// mistyped parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeError {
    pub shard: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
    /// Non-fatal warnings are reported but do not fail compose.
    pub fatal: bool,
}

impl ComposeError {
    pub fn fatal(shard: impl Into<String>, line: u32, column: u32, message: impl Into<String>) -> Self {
        ComposeError { shard: shard.into(), line, column, message: message.into(), fatal: true }
    }

    pub fn warning(shard: impl Into<String>, line: u32, column: u32, message: impl Into<String>) -> Self {
        ComposeError { shard: shard.into(), line, column, message: message.into(), fatal: false }
    }
}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: shard `{}`: {}", self.line, self.column, self.shard, self.message)
    }
}
impl std::error::Error for ComposeError {}

impl From<TypeError> for ComposeError {
    fn from(e: TypeError) -> Self {
        ComposeError::fatal("<type>", 0, 0, e.to_string())
    }
}

/// A shard's `warmup` failed during the wire's warmup pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmupError {
    pub shard: String,
    pub message: String,
}

impl fmt::Display for WarmupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warmup failed in shard `{}`: {}", self.shard, self.message)
    }
}
impl std::error::Error for WarmupError {}

/// A shard's `activate` failed at runtime. Carries the diagnostic position so
/// the wire's iterate loop can log `(name, line, column)` per §4.G.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationError {
    pub shard: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl fmt::Display for ActivationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: shard `{}` failed: {}", self.line, self.column, self.shard, self.message)
    }
}
impl std::error::Error for ActivationError {}

/// `setParam`/`getParam` indexed past the end of a shard's parameter schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidParameterIndex {
    pub index: usize,
    pub len: usize,
}

impl fmt::Display for InvalidParameterIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parameter index {} out of range (shard has {} parameters)", self.index, self.len)
    }
}
impl std::error::Error for InvalidParameterIndex {}

/// A plugin's ABI version did not match the host's (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbiMismatch {
    pub requested: u32,
    pub supported: u32,
}

impl fmt::Display for AbiMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plugin requested ABI version {} but this host supports {}", self.requested, self.supported)
    }
}
impl std::error::Error for AbiMismatch {}

/// Umbrella error returned at the edges where any of the above can surface
/// (e.g. `compose_wire` in the C ABI, which must report one error type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    Compose(ComposeError),
    Warmup(WarmupError),
    Activation(ActivationError),
    InvalidParameterIndex(InvalidParameterIndex),
    Abi(AbiMismatch),
    Value(ValueError),
    Type(TypeError),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Compose(e) => write!(f, "{e}"),
            RuntimeError::Warmup(e) => write!(f, "{e}"),
            RuntimeError::Activation(e) => write!(f, "{e}"),
            RuntimeError::InvalidParameterIndex(e) => write!(f, "{e}"),
            RuntimeError::Abi(e) => write!(f, "{e}"),
            RuntimeError::Value(e) => write!(f, "{e}"),
            RuntimeError::Type(e) => write!(f, "{e}"),
        }
    }
}
impl std::error::Error for RuntimeError {}

impl From<ComposeError> for RuntimeError {
    fn from(e: ComposeError) -> Self {
        RuntimeError::Compose(e)
    }
}
impl From<WarmupError> for RuntimeError {
    fn from(e: WarmupError) -> Self {
        RuntimeError::Warmup(e)
    }
}
impl From<ActivationError> for RuntimeError {
    fn from(e: ActivationError) -> Self {
        RuntimeError::Activation(e)
    }
}
impl From<InvalidParameterIndex> for RuntimeError {
    fn from(e: InvalidParameterIndex) -> Self {
        RuntimeError::InvalidParameterIndex(e)
    }
}
impl From<AbiMismatch> for RuntimeError {
    fn from(e: AbiMismatch) -> Self {
        RuntimeError::Abi(e)
    }
}
impl From<ValueError> for RuntimeError {
    fn from(e: ValueError) -> Self {
        RuntimeError::Value(e)
    }
}
impl From<TypeError> for RuntimeError {
    fn from(e: TypeError) -> Self {
        RuntimeError::Type(e)
    }
}
