//! Configuration options for the MathVM engine.

/// Resource limits for program execution.
///
/// # Example
///
/// ```
/// use mathvm_core::api::ExecutionOptions;
///
/// let options = ExecutionOptions {
///     max_call_depth: 512,
///     ..ExecutionOptions::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Maximum number of simultaneously active call frames, the entry frame
    /// included. Exceeding it is a `ResourceExceeded` error.
    ///
    /// Default: 4096
    pub max_call_depth: usize,

    /// Maximum number of values on the operand stack.
    ///
    /// Default: 65536
    pub max_stack_size: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            max_call_depth: 4096,
            max_stack_size: 65536,
        }
    }
}

/// Configuration options for the MathVM engine.
///
/// # Example
///
/// ```
/// use mathvm_core::api::{EngineOptions, ExecutionOptions};
///
/// let options = EngineOptions {
///     execution: ExecutionOptions {
///         max_call_depth: 100,
///         max_stack_size: 1024,
///     },
/// };
/// ```
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Limits applied by `Engine::execute` and `Engine::run`.
    pub execution: ExecutionOptions,
}
