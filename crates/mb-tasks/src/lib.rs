//! Task orchestration for the board: a cancellable concurrent task queue,
//! live generation progress, and the contracts of the external generation
//! provider and result cache.

pub mod cache;
pub mod generation;
pub mod progress;
pub mod queue;

pub use cache::{CacheStore, MemoryCache, fingerprint};
pub use generation::{
    EchoGenerator, GenerationError, GenerationOutput, GenerationRequest, Generator, ResultStream,
    Tracked, tracked_generate,
};
pub use progress::{GenerationKind, Progress, ProgressCounters, ProgressGuard};
pub use queue::{
    DEFAULT_TASK_HISTORY, Task, TaskError, TaskId, TaskQueue, TaskRecord, TaskResult, TaskStatus,
};

// Re-export so downstream crates don't need a direct tokio-util dependency.
pub use tokio_util::sync::CancellationToken;
