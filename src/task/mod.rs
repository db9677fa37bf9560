use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub mod local_task;

/// Stable identity of one task execution, assigned by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A file-typed output declared by a task.
#[derive(Debug, Clone)]
pub struct OutputFile {
    pub path: PathBuf,
    /// Whether the publish subsystem is expected to emit this path.
    pub publish: bool,
}

/// Executor-side handle to one task execution.
///
/// The cleanup engine never runs tasks; it only inspects their declared
/// dataflow and their outcome through this trait.
pub trait Task: Send + Sync {
    fn id(&self) -> TaskId;

    /// Human-readable task name, e.g. `align (3)`.
    fn name(&self) -> &str;

    /// Hex-encoded content hash identifying this execution for the cache.
    fn hash(&self) -> &str;

    /// Name of the process this task belongs to.
    fn process(&self) -> &str;

    /// The task's dedicated working directory.
    fn work_dir(&self) -> &Path;

    /// Declared input files, keyed by parameter name.
    fn inputs(&self) -> HashMap<String, PathBuf>;

    /// Declared file-typed outputs.
    fn outputs(&self) -> Vec<OutputFile>;

    /// Whether the task finished successfully. Only meaningful once the
    /// executor has reported the task complete.
    fn is_success(&self) -> bool;
}
