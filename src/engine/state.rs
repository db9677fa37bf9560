use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use crate::task::{Task, TaskId};

/// Per-process view derived from the static workflow graph.
pub(crate) struct ProcessState {
    /// Names of the downstream processes that consume this process's
    /// outputs. A process with no downstream consumers contains itself.
    pub consumers: HashSet<String>,
    /// Whether the process will spawn no further tasks.
    pub closed: bool,
}

/// Dynamic state of one scheduled task.
pub(crate) struct TaskState {
    /// Handle to the executor-side task.
    pub task: Arc<dyn Task>,
    /// Tasks that read one of this task's output files.
    pub consumers: HashSet<TaskId>,
    /// Output paths still awaiting a publish notification.
    pub publish_outputs: HashSet<PathBuf>,
    pub completed: bool,
    /// Whether the task completed successfully.
    pub succeeded: bool,
    /// Whether the working directory has been removed.
    pub deleted: bool,
}

impl TaskState {
    pub fn new(task: Arc<dyn Task>) -> Self {
        Self {
            task,
            consumers: HashSet::new(),
            publish_outputs: HashSet::new(),
            completed: false,
            succeeded: false,
            deleted: false,
        }
    }
}

/// Dynamic state of one output file.
pub(crate) struct PathState {
    /// Task that produced the file.
    pub producer: TaskId,
    /// Tasks that read the file.
    pub consumers: HashSet<TaskId>,
    pub published: bool,
    pub deleted: bool,
}

/// Everything guarded by the engine mutex.
#[derive(Default)]
pub(crate) struct EngineState {
    pub processes: HashMap<String, ProcessState>,
    pub tasks: HashMap<TaskId, TaskState>,
    pub paths: HashMap<PathBuf, PathState>,
    /// Publish notifications that arrived before the producing task
    /// reported completion.
    pub published_outputs: HashSet<PathBuf>,
    /// Processes already checked for eager-cleanup compatibility.
    pub checked: HashSet<String>,
    /// Workflow-shape warnings emitted so far.
    pub warnings: Vec<String>,
}
