use log::warn;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::task::{Task, TaskId};

#[cfg(test)]
mod tests;

/// One vertex of the task-level dataflow graph.
#[derive(Debug, Clone, Serialize)]
pub struct TaskVertex {
    /// Monotonically assigned insertion index.
    pub index: usize,
    pub task: TaskId,
    /// Display label of the form `[xx/yyyyyy] <task-name>`.
    pub label: String,
    /// Input files as declared when the task was scheduled, by parameter name.
    pub inputs: HashMap<String, PathBuf>,
    /// Output files, known once the task has produced them.
    pub outputs: Vec<PathBuf>,
}

#[derive(Default)]
struct GraphState {
    vertices: HashMap<TaskId, TaskVertex>,
    /// Reverse index from output path to producing task.
    producers: HashMap<PathBuf, TaskId>,
    next_index: usize,
}

/// Append-only record of the dynamic task-level dataflow: which tasks were
/// scheduled, which files they read and which files they produced. Consumed
/// by the cache layer and by resume logic.
///
/// All writes are serialized by an internal mutex; reads return consistent
/// snapshots and are not ordered against concurrent writes.
#[derive(Default)]
pub struct TaskGraph {
    state: Mutex<GraphState>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly scheduled task. Re-adding a task keeps its index but
    /// overwrites the recorded inputs; callers are expected not to.
    pub fn add_task(&self, task: &Arc<dyn Task>) {
        let label = vertex_label(task.as_ref());
        let inputs = task.inputs();
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        if let Some(vertex) = state.vertices.get_mut(&task.id()) {
            vertex.label = label;
            vertex.inputs = inputs;
            return;
        }
        let index = state.next_index;
        state.next_index += 1;
        state.vertices.insert(
            task.id(),
            TaskVertex {
                index,
                task: task.id(),
                label,
                inputs,
                outputs: Vec::new(),
            },
        );
    }

    /// Record the task's output files and update the reverse index. When two
    /// tasks claim the same output path the later registration wins; that is
    /// a workflow bug and is logged as such.
    pub fn add_task_outputs(&self, task: &Arc<dyn Task>) {
        let outputs: Vec<PathBuf> = task.outputs().into_iter().map(|output| output.path).collect();
        let mut state = self.state.lock().unwrap();
        for path in &outputs {
            if let Some(previous) = state.producers.insert(path.clone(), task.id()) {
                if previous != task.id() {
                    warn!(
                        "Output file '{}' is claimed by task {} and task {}; keeping the latter",
                        path.display(),
                        previous,
                        task.id()
                    );
                }
            }
        }
        match state.vertices.get_mut(&task.id()) {
            Some(vertex) => vertex.outputs = outputs,
            None => warn!(
                "Task '{}' reported outputs before being added to the graph",
                task.name()
            ),
        }
    }

    /// The task that produced `path`, if the path is known.
    pub fn producer_task(&self, path: &Path) -> Option<TaskId> {
        self.state.lock().unwrap().producers.get(path).copied()
    }

    /// The vertex of the task that produced `path`, if the path is known.
    pub fn producer_vertex(&self, path: &Path) -> Option<TaskVertex> {
        let state = self.state.lock().unwrap();
        let id = state.producers.get(path)?;
        state.vertices.get(id).cloned()
    }

    /// Snapshot of all vertices, ordered by insertion index.
    pub fn vertices(&self) -> Vec<TaskVertex> {
        let state = self.state.lock().unwrap();
        let mut vertices: Vec<TaskVertex> = state.vertices.values().cloned().collect();
        vertices.sort_by_key(|vertex| vertex.index);
        vertices
    }
}

fn vertex_label(task: &dyn Task) -> String {
    let hash = task.hash();
    if hash.len() >= 8 {
        format!("[{}/{}] {}", &hash[..2], &hash[2..8], task.name())
    } else {
        format!("[{}] {}", hash, task.name())
    }
}
