use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use super::consumers;
use super::state::{EngineState, PathState, ProcessState, TaskState};
use crate::cache::CacheSink;
use crate::deleter::PathDeleter;
use crate::graph::{ProcessConfig, StaticDag};
use crate::task::{Task, TaskId};
use crate::taskgraph::TaskGraph;

#[cfg(test)]
mod tests;

/// Contract violations surfaced by the engine. They indicate an executor
/// bug; the workflow should fail fast on them.
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("task '{0}' completed but was never reported pending")]
    UnknownTask(String),
    #[error("task '{0}' was reported pending twice")]
    DuplicateTask(String),
    #[error("process '{0}' is not part of the workflow graph")]
    UnknownProcess(String),
}

/// Event-driven state machine that removes task working directories and
/// intermediate output files as soon as no future task can read them.
///
/// The engine is per-workflow-session and purely reactive: the executor
/// reports lifecycle events, the engine updates its state under a single
/// mutex and runs one deletion sweep per event. Every deletion-enabling
/// fact (a process closing, a task completing, a file getting published)
/// arrives as an event with its own sweep, so a single pass per event is
/// sufficient for promptness.
///
/// The path deleter and the cache sink are injected at construction; the
/// engine owns nothing but its in-memory maps.
pub struct CleanupEngine {
    state: Mutex<EngineState>,
    graph: Arc<TaskGraph>,
    deleter: Arc<dyn PathDeleter>,
    cache: Arc<dyn CacheSink>,
}

impl CleanupEngine {
    pub fn new(
        graph: Arc<TaskGraph>,
        deleter: Arc<dyn PathDeleter>,
        cache: Arc<dyn CacheSink>,
    ) -> Self {
        Self {
            state: Mutex::new(EngineState::default()),
            graph,
            deleter,
            cache,
        }
    }

    /// The task-level dataflow graph populated by this engine.
    pub fn graph(&self) -> Arc<TaskGraph> {
        self.graph.clone()
    }

    /// Workflow-shape warnings collected so far.
    pub fn warnings(&self) -> Vec<String> {
        self.state.lock().unwrap().warnings.clone()
    }

    /// The workflow is starting: derive the process-level consumer sets
    /// from the static graph and check each process configuration for
    /// constructs that are incompatible with eager cleanup.
    pub fn on_flow_begin(&self, dag: &StaticDag) {
        let consumer_sets = consumers::process_consumers(dag);
        let mut state = self.state.lock().unwrap();
        for (name, consumers) in consumer_sets {
            debug!("Process '{}' is consumed by {:?}", name, consumers);
            state.processes.insert(
                name,
                ProcessState {
                    consumers,
                    closed: false,
                },
            );
        }
        for config in dag.processes() {
            Self::check_process(&mut state, config);
        }
        info!("Eager cleanup active for {} process(es)", state.processes.len());
    }

    /// Warning hook for a process being registered with the executor.
    pub fn on_process_create(&self, config: &ProcessConfig) {
        let mut state = self.state.lock().unwrap();
        Self::check_process(&mut state, config);
    }

    /// The named process will spawn no more tasks.
    pub fn on_process_close(&self, name: &str) -> Result<(), CleanupError> {
        let mut state = self.state.lock().unwrap();
        match state.processes.get_mut(name) {
            Some(process) => process.closed = true,
            None => return Err(CleanupError::UnknownProcess(name.to_string())),
        }
        debug!("Process '{}' closed", name);
        self.sweep(&mut state);
        Ok(())
    }

    /// A task has been scheduled. Links the task as a consumer of every
    /// known input file and of the file's producing task, and records the
    /// task in the dataflow graph.
    ///
    /// No sweep runs here: a new consumer can only block deletions, never
    /// enable one.
    pub fn on_task_pending(&self, task: Arc<dyn Task>) -> Result<(), CleanupError> {
        let id = task.id();
        let mut state = self.state.lock().unwrap();
        if state.tasks.contains_key(&id) {
            return Err(CleanupError::DuplicateTask(task.name().to_string()));
        }
        self.graph.add_task(&task);

        for (_, path) in task.inputs() {
            let producer = match state.paths.get_mut(&path) {
                Some(path_state) => {
                    path_state.consumers.insert(id);
                    Some(path_state.producer)
                }
                None => None,
            };
            if let Some(producer) = producer {
                if let Some(entry) = state.tasks.get_mut(&producer) {
                    entry.consumers.insert(id);
                }
            }
        }

        state.tasks.insert(id, TaskState::new(task));
        Ok(())
    }

    /// A task has finished. Failed tasks contribute no outputs; they are
    /// only marked completed so that they unblock upstream deletions on
    /// the next sweep-bearing event.
    ///
    /// On success the sweep runs before the output files are registered:
    /// downstream consumers have not been linked yet, so the fresh outputs
    /// are not per-file deletion candidates in this pass. The working
    /// directory however becomes a candidate as soon as its publish queue
    /// is accounted for.
    pub fn on_task_complete(&self, task: Arc<dyn Task>) -> Result<(), CleanupError> {
        let id = task.id();
        let mut state = self.state.lock().unwrap();
        if !state.tasks.contains_key(&id) {
            return Err(CleanupError::UnknownTask(task.name().to_string()));
        }

        if !task.is_success() {
            info!("Task '{}' failed; no outputs to track", task.name());
            if let Some(entry) = state.tasks.get_mut(&id) {
                entry.completed = true;
            }
            return Ok(());
        }

        let outputs = task.outputs();

        // Publish notifications may have arrived before this event;
        // reconcile them against the task's declared publish targets.
        let mut publish: HashSet<PathBuf> = outputs
            .iter()
            .filter(|output| output.publish)
            .map(|output| output.path.clone())
            .collect();
        let early: HashSet<PathBuf> = publish
            .intersection(&state.published_outputs)
            .cloned()
            .collect();
        for path in &early {
            debug!(
                "Output '{}' was published before task '{}' completed",
                path.display(),
                task.name()
            );
            publish.remove(path);
            state.published_outputs.remove(path);
        }

        if let Some(entry) = state.tasks.get_mut(&id) {
            entry.publish_outputs = publish;
            entry.completed = true;
            entry.succeeded = true;
        }

        self.sweep(&mut state);

        // Register output files after the sweep. Paths outside the publish
        // set never wait for a notification.
        for output in &outputs {
            let published = !output.publish || early.contains(&output.path);
            state.paths.insert(
                output.path.clone(),
                PathState {
                    producer: id,
                    consumers: HashSet::new(),
                    published,
                    deleted: false,
                },
            );
        }
        self.graph.add_task_outputs(&task);
        Ok(())
    }

    /// The publish subsystem finished copying `source` to `destination`.
    ///
    /// When the source is a known output, its producing task's publish
    /// queue shrinks and a targeted deletion is attempted: the whole
    /// working directory when possible, otherwise the single file. When
    /// the source is unknown the producing task has not completed yet and
    /// the notification is kept for reconciliation at completion time.
    pub fn on_file_publish(&self, destination: &Path, source: &Path) {
        let mut state = self.state.lock().unwrap();
        debug!(
            "File '{}' published to '{}'",
            source.display(),
            destination.display()
        );
        let producer = match state.paths.get_mut(source) {
            Some(path_state) => {
                path_state.published = true;
                Some(path_state.producer)
            }
            None => None,
        };
        match producer {
            Some(producer) => {
                if let Some(entry) = state.tasks.get_mut(&producer) {
                    entry.publish_outputs.remove(source);
                }
                self.try_delete_task(&mut state, producer);
                self.try_delete_path(&mut state, source);
            }
            None => {
                state.published_outputs.insert(source.to_path_buf());
            }
        }
    }

    fn check_process(state: &mut EngineState, config: &ProcessConfig) {
        if !state.checked.insert(config.name.clone()) {
            return;
        }
        for output in &config.file_outputs {
            if output.include_inputs {
                let message = format!(
                    "Process '{}' re-exports input files through output '{}'; eager cleanup may remove inputs that are still needed",
                    config.name, output.name
                );
                warn!("{}", message);
                state.warnings.push(message);
            }
        }
        if let Some(mode) = config.publish_mode {
            if mode.disables_eager_cleanup() {
                let message = format!(
                    "Process '{}' publishes outputs with mode '{}'; published files would dangle once the work directory is removed",
                    config.name, mode
                );
                warn!("{}", message);
                state.warnings.push(message);
            }
        }
    }

    /// Single pass over all tasks, then over all paths, deleting whatever
    /// the predicates now authorize. State transitions are monotone, so
    /// anything this pass misses is picked up by the sweep of the event
    /// that enables it.
    fn sweep(&self, state: &mut EngineState) {
        let tasks: Vec<TaskId> = state.tasks.keys().copied().collect();
        for id in tasks {
            self.try_delete_task(state, id);
        }
        let paths: Vec<PathBuf> = state.paths.keys().cloned().collect();
        for path in paths {
            self.try_delete_path(state, &path);
        }
    }

    fn try_delete_task(&self, state: &mut EngineState, id: TaskId) {
        if task_deletable(state, id) {
            self.delete_task(state, id);
        }
    }

    fn try_delete_path(&self, state: &mut EngineState, path: &Path) {
        if path_deletable(state, path) {
            self.delete_path(state, path);
        }
    }

    /// Remove a task's working directory and finalize the task in the
    /// cache. The deleted flag and the finalize record are set together or
    /// not at all; on deleter failure the task stays eligible and a later
    /// sweep retries.
    fn delete_task(&self, state: &mut EngineState, id: TaskId) {
        let (work_dir, task_hash, task_name) = match state.tasks.get(&id) {
            Some(entry) => (
                entry.task.work_dir().to_path_buf(),
                entry.task.hash().to_string(),
                entry.task.name().to_string(),
            ),
            None => return,
        };
        info!(
            "Deleting working directory of task '{}': {}",
            task_name,
            work_dir.display()
        );
        if let Err(e) = self.deleter.delete(&work_dir) {
            warn!(
                "Unable to delete working directory '{}': {}",
                work_dir.display(),
                e
            );
            return;
        }
        let consumer_hashes = successful_consumer_hashes(state, id);
        if let Some(entry) = state.tasks.get_mut(&id) {
            entry.deleted = true;
        }
        self.submit_finalize(task_hash, consumer_hashes);
    }

    /// Remove a single output file. When the producing task's working
    /// directory is already gone the file went with it and only the flag
    /// is left to set.
    fn delete_path(&self, state: &mut EngineState, path: &Path) {
        let producer_deleted = state
            .paths
            .get(path)
            .and_then(|path_state| state.tasks.get(&path_state.producer))
            .map_or(false, |entry| entry.deleted);
        if !producer_deleted {
            debug!("Deleting intermediate file '{}'", path.display());
            if let Err(e) = self.deleter.delete(path) {
                warn!(
                    "Unable to delete intermediate file '{}': {}",
                    path.display(),
                    e
                );
                return;
            }
        }
        if let Some(path_state) = state.paths.get_mut(path) {
            path_state.deleted = true;
        }
    }

    /// Fire-and-forget submission of a finalize record to the cache sink.
    fn submit_finalize(&self, task_hash: String, consumer_hashes: Vec<String>) {
        let cache = self.cache.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.finalize(&task_hash, &consumer_hashes).await {
                warn!("Unable to finalize task '{}' in the cache: {}", task_hash, e);
            }
        });
    }
}

/// A task is deletable once it has completed, every publish notification
/// for its outputs has arrived, every process consuming its process is
/// closed and every task that read one of its outputs has completed.
///
/// The publish queue must be empty (rather than each file published) so
/// that later publish notifications can still be correlated to the task.
fn task_deletable(state: &EngineState, id: TaskId) -> bool {
    let entry = match state.tasks.get(&id) {
        Some(entry) => entry,
        None => return false,
    };
    entry.completed
        && !entry.deleted
        && entry.publish_outputs.is_empty()
        && process_consumers_closed(state, entry.task.process())
        && consumers_completed(state, &entry.consumers)
}

/// A path is deletable once it is published and, as for tasks, its
/// producer's process consumers are closed and all of its readers have
/// completed.
fn path_deletable(state: &EngineState, path: &Path) -> bool {
    let path_state = match state.paths.get(path) {
        Some(path_state) => path_state,
        None => return false,
    };
    if !path_state.published || path_state.deleted {
        return false;
    }
    let producer = match state.tasks.get(&path_state.producer) {
        Some(producer) => producer,
        None => return false,
    };
    process_consumers_closed(state, producer.task.process())
        && consumers_completed(state, &path_state.consumers)
}

fn process_consumers_closed(state: &EngineState, process: &str) -> bool {
    match state.processes.get(process) {
        Some(entry) => entry
            .consumers
            .iter()
            .all(|name| state.processes.get(name).map_or(false, |consumer| consumer.closed)),
        None => false,
    }
}

fn consumers_completed(state: &EngineState, consumers: &HashSet<TaskId>) -> bool {
    consumers
        .iter()
        .all(|id| state.tasks.get(id).map_or(false, |entry| entry.completed))
}

/// Hashes of the tasks that successfully consumed this task's outputs,
/// sorted for stable finalize records.
fn successful_consumer_hashes(state: &EngineState, id: TaskId) -> Vec<String> {
    let mut hashes: Vec<String> = match state.tasks.get(&id) {
        Some(entry) => entry
            .consumers
            .iter()
            .filter_map(|consumer| state.tasks.get(consumer))
            .filter(|consumer| consumer.succeeded)
            .map(|consumer| consumer.task.hash().to_string())
            .collect(),
        None => Vec::new(),
    };
    hashes.sort();
    hashes
}
