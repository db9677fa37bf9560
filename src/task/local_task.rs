use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use super::{OutputFile, Task, TaskId};

/// A concrete in-process [`Task`] for demos and tests.
///
/// The content hash is a SHA-256 over the process name, the task name and
/// the sorted input bindings, recomputed as inputs are declared.
pub struct LocalTask {
    id: TaskId,
    name: String,
    hash: String,
    process: String,
    work_dir: PathBuf,
    inputs: HashMap<String, PathBuf>,
    outputs: Vec<OutputFile>,
    success: AtomicBool,
}

impl LocalTask {
    pub fn new(
        id: TaskId,
        name: impl Into<String>,
        process: impl Into<String>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        let mut task = Self {
            id,
            name: name.into(),
            hash: String::new(),
            process: process.into(),
            work_dir: work_dir.into(),
            inputs: HashMap::new(),
            outputs: Vec::new(),
            success: AtomicBool::new(true),
        };
        task.rehash();
        task
    }

    pub fn with_input(mut self, param: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.inputs.insert(param.into(), path.into());
        self.rehash();
        self
    }

    /// Declare an intermediate output that is not published.
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.outputs.push(OutputFile {
            path: path.into(),
            publish: false,
        });
        self
    }

    /// Declare an output the publish subsystem will emit a notification for.
    pub fn with_published_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.outputs.push(OutputFile {
            path: path.into(),
            publish: true,
        });
        self
    }

    /// Mark the task as failed before reporting it complete.
    pub fn fail(&self) {
        self.success.store(false, Ordering::SeqCst);
    }

    fn rehash(&mut self) {
        let mut hasher = Sha256::new();
        hasher.update(self.process.as_bytes());
        hasher.update(self.name.as_bytes());
        let mut bindings: Vec<(&String, &PathBuf)> = self.inputs.iter().collect();
        bindings.sort();
        for (param, path) in bindings {
            hasher.update(param.as_bytes());
            hasher.update(path.to_string_lossy().as_bytes());
        }
        self.hash = format!("{:x}", hasher.finalize());
    }
}

impl Task for LocalTask {
    fn id(&self) -> TaskId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn hash(&self) -> &str {
        &self.hash
    }

    fn process(&self) -> &str {
        &self.process
    }

    fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn inputs(&self) -> HashMap<String, PathBuf> {
        self.inputs.clone()
    }

    fn outputs(&self) -> Vec<OutputFile> {
        self.outputs.clone()
    }

    fn is_success(&self) -> bool {
        self.success.load(Ordering::SeqCst)
    }
}
