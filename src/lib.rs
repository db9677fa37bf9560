//! # Workflow Cleanup
//!
//! An eager intermediate-file cleanup engine for workflow executors:
//! task working directories and intermediate output files are removed as
//! soon as no future task can read them, instead of at workflow end.
//!
//! ## Features
//!
//! - Event-driven cleanup decisions under a single engine mutex
//! - Process-level consumer derivation from the abstract workflow graph
//! - Task-level dataflow tracking for resume logic ([`TaskGraph`])
//! - Publish notifications tolerated before or after task completion
//! - Injected deletion and cache-finalize collaborators
//! - Warnings for process configurations incompatible with eager cleanup
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use workflow_cleanup::cache::implementations::MemoryCacheSink;
//! use workflow_cleanup::deleter::implementations::RecordingDeleter;
//! use workflow_cleanup::graph::{ProcessConfig, StaticDag};
//! use workflow_cleanup::task::local_task::LocalTask;
//! use workflow_cleanup::task::{Task, TaskId};
//! use workflow_cleanup::{CleanupEngine, TaskGraph};
//!
//! #[tokio::main]
//! async fn main() {
//!     // One terminal process: it is its own consumer.
//!     let mut dag = StaticDag::new();
//!     dag.add_process(ProcessConfig::new("compress"));
//!
//!     let deleter = Arc::new(RecordingDeleter::new());
//!     let engine = CleanupEngine::new(
//!         Arc::new(TaskGraph::new()),
//!         deleter.clone(),
//!         Arc::new(MemoryCacheSink::new()),
//!     );
//!     engine.on_flow_begin(&dag);
//!
//!     let task: Arc<dyn Task> = Arc::new(
//!         LocalTask::new(TaskId(1), "compress (1)", "compress", "/work/ab/123456")
//!             .with_output("/work/ab/123456/archive.gz"),
//!     );
//!     engine.on_task_pending(task.clone()).unwrap();
//!     engine.on_task_complete(task).unwrap();
//!     engine.on_process_close("compress").unwrap();
//!
//!     assert!(deleter.was_deleted("/work/ab/123456"));
//! }
//! ```

pub mod cache;
pub mod deleter;
pub mod engine;
pub mod graph;
pub mod task;
pub mod taskgraph;

pub use cache::CacheSink;
pub use deleter::PathDeleter;
pub use engine::{CleanupEngine, CleanupError};
pub use graph::{GraphNode, ProcessConfig, PublishMode, StaticDag};
pub use task::{OutputFile, Task, TaskId};
pub use taskgraph::{TaskGraph, TaskVertex};
