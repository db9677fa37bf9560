use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::implementations::MemoryCacheSink;
use crate::deleter::implementations::RecordingDeleter;
use crate::engine::{CleanupEngine, CleanupError};
use crate::graph::{ProcessConfig, PublishMode, StaticDag};
use crate::task::local_task::LocalTask;
use crate::task::{Task, TaskId};
use crate::taskgraph::TaskGraph;

struct Harness {
    engine: CleanupEngine,
    deleter: Arc<RecordingDeleter>,
    cache: Arc<MemoryCacheSink>,
}

fn harness() -> Harness {
    let deleter = Arc::new(RecordingDeleter::new());
    let cache = Arc::new(MemoryCacheSink::new());
    let engine = CleanupEngine::new(Arc::new(TaskGraph::new()), deleter.clone(), cache.clone());
    Harness {
        engine,
        deleter,
        cache,
    }
}

fn single_process_dag(name: &str) -> StaticDag {
    let mut dag = StaticDag::new();
    dag.add_process(ProcessConfig::new(name));
    dag
}

#[test]
fn test_unknown_task_on_complete_is_an_error() {
    let h = harness();
    h.engine.on_flow_begin(&single_process_dag("solo"));

    let task: Arc<dyn Task> = Arc::new(LocalTask::new(TaskId(1), "solo (1)", "solo", "/work/aa"));
    let result = h.engine.on_task_complete(task);
    assert!(matches!(result, Err(CleanupError::UnknownTask(_))));
}

#[test]
fn test_duplicate_pending_is_an_error() {
    let h = harness();
    h.engine.on_flow_begin(&single_process_dag("solo"));

    let task: Arc<dyn Task> = Arc::new(LocalTask::new(TaskId(1), "solo (1)", "solo", "/work/aa"));
    h.engine.on_task_pending(task.clone()).unwrap();
    let result = h.engine.on_task_pending(task);
    assert!(matches!(result, Err(CleanupError::DuplicateTask(_))));
}

#[test]
fn test_unknown_process_on_close_is_an_error() {
    let h = harness();
    h.engine.on_flow_begin(&single_process_dag("solo"));

    let result = h.engine.on_process_close("other");
    assert!(matches!(result, Err(CleanupError::UnknownProcess(_))));
}

#[test]
fn test_early_publication_is_reconciled_at_completion() {
    let h = harness();
    h.engine.on_flow_begin(&single_process_dag("solo"));

    let task: Arc<dyn Task> = Arc::new(
        LocalTask::new(TaskId(1), "solo (1)", "solo", "/work/aa")
            .with_published_output("/work/aa/report.html"),
    );
    h.engine.on_task_pending(task.clone()).unwrap();

    // The publish notification beats the completion event.
    h.engine
        .on_file_publish(Path::new("/results/report.html"), Path::new("/work/aa/report.html"));
    {
        let state = h.engine.state.lock().unwrap();
        assert!(state
            .published_outputs
            .contains(Path::new("/work/aa/report.html")));
    }

    h.engine.on_task_complete(task).unwrap();

    let state = h.engine.state.lock().unwrap();
    assert!(state.published_outputs.is_empty());
    let entry = &state.tasks[&TaskId(1)];
    assert!(entry.completed);
    assert!(entry.publish_outputs.is_empty());
    let path_state = &state.paths[Path::new("/work/aa/report.html")];
    assert!(path_state.published);
    assert!(!path_state.deleted);
}

#[test]
fn test_intermediate_outputs_are_premarked_published() {
    let h = harness();
    h.engine.on_flow_begin(&single_process_dag("solo"));

    let task: Arc<dyn Task> = Arc::new(
        LocalTask::new(TaskId(1), "solo (1)", "solo", "/work/aa")
            .with_output("/work/aa/data.bin")
            .with_published_output("/work/aa/report.html"),
    );
    h.engine.on_task_pending(task.clone()).unwrap();
    h.engine.on_task_complete(task).unwrap();

    let state = h.engine.state.lock().unwrap();
    assert!(state.paths[Path::new("/work/aa/data.bin")].published);
    assert!(!state.paths[Path::new("/work/aa/report.html")].published);
    assert_eq!(
        state.tasks[&TaskId(1)].publish_outputs,
        [PathBuf::from("/work/aa/report.html")].into_iter().collect()
    );
}

#[test]
fn test_compatibility_warnings_are_emitted_once_per_process() {
    let h = harness();
    let config = ProcessConfig::new("render")
        .with_publish_mode(PublishMode::Symlink)
        .with_file_output("pages", true);
    let mut dag = StaticDag::new();
    dag.add_process(config.clone());

    h.engine.on_flow_begin(&dag);
    // The executor-side creation hook repeats the check; it must not
    // duplicate the warnings.
    h.engine.on_process_create(&config);

    let warnings = h.engine.warnings();
    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].contains("re-exports input files"));
    assert!(warnings[1].contains("symlink"));
}

#[tokio::test]
async fn test_terminal_task_is_deleted_when_its_own_process_closes() {
    let h = harness();
    h.engine.on_flow_begin(&single_process_dag("solo"));

    let task: Arc<dyn Task> = Arc::new(
        LocalTask::new(TaskId(1), "solo (1)", "solo", "/work/aa").with_output("/work/aa/out.txt"),
    );
    h.engine.on_task_pending(task.clone()).unwrap();
    h.engine.on_task_complete(task.clone()).unwrap();
    assert!(h.deleter.calls().is_empty());

    h.engine.on_process_close("solo").unwrap();
    assert!(h.deleter.was_deleted("/work/aa"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.cache.get(task.hash()), Some(Vec::new()));
}

#[tokio::test]
async fn test_pending_publication_blocks_task_deletion() {
    let h = harness();
    h.engine.on_flow_begin(&single_process_dag("solo"));

    let task: Arc<dyn Task> = Arc::new(
        LocalTask::new(TaskId(1), "solo (1)", "solo", "/work/aa")
            .with_published_output("/work/aa/report.html"),
    );
    h.engine.on_task_pending(task.clone()).unwrap();
    h.engine.on_task_complete(task).unwrap();
    h.engine.on_process_close("solo").unwrap();
    // The publish queue is not empty: nothing may be removed.
    assert!(h.deleter.calls().is_empty());

    h.engine
        .on_file_publish(Path::new("/results/report.html"), Path::new("/work/aa/report.html"));
    assert!(h.deleter.was_deleted("/work/aa"));

    // The file went with the working directory; it is flagged, not
    // deleted a second time.
    let state = h.engine.state.lock().unwrap();
    assert!(state.paths[Path::new("/work/aa/report.html")].deleted);
    assert_eq!(h.deleter.calls(), vec![PathBuf::from("/work/aa")]);
}

#[tokio::test]
async fn test_deleter_failure_leaves_the_flag_unset() {
    let h = harness();
    let mut dag = StaticDag::new();
    dag.add_process(ProcessConfig::new("solo"));
    dag.add_process(ProcessConfig::new("other"));
    h.engine.on_flow_begin(&dag);

    let task: Arc<dyn Task> = Arc::new(LocalTask::new(TaskId(1), "solo (1)", "solo", "/work/aa"));
    h.engine.on_task_pending(task.clone()).unwrap();
    h.engine.on_task_complete(task.clone()).unwrap();

    h.deleter.fail_once("/work/aa");
    h.engine.on_process_close("solo").unwrap();
    assert_eq!(h.deleter.calls().len(), 1);
    assert!(!h.deleter.was_deleted("/work/aa"));
    {
        let state = h.engine.state.lock().unwrap();
        assert!(!state.tasks[&TaskId(1)].deleted);
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.cache.finalize_calls().is_empty());

    // The next sweep-bearing event retries the deletion.
    h.engine.on_process_close("other").unwrap();
    assert!(h.deleter.was_deleted("/work/aa"));
    {
        let state = h.engine.state.lock().unwrap();
        assert!(state.tasks[&TaskId(1)].deleted);
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.cache.finalize_calls().len(), 1);
}
