use std::path::Path;
use std::sync::Arc;

use crate::task::local_task::LocalTask;
use crate::task::{Task, TaskId};
use crate::taskgraph::TaskGraph;

fn task(id: u64, name: &str, work_dir: &str) -> Arc<dyn Task> {
    Arc::new(LocalTask::new(TaskId(id), name, "proc", work_dir))
}

#[test]
fn test_vertex_label_uses_short_hash() {
    let graph = TaskGraph::new();
    let t = task(1, "align (1)", "/work/aa");
    graph.add_task(&t);

    let vertices = graph.vertices();
    assert_eq!(vertices.len(), 1);
    let hash = t.hash();
    let expected = format!("[{}/{}] align (1)", &hash[..2], &hash[2..8]);
    assert_eq!(vertices[0].label, expected);
    assert_eq!(vertices[0].index, 0);
}

#[test]
fn test_indices_are_monotone() {
    let graph = TaskGraph::new();
    for id in 0..5 {
        graph.add_task(&task(id, &format!("t{}", id), "/work"));
    }

    let indices: Vec<usize> = graph.vertices().iter().map(|v| v.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_re_adding_a_task_keeps_its_index() {
    let graph = TaskGraph::new();
    let first = task(1, "a", "/work/a");
    graph.add_task(&first);
    graph.add_task(&task(2, "b", "/work/b"));

    let readded: Arc<dyn Task> = Arc::new(
        LocalTask::new(TaskId(1), "a", "proc", "/work/a").with_input("reads", "/data/reads.fq"),
    );
    graph.add_task(&readded);

    let vertices = graph.vertices();
    assert_eq!(vertices.len(), 2);
    assert_eq!(vertices[0].index, 0);
    assert_eq!(
        vertices[0].inputs.get("reads").map(|p| p.as_path()),
        Some(Path::new("/data/reads.fq"))
    );
}

#[test]
fn test_producer_reverse_index() {
    let graph = TaskGraph::new();
    let t: Arc<dyn Task> = Arc::new(
        LocalTask::new(TaskId(7), "split (1)", "split", "/work/cc")
            .with_output("/work/cc/chunk1.fa")
            .with_output("/work/cc/chunk2.fa"),
    );
    graph.add_task(&t);
    graph.add_task_outputs(&t);

    assert_eq!(
        graph.producer_task(Path::new("/work/cc/chunk1.fa")),
        Some(TaskId(7))
    );
    let vertex = graph
        .producer_vertex(Path::new("/work/cc/chunk2.fa"))
        .expect("vertex should exist");
    assert_eq!(vertex.task, TaskId(7));
    assert_eq!(vertex.outputs.len(), 2);

    assert_eq!(graph.producer_task(Path::new("/work/cc/unknown")), None);
    assert!(graph.producer_vertex(Path::new("/work/cc/unknown")).is_none());
}

#[test]
fn test_later_output_registration_wins() {
    let graph = TaskGraph::new();
    let first: Arc<dyn Task> =
        Arc::new(LocalTask::new(TaskId(1), "a", "proc", "/work/a").with_output("/work/shared.txt"));
    let second: Arc<dyn Task> =
        Arc::new(LocalTask::new(TaskId(2), "b", "proc", "/work/b").with_output("/work/shared.txt"));
    graph.add_task(&first);
    graph.add_task(&second);
    graph.add_task_outputs(&first);
    graph.add_task_outputs(&second);

    assert_eq!(
        graph.producer_task(Path::new("/work/shared.txt")),
        Some(TaskId(2))
    );
}

#[test]
fn test_vertices_are_snapshots() {
    let graph = TaskGraph::new();
    graph.add_task(&task(1, "a", "/work/a"));

    let mut snapshot = graph.vertices();
    snapshot[0].label = "mutated".to_string();

    assert_ne!(graph.vertices()[0].label, "mutated");
}
