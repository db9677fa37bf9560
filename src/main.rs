use std::error::Error;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use workflow_cleanup::cache::{CacheSink, SqliteCacheSink};
use workflow_cleanup::deleter::FsDeleter;
use workflow_cleanup::graph::{ProcessConfig, PublishMode, StaticDag};
use workflow_cleanup::task::local_task::LocalTask;
use workflow_cleanup::task::{Task, TaskId};
use workflow_cleanup::{CleanupEngine, TaskGraph};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    // Initialize logging if needed.
    env_logger::init();
    println!("Starting the eager workflow cleanup demo...");

    // Step 1: The abstract graph. split feeds compress through a collect
    // operator; compress publishes its archive.
    let mut dag = StaticDag::new();
    let split = dag.add_process(ProcessConfig::new("split"));
    let collect = dag.add_operator("collect");
    let compress =
        dag.add_process(ProcessConfig::new("compress").with_publish_mode(PublishMode::Copy));
    dag.connect(split, collect);
    dag.connect(collect, compress);

    // Step 2: Fabricate working directories the way an executor would.
    let work_root = std::env::temp_dir().join("workflow-cleanup-demo");
    let split_dir = work_root.join("1a").join("split");
    let compress_dir = work_root.join("2b").join("compress");
    let publish_dir = work_root.join("results");
    fs::create_dir_all(&split_dir)?;
    fs::create_dir_all(&compress_dir)?;
    fs::create_dir_all(&publish_dir)?;
    let chunk = split_dir.join("chunk.txt");
    let archive = compress_dir.join("archive.gz");
    fs::write(&chunk, "intermediate data")?;

    // Step 3: Assemble the engine with real collaborators.
    let graph = Arc::new(TaskGraph::new());
    let cache = Arc::new(SqliteCacheSink::new("sqlite::memory:").await?);
    cache.init().await?;
    let engine = CleanupEngine::new(graph.clone(), Arc::new(FsDeleter), cache.clone());

    // Step 4: Drive the lifecycle events an executor would emit.
    engine.on_flow_begin(&dag);

    let t_split: Arc<dyn Task> =
        Arc::new(LocalTask::new(TaskId(1), "split (1)", "split", &split_dir).with_output(&chunk));
    let t_compress: Arc<dyn Task> = Arc::new(
        LocalTask::new(TaskId(2), "compress (1)", "compress", &compress_dir)
            .with_input("chunk", &chunk)
            .with_published_output(&archive),
    );

    engine.on_task_pending(t_split.clone())?;
    engine.on_task_complete(t_split.clone())?;
    engine.on_process_close("split")?;

    engine.on_task_pending(t_compress.clone())?;
    fs::write(&archive, "compressed")?;
    engine.on_task_complete(t_compress.clone())?;
    engine.on_process_close("compress")?;

    // The publish subsystem copies the archive and reports back; only now
    // may the compress working directory disappear.
    let destination = publish_dir.join("archive.gz");
    fs::copy(&archive, &destination)?;
    engine.on_file_publish(&destination, &archive);

    tokio::time::sleep(Duration::from_millis(100)).await;

    // Step 5: Show what survived.
    println!("Split work dir removed:    {}", !split_dir.exists());
    println!("Compress work dir removed: {}", !compress_dir.exists());
    println!("Published archive kept:    {}", destination.exists());
    match cache.get(t_split.hash()).await? {
        Some(consumers) => println!("Split finalized with {} consumer(s)", consumers.len()),
        None => println!("Split not finalized yet"),
    }
    println!(
        "Task graph: {}",
        serde_json::to_string_pretty(&graph.vertices())?
    );

    Ok(())
}
