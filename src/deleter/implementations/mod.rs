pub mod recording_deleter;

pub use recording_deleter::RecordingDeleter;
