mod cleanup;
mod consumers;
mod state;

pub use cleanup::{CleanupEngine, CleanupError};
