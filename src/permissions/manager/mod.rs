/*!
 * Checkpoint Module
 * Explicitly owned policy snapshot holder
 */

#[allow(clippy::module_inception)]
mod manager;

pub use manager::{CheckpointStats, PolicyCheckpoint, PolicySnapshot};
