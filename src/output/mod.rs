// src/output/mod.rs
//! Output handling with clear separation of planning and execution.
//!
//! This module provides a data-oriented approach to output operations,
//! separating the planning phase (pure functions) from the execution
//! phase (I/O operations).

mod paths;
mod sink;
mod types;
mod writer;

// Re-export the public interface
pub use paths::{
    chunk_filename, combined_filename, conversation_filename, default_output_dir,
    sanitize_filename, INDEX_FILENAME,
};
pub use sink::{Destination, ExportSink, OutputSettings};
pub use types::{DeliveryTarget, OutputMode, OutputPlan, OutputReport};
pub use writer::deliver;
