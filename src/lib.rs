//! The writer core of a parquet column chunk: level encoding, value encoding
//! with dictionary fallback, page assembly and emission, and per-page and
//! per-chunk statistics.
//!
//! The entry point is [`write::ColumnWriter`], which consumes Dremel-shredded
//! batches of values and levels and drives pages into a [`write::PageWriter`].

pub mod compression;
pub mod encoding;
pub mod error;
pub mod metadata;
pub mod page;
mod parquet_bridge;
pub mod schema;
pub mod types;
pub mod write;

pub use parquet_bridge::{Compression, CompressionOptions, Encoding, Repetition};
