pub mod types;

pub use crate::parquet_bridge::Repetition;
