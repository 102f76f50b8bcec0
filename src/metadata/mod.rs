mod column_chunk_metadata;
mod column_descriptor;

pub use column_chunk_metadata::ColumnChunkMetaDataBuilder;
pub use column_descriptor::{ColumnDescriptor, Descriptor};
