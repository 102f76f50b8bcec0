use parquet_format_safe::{ColumnMetaData, Encoding as ParquetEncoding};
use parquet_format_safe::Statistics as ParquetStatistics;

use super::column_descriptor::ColumnDescriptor;
use crate::parquet_bridge::{Compression, Encoding};

/// Accumulates the metadata of a single column chunk while it is written.
///
/// The column writer feeds this builder as pages are emitted; once the chunk
/// is closed the builder can be converted into the thrift [`ColumnMetaData`]
/// that a row-group orchestrator embeds in the file footer.
#[derive(Debug, Clone)]
pub struct ColumnChunkMetaDataBuilder {
    column_descr: ColumnDescriptor,
    compression: Compression,
    encodings: Vec<Encoding>,
    num_values: i64,
    total_uncompressed_size: i64,
    total_compressed_size: i64,
    statistics: Option<ParquetStatistics>,
}

impl ColumnChunkMetaDataBuilder {
    /// Returns a new builder for the chunk of `column_descr`.
    pub fn new(column_descr: ColumnDescriptor, compression: Compression) -> Self {
        Self {
            column_descr,
            compression,
            encodings: vec![],
            num_values: 0,
            total_uncompressed_size: 0,
            total_compressed_size: 0,
            statistics: None,
        }
    }

    /// The [`ColumnDescriptor`] of the chunk under construction.
    pub fn descriptor(&self) -> &ColumnDescriptor {
        &self.column_descr
    }

    /// Records an encoding used by one of the chunk's pages.
    pub fn add_encoding(&mut self, encoding: Encoding) {
        if !self.encodings.contains(&encoding) {
            self.encodings.push(encoding);
        }
    }

    /// Records a written page's sizes.
    ///
    /// `compressed_size` must include the page header bytes, as required by
    /// the `total_compressed_size` footer field.
    pub fn add_page(&mut self, num_values: i64, uncompressed_size: i64, compressed_size: i64) {
        self.num_values += num_values;
        self.total_uncompressed_size += uncompressed_size;
        self.total_compressed_size += compressed_size;
    }

    /// Sets the encoded chunk statistics. Called at most once, when the chunk
    /// is closed with statistics enabled.
    pub fn set_statistics(&mut self, statistics: ParquetStatistics) {
        self.statistics = Some(statistics);
    }

    /// The encoded chunk statistics, if set.
    pub fn statistics(&self) -> Option<&ParquetStatistics> {
        self.statistics.as_ref()
    }

    /// Total number of value slots in this chunk (not the number of rows).
    pub fn num_values(&self) -> i64 {
        self.num_values
    }

    /// Converts this builder into the thrift metadata struct.
    ///
    /// The page offsets are only known to the owner of the byte stream and are
    /// passed in by the caller.
    pub fn into_thrift(
        self,
        data_page_offset: i64,
        dictionary_page_offset: Option<i64>,
    ) -> ColumnMetaData {
        let (type_, _) = self.column_descr.physical_type().into();
        ColumnMetaData {
            type_,
            encodings: self
                .encodings
                .into_iter()
                .map(|encoding| encoding.into())
                .collect::<Vec<ParquetEncoding>>(),
            path_in_schema: self.column_descr.path_in_schema,
            codec: self.compression.into(),
            num_values: self.num_values,
            total_uncompressed_size: self.total_uncompressed_size,
            total_compressed_size: self.total_compressed_size,
            key_value_metadata: None,
            data_page_offset,
            index_page_offset: None,
            dictionary_page_offset,
            statistics: self.statistics,
            encoding_stats: None,
            bloom_filter_offset: None,
        }
    }
}
