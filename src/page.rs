use parquet_format_safe::Statistics as ParquetStatistics;

use crate::parquet_bridge::{Compression, Encoding};

/// A data page ready to be consumed by a page sink.
///
/// The body is the (possibly compressed) concatenation of the repetition-level
/// section, the definition-level section and the value payload. The body is
/// owned: pages buffered behind a pending dictionary page keep their bytes
/// without any copy.
#[derive(Debug, Clone)]
pub struct CompressedDataPage {
    pub(crate) buffer: Vec<u8>,
    num_values: usize,
    encoding: Encoding,
    definition_level_encoding: Encoding,
    repetition_level_encoding: Encoding,
    uncompressed_page_size: usize,
    compression: Compression,
    statistics: Option<ParquetStatistics>,
}

impl CompressedDataPage {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        buffer: Vec<u8>,
        num_values: usize,
        encoding: Encoding,
        definition_level_encoding: Encoding,
        repetition_level_encoding: Encoding,
        uncompressed_page_size: usize,
        compression: Compression,
        statistics: Option<ParquetStatistics>,
    ) -> Self {
        Self {
            buffer,
            num_values,
            encoding,
            definition_level_encoding,
            repetition_level_encoding,
            uncompressed_page_size,
            compression,
            statistics,
        }
    }

    /// The number of values (not rows) in this page.
    pub fn num_values(&self) -> usize {
        self.num_values
    }

    /// The encoding of the value section.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// The encoding of the definition-level section, always [`Encoding::Rle`]
    /// for pages produced by this crate.
    pub fn definition_level_encoding(&self) -> Encoding {
        self.definition_level_encoding
    }

    /// The encoding of the repetition-level section.
    pub fn repetition_level_encoding(&self) -> Encoding {
        self.repetition_level_encoding
    }

    /// The size of the body before compression.
    pub fn uncompressed_size(&self) -> usize {
        self.uncompressed_page_size
    }

    /// The size of the body as stored.
    pub fn compressed_size(&self) -> usize {
        self.buffer.len()
    }

    /// The compression applied to the body.
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// The encoded statistics of this page, if accumulated.
    pub fn statistics(&self) -> Option<&ParquetStatistics> {
        self.statistics.as_ref()
    }

    /// The page body.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the page, returning its body so the allocation can be reused.
    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }
}

/// A dictionary page: the plain-encoded distinct values of a column chunk.
#[derive(Debug, Clone)]
pub struct DictPage {
    pub buffer: Vec<u8>,
    pub num_values: usize,
}

impl DictPage {
    pub fn new(buffer: Vec<u8>, num_values: usize) -> Self {
        Self { buffer, num_values }
    }
}
