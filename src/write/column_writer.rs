//! The column-chunk writer state machine.

use log::debug;

use crate::encoding::Encoding;
use crate::error::{ParquetError, ParquetResult};
use crate::metadata::{ColumnChunkMetaDataBuilder, ColumnDescriptor};
use crate::page::{CompressedDataPage, DictPage};
use crate::schema::types::PhysicalType;
use crate::types::DataType;
use crate::write::encoders::{DictEncoder, PlainEncoder, ValuesEncoder};
use crate::write::levels::LevelEncoder;
use crate::write::page::PageWriter;
use crate::write::properties::WriterProperties;
use crate::write::statistics::StatisticsAccumulator;

/// Byte length of the little-endian length prefix in front of each level
/// section of a V1 data page.
const LENGTH_PREFIX_SIZE: usize = std::mem::size_of::<i32>();

/// Writes one column chunk: accepts Dremel-shredded batches of values and
/// levels, cuts them into pages and drives them into a [`PageWriter`].
///
/// The writer enforces the chunk's row accounting: the number of rows
/// observed may never exceed `expected_rows` and must equal it by the time
/// [`ColumnWriter::close`] is called.
///
/// A writer is not reentrant. Dropping it without closing discards all
/// buffered pages and does not finalize the chunk.
pub struct ColumnWriter<T: DataType, P: PageWriter> {
    descriptor: ColumnDescriptor,
    metadata: ColumnChunkMetaDataBuilder,
    pager: P,
    properties: WriterProperties,

    expected_rows: usize,
    num_rows: usize,
    /// Level slots accumulated since the last page cut.
    num_buffered_values: usize,
    /// Values handed to the value encoder since the last page cut.
    num_buffered_encoded_values: usize,

    /// The effective value encoding; transitions dictionary -> plain at most
    /// once.
    encoding: Encoding,
    has_dictionary: bool,
    fallback: bool,
    closed: bool,
    total_bytes_written: u64,

    definition_levels_sink: Vec<i16>,
    repetition_levels_sink: Vec<i16>,
    /// Grow-only scratch holding a level section, length prefix included.
    definition_levels_rle: Vec<u8>,
    repetition_levels_rle: Vec<u8>,
    uncompressed_data: Vec<u8>,
    compressed_data: Vec<u8>,

    /// Pages cut while their values reference a not-yet-emitted dictionary,
    /// flushed in FIFO order.
    data_pages: Vec<CompressedDataPage>,

    encoder: ValuesEncoder<T>,
    page_statistics: Option<StatisticsAccumulator<T>>,
    chunk_statistics: Option<StatisticsAccumulator<T>>,
}

impl<T: DataType, P: PageWriter> ColumnWriter<T, P> {
    /// Returns a new writer for the chunk of `descriptor`, promising
    /// `expected_rows` rows.
    ///
    /// The effective encoding is resolved from `properties`: dictionary
    /// encoding is attempted for every physical type except booleans unless
    /// disabled for the column's path.
    pub fn try_new(
        descriptor: ColumnDescriptor,
        pager: P,
        expected_rows: usize,
        properties: WriterProperties,
    ) -> ParquetResult<Self> {
        let physical_type = descriptor.physical_type();
        if !T::matches(&physical_type) {
            return Err(ParquetError::InvalidParameter(format!(
                "Column \"{}\" of type {:?} cannot be written as {}",
                descriptor.path(),
                physical_type,
                std::any::type_name::<T>(),
            )));
        }

        let path = descriptor.path();
        let requested = properties.encoding(&path);
        match requested {
            Encoding::Plain | Encoding::PlainDictionary | Encoding::RleDictionary => {},
            other => {
                return Err(ParquetError::FeatureNotSupported(format!(
                    "Encoding {other:?} is not supported for writing values"
                )))
            },
        }

        let encoding = if physical_type == PhysicalType::Boolean {
            if requested.is_dictionary() {
                return Err(ParquetError::InvalidParameter(
                    "Booleans cannot be dictionary-encoded".to_string(),
                ));
            }
            Encoding::Plain
        } else if properties.dictionary_enabled(&path) && !requested.is_dictionary() {
            Encoding::PlainDictionary
        } else {
            requested
        };

        let has_dictionary = encoding.is_dictionary();
        let encoder = if has_dictionary {
            ValuesEncoder::Dictionary(DictEncoder::new())
        } else {
            ValuesEncoder::Plain(PlainEncoder::new())
        };

        let (page_statistics, chunk_statistics) = if properties.statistics_enabled(&path) {
            (
                Some(StatisticsAccumulator::new()),
                Some(StatisticsAccumulator::new()),
            )
        } else {
            (None, None)
        };

        let metadata = ColumnChunkMetaDataBuilder::new(descriptor.clone(), pager.compression());

        Ok(Self {
            descriptor,
            metadata,
            pager,
            properties,
            expected_rows,
            num_rows: 0,
            num_buffered_values: 0,
            num_buffered_encoded_values: 0,
            encoding,
            has_dictionary,
            fallback: false,
            closed: false,
            total_bytes_written: 0,
            definition_levels_sink: vec![],
            repetition_levels_sink: vec![],
            definition_levels_rle: vec![],
            repetition_levels_rle: vec![],
            uncompressed_data: vec![],
            compressed_data: vec![],
            data_pages: vec![],
            encoder,
            page_statistics,
            chunk_statistics,
        })
    }

    /// The descriptor of the column being written.
    pub fn descriptor(&self) -> &ColumnDescriptor {
        &self.descriptor
    }

    /// The number of rows observed so far.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// The effective value encoding of pages cut from now on.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// The number of value slots buffered since the last page cut.
    pub fn num_buffered_values(&self) -> usize {
        self.num_buffered_values
    }

    /// The number of values handed to the value encoder since the last page
    /// cut; smaller than [`ColumnWriter::num_buffered_values`] when some
    /// slots are undefined.
    pub fn num_buffered_encoded_values(&self) -> usize {
        self.num_buffered_encoded_values
    }

    /// The chunk metadata accumulated so far.
    pub fn metadata(&self) -> &ColumnChunkMetaDataBuilder {
        &self.metadata
    }

    /// Consumes the writer, returning the page sink and the chunk metadata.
    pub fn into_inner(self) -> (P, ColumnChunkMetaDataBuilder) {
        (self.pager, self.metadata)
    }

    /// Writes a batch of `num_values` value slots.
    ///
    /// `values` holds only the present values, i.e. those whose definition
    /// level equals the column's maximum. `def_levels` and `rep_levels` must
    /// hold `num_values` levels each and must be empty iff the column has no
    /// definition (resp. repetition) levels.
    pub fn write_batch(
        &mut self,
        num_values: usize,
        def_levels: &[i16],
        rep_levels: &[i16],
        values: &[T::T],
    ) -> ParquetResult<()> {
        assert!(!self.closed, "write_batch on a closed column writer");
        self.validate_levels(num_values, def_levels, rep_levels)?;

        // Page limits are only checked once a mini-batch has been consumed:
        // chunking bounds how far a large batch can overshoot the page size.
        let write_batch_size = self.properties.write_batch_size();
        let mut value_offset = 0;
        let mut offset = 0;
        while offset < num_values {
            let length = write_batch_size.min(num_values - offset);
            let def_levels = slice_levels(def_levels, offset, length);
            let rep_levels = slice_levels(rep_levels, offset, length);
            let values_written = self.write_mini_batch(
                length,
                def_levels,
                rep_levels,
                values.get(value_offset..).unwrap_or(&[]),
            )?;
            value_offset += values_written;
            offset += length;
        }
        Ok(())
    }

    /// Writes a spaced batch of `num_values` value slots.
    ///
    /// `values` holds one slot per position whose definition level is at
    /// least `max_def_level - 1` (present or null-at-leaf) and `valid_bits`
    /// distinguishes the two, starting at `valid_bits_offset`.
    pub fn write_batch_spaced(
        &mut self,
        num_values: usize,
        def_levels: &[i16],
        rep_levels: &[i16],
        valid_bits: &[u8],
        valid_bits_offset: usize,
        values: &[T::T],
    ) -> ParquetResult<()> {
        assert!(!self.closed, "write_batch_spaced on a closed column writer");
        self.validate_levels(num_values, def_levels, rep_levels)?;

        let write_batch_size = self.properties.write_batch_size();
        let mut values_offset = 0;
        let mut offset = 0;
        while offset < num_values {
            let length = write_batch_size.min(num_values - offset);
            let def_levels = slice_levels(def_levels, offset, length);
            let rep_levels = slice_levels(rep_levels, offset, length);
            let spaced_written = self.write_mini_batch_spaced(
                length,
                def_levels,
                rep_levels,
                valid_bits,
                valid_bits_offset + values_offset,
                values.get(values_offset..).unwrap_or(&[]),
            )?;
            values_offset += spaced_written;
            offset += length;
        }
        Ok(())
    }

    /// Finalizes the chunk: emits the dictionary page if one is pending,
    /// flushes the outstanding page and all buffered pages in cut order,
    /// publishes chunk statistics and closes the page sink.
    ///
    /// Returns the total number of bytes written into the sink. Repeated
    /// calls are no-ops returning the same total.
    ///
    /// Note that the sink is finalized *before* the row accounting is
    /// verified: a chunk with a row-count mismatch is flushed to storage and
    /// the error is raised afterwards.
    pub fn close(&mut self) -> ParquetResult<u64> {
        if !self.closed {
            self.closed = true;
            if self.has_dictionary && !self.fallback {
                self.write_dictionary_page()?;
            }
            self.flush_buffered_data_pages()?;

            let statistics = self
                .chunk_statistics
                .as_ref()
                .filter(|statistics| statistics.is_set())
                .map(|statistics| statistics.encode());
            if let Some(statistics) = statistics {
                self.metadata.set_statistics(statistics);
            }

            self.pager.close(self.has_dictionary, self.fallback)?;
            debug!(
                "closed column chunk \"{}\": {} rows, {} bytes",
                self.descriptor.path(),
                self.num_rows,
                self.total_bytes_written
            );
        }

        if self.num_rows != self.expected_rows {
            return Err(ParquetError::ViolatedInvariant(format!(
                "Wrote {} rows into a column chunk that expected {}",
                self.num_rows, self.expected_rows
            )));
        }

        Ok(self.total_bytes_written)
    }

    fn validate_levels(
        &self,
        num_values: usize,
        def_levels: &[i16],
        rep_levels: &[i16],
    ) -> ParquetResult<()> {
        let expected_def = if self.descriptor.max_def_level() > 0 {
            num_values
        } else {
            0
        };
        if def_levels.len() != expected_def {
            return Err(ParquetError::InvalidParameter(format!(
                "Expected {} definition levels, got {}",
                expected_def,
                def_levels.len()
            )));
        }
        let expected_rep = if self.descriptor.max_rep_level() > 0 {
            num_values
        } else {
            0
        };
        if rep_levels.len() != expected_rep {
            return Err(ParquetError::InvalidParameter(format!(
                "Expected {} repetition levels, got {}",
                expected_rep,
                rep_levels.len()
            )));
        }
        Ok(())
    }

    fn write_mini_batch(
        &mut self,
        num_values: usize,
        def_levels: &[i16],
        rep_levels: &[i16],
        values: &[T::T],
    ) -> ParquetResult<usize> {
        let max_def_level = self.descriptor.max_def_level();

        let values_to_write = if max_def_level > 0 {
            let values_to_write = def_levels
                .iter()
                .filter(|&&level| level == max_def_level)
                .count();
            self.definition_levels_sink.extend_from_slice(def_levels);
            values_to_write
        } else {
            // required and non-repeated: every slot is a value
            num_values
        };

        self.count_rows(num_values, rep_levels)?;

        if values.len() < values_to_write {
            return Err(ParquetError::InvalidParameter(format!(
                "A batch with {} present values was given {}",
                values_to_write,
                values.len()
            )));
        }
        let values = &values[..values_to_write];

        self.encoder.put(values);
        if let Some(statistics) = &mut self.page_statistics {
            statistics.update(values, num_values - values_to_write);
        }

        self.finish_mini_batch(num_values, values_to_write)?;
        Ok(values_to_write)
    }

    fn write_mini_batch_spaced(
        &mut self,
        num_values: usize,
        def_levels: &[i16],
        rep_levels: &[i16],
        valid_bits: &[u8],
        valid_bits_offset: usize,
        values: &[T::T],
    ) -> ParquetResult<usize> {
        let max_def_level = self.descriptor.max_def_level();
        let is_optional = self.descriptor.is_optional();

        let (values_to_write, spaced_values_to_write) = if max_def_level > 0 {
            // nulls at the leaf itself still occupy a spaced slot
            let min_spaced_def_level = if is_optional {
                max_def_level - 1
            } else {
                max_def_level
            };
            let mut values_to_write = 0;
            let mut spaced_values_to_write = 0;
            for &level in def_levels {
                if level == max_def_level {
                    values_to_write += 1;
                }
                if level >= min_spaced_def_level {
                    spaced_values_to_write += 1;
                }
            }
            self.definition_levels_sink.extend_from_slice(def_levels);
            (values_to_write, spaced_values_to_write)
        } else {
            (num_values, num_values)
        };

        self.count_rows(num_values, rep_levels)?;

        if values.len() < spaced_values_to_write {
            return Err(ParquetError::InvalidParameter(format!(
                "A spaced batch with {} slots was given {}",
                spaced_values_to_write,
                values.len()
            )));
        }

        if is_optional {
            self.encoder.put_spaced(
                &values[..spaced_values_to_write],
                valid_bits,
                valid_bits_offset,
            );
        } else {
            self.encoder.put(&values[..values_to_write]);
        }
        if let Some(statistics) = &mut self.page_statistics {
            statistics.update_spaced(
                &values[..spaced_values_to_write],
                valid_bits,
                valid_bits_offset,
                num_values - values_to_write,
            );
        }

        self.finish_mini_batch(num_values, values_to_write)?;
        Ok(spaced_values_to_write)
    }

    /// Accounts for the rows started by a mini-batch and enforces the chunk's
    /// row budget.
    fn count_rows(&mut self, num_values: usize, rep_levels: &[i16]) -> ParquetResult<()> {
        if self.descriptor.max_rep_level() > 0 {
            // a row may span several values; level 0 marks the start of a row
            self.num_rows += rep_levels.iter().filter(|&&level| level == 0).count();
            self.repetition_levels_sink.extend_from_slice(rep_levels);
        } else {
            // each value is exactly one row
            self.num_rows += num_values;
        }
        if self.num_rows > self.expected_rows {
            return Err(ParquetError::ViolatedInvariant(format!(
                "More rows were written in the column chunk ({}) than expected ({})",
                self.num_rows, self.expected_rows
            )));
        }
        Ok(())
    }

    fn finish_mini_batch(
        &mut self,
        num_values: usize,
        values_to_write: usize,
    ) -> ParquetResult<()> {
        self.num_buffered_values += num_values;
        self.num_buffered_encoded_values += values_to_write;

        if self.encoder.estimated_data_encoded_size() >= self.properties.data_page_size() {
            self.add_data_page()?;
        }
        if self.has_dictionary && !self.fallback {
            self.check_dictionary_size_limit()?;
        }
        Ok(())
    }

    /// Cuts a page from the buffered levels and values.
    fn add_data_page(&mut self) -> ParquetResult<()> {
        let values = self.encoder.flush_values()?;

        let definition_levels_byte_length = if self.descriptor.max_def_level() > 0 {
            encode_levels(
                &self.definition_levels_sink,
                self.descriptor.max_def_level(),
                &mut self.definition_levels_rle,
            )?
        } else {
            0
        };
        let repetition_levels_byte_length = if self.descriptor.max_rep_level() > 0 {
            encode_levels(
                &self.repetition_levels_sink,
                self.descriptor.max_rep_level(),
                &mut self.repetition_levels_rle,
            )?
        } else {
            0
        };

        let uncompressed_page_size =
            repetition_levels_byte_length + definition_levels_byte_length + values.len();

        self.uncompressed_data.clear();
        self.uncompressed_data.reserve(uncompressed_page_size);
        self.uncompressed_data
            .extend_from_slice(&self.repetition_levels_rle[..repetition_levels_byte_length]);
        self.uncompressed_data
            .extend_from_slice(&self.definition_levels_rle[..definition_levels_byte_length]);
        self.uncompressed_data.extend_from_slice(&values);

        let statistics = match &mut self.page_statistics {
            Some(page_statistics) => {
                let encoded = page_statistics.encode();
                if let Some(chunk_statistics) = &mut self.chunk_statistics {
                    chunk_statistics.merge(page_statistics);
                }
                page_statistics.reset();
                Some(encoded)
            },
            None => None,
        };

        let body = if self.pager.has_compressor() {
            let mut scratch = std::mem::take(&mut self.compressed_data);
            scratch.clear();
            self.pager.compress(&self.uncompressed_data, &mut scratch)?;
            scratch
        } else {
            std::mem::take(&mut self.uncompressed_data)
        };

        let page = CompressedDataPage::new(
            body,
            self.num_buffered_values,
            self.encoding,
            Encoding::Rle,
            Encoding::Rle,
            uncompressed_page_size,
            self.pager.compression(),
            statistics,
        );

        if self.has_dictionary && !self.fallback {
            // the page is not decodable until the dictionary page is written;
            // hold on to it
            self.data_pages.push(page);
        } else {
            self.write_data_page(page)?;
        }

        self.definition_levels_sink.clear();
        self.repetition_levels_sink.clear();
        self.num_buffered_values = 0;
        self.num_buffered_encoded_values = 0;
        Ok(())
    }

    fn write_data_page(&mut self, page: CompressedDataPage) -> ParquetResult<()> {
        let bytes_written = self.pager.write_data_page(&page)?;
        self.total_bytes_written += bytes_written;

        let header_size = bytes_written.saturating_sub(page.compressed_size() as u64);
        self.metadata.add_encoding(page.encoding());
        self.metadata.add_page(
            page.num_values() as i64,
            (page.uncompressed_size() as u64 + header_size) as i64,
            bytes_written as i64,
        );

        // reclaim the body so the next page can reuse the allocation
        let buffer = page.into_buffer();
        if self.pager.has_compressor() {
            self.compressed_data = buffer;
        } else {
            self.uncompressed_data = buffer;
        }
        Ok(())
    }

    fn write_dictionary_page(&mut self) -> ParquetResult<()> {
        let (buffer, num_entries) = match self.encoder.as_dictionary() {
            Some(encoder) => (encoder.write_dict(), encoder.num_entries()),
            None => {
                return Err(ParquetError::InvalidParameter(
                    "Only dictionary writers can write a dictionary page".to_string(),
                ))
            },
        };
        let page = DictPage::new(buffer, num_entries);
        let bytes_written = self.pager.write_dictionary_page(&page)?;
        self.total_bytes_written += bytes_written;
        self.metadata.add_encoding(Encoding::Plain);
        Ok(())
    }

    /// Writes the outstanding values as a page and drains the buffered pages
    /// in cut order.
    fn flush_buffered_data_pages(&mut self) -> ParquetResult<()> {
        if self.num_buffered_values > 0 {
            self.add_data_page()?;
        }
        for page in std::mem::take(&mut self.data_pages) {
            self.write_data_page(page)?;
        }
        Ok(())
    }

    /// Falls back to plain encoding once the dictionary outgrows its budget.
    /// The dictionary page is written immediately so that every buffered page
    /// is decodable, and the buffered pages are flushed behind it.
    fn check_dictionary_size_limit(&mut self) -> ParquetResult<()> {
        let dict_encoded_size = match self.encoder.as_dictionary() {
            Some(encoder) => encoder.dict_encoded_size(),
            None => return Ok(()),
        };
        if dict_encoded_size < self.properties.dictionary_page_size_limit() {
            return Ok(());
        }

        debug!(
            "dictionary of column \"{}\" reached {} bytes, falling back to plain encoding",
            self.descriptor.path(),
            dict_encoded_size
        );
        self.write_dictionary_page()?;
        self.flush_buffered_data_pages()?;
        self.fallback = true;
        self.encoder = ValuesEncoder::Plain(PlainEncoder::new());
        self.encoding = Encoding::Plain;
        Ok(())
    }
}

fn slice_levels(levels: &[i16], offset: usize, length: usize) -> &[i16] {
    if levels.is_empty() {
        levels
    } else {
        &levels[offset..offset + length]
    }
}

/// RLE-encodes `levels` into `scratch` behind a 4-byte little-endian length
/// prefix, returning the total section length. `scratch` only ever grows, so
/// cutting a smaller page after a larger one does not reallocate.
fn encode_levels(levels: &[i16], max_level: i16, scratch: &mut Vec<u8>) -> ParquetResult<usize> {
    let rle_size = LevelEncoder::max_buffer_size(Encoding::Rle, max_level, levels.len())?
        + LENGTH_PREFIX_SIZE;
    if scratch.len() < rle_size {
        scratch.resize(rle_size, 0);
    }

    let mut encoder = LevelEncoder::new(
        Encoding::Rle,
        max_level,
        &mut scratch[LENGTH_PREFIX_SIZE..rle_size],
    )?;
    let encoded = encoder.encode(levels);
    if encoded != levels.len() {
        return Err(ParquetError::oos(format!(
            "Expected to encode {} levels, encoded {}",
            levels.len(),
            encoded
        )));
    }

    let length = encoder.len();
    scratch[..LENGTH_PREFIX_SIZE].copy_from_slice(&(length as i32).to_le_bytes());
    Ok(LENGTH_PREFIX_SIZE + length)
}
