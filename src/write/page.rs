//! The page sink: frames page headers and writes page bodies to a byte stream.

use std::io::Write;

use parquet_format_safe::thrift::protocol::TCompactOutputProtocol;
use parquet_format_safe::{
    DataPageHeader, DictionaryPageHeader, Encoding as ParquetEncoding, PageHeader, PageType,
};

use crate::compression::{compress, CompressionOptions};
use crate::error::{ParquetError, ParquetResult};
use crate::page::{CompressedDataPage, DictPage};
use crate::parquet_bridge::Compression;

/// The sink a column writer emits its pages into.
///
/// All methods are synchronous and all errors are fatal to the writer.
pub trait PageWriter {
    /// The compression pages written through this sink are stored with.
    fn compression(&self) -> Compression;

    /// Whether [`PageWriter::compress`] performs any compression.
    fn has_compressor(&self) -> bool {
        self.compression() != Compression::Uncompressed
    }

    /// Compresses `input` into `output`. `output` is not cleared.
    fn compress(&mut self, input: &[u8], output: &mut Vec<u8>) -> ParquetResult<()>;

    /// Writes a data page, returning the number of bytes written, header
    /// included.
    fn write_data_page(&mut self, page: &CompressedDataPage) -> ParquetResult<u64>;

    /// Writes a dictionary page, returning the number of bytes written,
    /// header included.
    fn write_dictionary_page(&mut self, page: &DictPage) -> ParquetResult<u64>;

    /// Finalizes the sink. `has_dictionary` and `fallback` describe the final
    /// dictionary state of the chunk.
    fn close(&mut self, has_dictionary: bool, fallback: bool) -> ParquetResult<()>;
}

/// Page headers store sizes and counts as `i32`; anything larger is not
/// representable on disk.
fn header_i32(value: usize, what: &str) -> ParquetResult<i32> {
    value.try_into().map_err(|_| {
        ParquetError::oos(format!(
            "A page header stores {what} as an i32, but this page has {value}"
        ))
    })
}

fn assemble_data_page_header(page: &CompressedDataPage) -> ParquetResult<PageHeader> {
    let uncompressed_page_size = header_i32(page.uncompressed_size(), "the uncompressed size")?;
    let compressed_page_size = header_i32(page.compressed_size(), "the compressed size")?;
    let num_values = header_i32(page.num_values(), "the number of values")?;

    Ok(PageHeader {
        type_: PageType::DATA_PAGE,
        uncompressed_page_size,
        compressed_page_size,
        crc: None,
        data_page_header: Some(DataPageHeader {
            num_values,
            encoding: page.encoding().into(),
            definition_level_encoding: page.definition_level_encoding().into(),
            repetition_level_encoding: page.repetition_level_encoding().into(),
            statistics: page.statistics().cloned(),
        }),
        index_page_header: None,
        dictionary_page_header: None,
        data_page_header_v2: None,
    })
}

fn assemble_dict_page_header(
    page: &DictPage,
    compressed_size: usize,
) -> ParquetResult<PageHeader> {
    let uncompressed_page_size = header_i32(page.buffer.len(), "the uncompressed size")?;
    let compressed_page_size = header_i32(compressed_size, "the compressed size")?;
    let num_values = header_i32(page.num_values, "the number of entries")?;

    Ok(PageHeader {
        type_: PageType::DICTIONARY_PAGE,
        uncompressed_page_size,
        compressed_page_size,
        crc: None,
        data_page_header: None,
        index_page_header: None,
        dictionary_page_header: Some(DictionaryPageHeader {
            num_values,
            encoding: ParquetEncoding::PLAIN,
            is_sorted: None,
        }),
        data_page_header_v2: None,
    })
}

/// writes the page header into `writer`, returning the number of bytes used in the process.
fn write_page_header<W: Write>(mut writer: &mut W, header: &PageHeader) -> ParquetResult<u64> {
    let mut protocol = TCompactOutputProtocol::new(&mut writer);
    Ok(header.write_to_out_protocol(&mut protocol)? as u64)
}

/// A [`PageWriter`] over any [`Write`], framing V1 page headers with the
/// thrift compact protocol.
pub struct SerializedPageWriter<W: Write> {
    writer: W,
    compression: CompressionOptions,
    offset: u64,
    data_page_offset: Option<u64>,
    dictionary_page_offset: Option<u64>,
    /// Scratch for dictionary-page compression.
    scratch: Vec<u8>,
}

impl<W: Write> SerializedPageWriter<W> {
    pub fn new(writer: W, compression: CompressionOptions) -> Self {
        Self {
            writer,
            compression,
            offset: 0,
            data_page_offset: None,
            dictionary_page_offset: None,
            scratch: vec![],
        }
    }

    /// The number of bytes written so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The stream offset of the first data page, if any was written.
    pub fn data_page_offset(&self) -> Option<u64> {
        self.data_page_offset
    }

    /// The stream offset of the dictionary page, if one was written.
    pub fn dictionary_page_offset(&self) -> Option<u64> {
        self.dictionary_page_offset
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> PageWriter for SerializedPageWriter<W> {
    fn compression(&self) -> Compression {
        self.compression.into()
    }

    fn compress(&mut self, input: &[u8], output: &mut Vec<u8>) -> ParquetResult<()> {
        compress(self.compression, input, output)
    }

    fn write_data_page(&mut self, page: &CompressedDataPage) -> ParquetResult<u64> {
        let header = assemble_data_page_header(page)?;

        if self.data_page_offset.is_none() {
            self.data_page_offset = Some(self.offset);
        }

        let mut bytes_written = write_page_header(&mut self.writer, &header)?;
        self.writer.write_all(page.buffer())?;
        bytes_written += page.buffer().len() as u64;

        self.offset += bytes_written;
        Ok(bytes_written)
    }

    fn write_dictionary_page(&mut self, page: &DictPage) -> ParquetResult<u64> {
        let body = if self.has_compressor() {
            self.scratch.clear();
            compress(self.compression, &page.buffer, &mut self.scratch)?;
            &self.scratch
        } else {
            &page.buffer
        };
        let header = assemble_dict_page_header(page, body.len())?;

        self.dictionary_page_offset = Some(self.offset);

        let mut bytes_written = write_page_header(&mut self.writer, &header)?;
        self.writer.write_all(body)?;
        bytes_written += body.len() as u64;

        self.offset += bytes_written;
        Ok(bytes_written)
    }

    fn close(&mut self, _has_dictionary: bool, _fallback: bool) -> ParquetResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}
