//! Drives a [`SerializedPageWriter`] over an in-memory stream and reads the
//! emitted pages back with the thrift protocol, page header by page header.

use std::io::Cursor;

use parquet_format_safe::thrift::protocol::TCompactInputProtocol;
use parquet_format_safe::{Encoding as ParquetEncoding, PageHeader, PageType};

use parquet_column_writer::error::ParquetResult;
use parquet_column_writer::metadata::{ColumnDescriptor, Descriptor};
use parquet_column_writer::schema::types::{FieldInfo, PhysicalType, PrimitiveType};
use parquet_column_writer::types::Int32Type;
use parquet_column_writer::write::{ColumnWriter, SerializedPageWriter, WriterProperties};
use parquet_column_writer::{CompressionOptions, Repetition};

use super::split_page_body;

fn descriptor(repetition: Repetition, max_def_level: i16) -> ColumnDescriptor {
    ColumnDescriptor::new(
        Descriptor {
            primitive_type: PrimitiveType {
                field_info: FieldInfo {
                    name: "a".to_string(),
                    repetition,
                    id: None,
                },
                physical_type: PhysicalType::Int32,
            },
            max_def_level,
            max_rep_level: 0,
        },
        vec!["a".to_string()],
    )
}

/// Reads all page headers and bodies out of a serialized chunk.
fn read_pages(stream: &[u8]) -> Vec<(PageHeader, Vec<u8>)> {
    let mut cursor = Cursor::new(stream);
    let mut pages = vec![];
    while (cursor.position() as usize) < stream.len() {
        let mut protocol = TCompactInputProtocol::new(&mut cursor, usize::MAX);
        let header = PageHeader::read_from_in_protocol(&mut protocol).unwrap();
        let start = cursor.position() as usize;
        let end = start + header.compressed_page_size as usize;
        let body = stream[start..end].to_vec();
        cursor.set_position(end as u64);
        pages.push((header, body));
    }
    pages
}

#[test]
fn required_chunk_is_a_single_plain_page() -> ParquetResult<()> {
    let pager = SerializedPageWriter::new(vec![], CompressionOptions::Uncompressed);
    let properties = WriterProperties::builder().dictionary_enabled(false).build();
    let mut writer = ColumnWriter::<Int32Type, _>::try_new(
        descriptor(Repetition::Required, 0),
        pager,
        5,
        properties,
    )?;
    writer.write_batch(5, &[], &[], &[1, 2, 3, 4, 5])?;
    let total_bytes_written = writer.close()?;
    assert!(total_bytes_written > 0);

    let (pager, _) = writer.into_inner();
    assert_eq!(pager.offset(), total_bytes_written);
    assert_eq!(pager.dictionary_page_offset(), None);
    assert_eq!(pager.data_page_offset(), Some(0));

    let stream = pager.into_inner();
    assert_eq!(stream.len() as u64, total_bytes_written);

    let pages = read_pages(&stream);
    assert_eq!(pages.len(), 1);
    let (header, body) = &pages[0];
    assert_eq!(header.type_, PageType::DATA_PAGE);
    let data_header = header.data_page_header.as_ref().unwrap();
    assert_eq!(data_header.num_values, 5);
    assert_eq!(data_header.encoding, ParquetEncoding::PLAIN);
    assert_eq!(data_header.definition_level_encoding, ParquetEncoding::RLE);
    assert_eq!(data_header.repetition_level_encoding, ParquetEncoding::RLE);

    let statistics = data_header.statistics.as_ref().unwrap();
    assert_eq!(statistics.null_count, Some(0));
    assert_eq!(statistics.min_value, Some(1i32.to_le_bytes().to_vec()));
    assert_eq!(statistics.max_value, Some(5i32.to_le_bytes().to_vec()));

    let values: Vec<i32> = body
        .chunks_exact(4)
        .map(|chunk| i32::from_le_bytes(chunk.try_into().unwrap()))
        .collect();
    assert_eq!(values, vec![1, 2, 3, 4, 5]);
    Ok(())
}

#[test]
fn dictionary_page_offset_precedes_data_pages() -> ParquetResult<()> {
    let pager = SerializedPageWriter::new(vec![], CompressionOptions::Uncompressed);
    let mut writer = ColumnWriter::<Int32Type, _>::try_new(
        descriptor(Repetition::Required, 0),
        pager,
        4,
        WriterProperties::default(),
    )?;
    writer.write_batch(4, &[], &[], &[7, 7, 9, 7])?;
    writer.close()?;

    let (pager, _) = writer.into_inner();
    let dictionary_offset = pager.dictionary_page_offset().unwrap();
    let data_offset = pager.data_page_offset().unwrap();
    assert!(dictionary_offset < data_offset);

    let pages = read_pages(&pager.into_inner());
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].0.type_, PageType::DICTIONARY_PAGE);
    let dictionary_header = pages[0].0.dictionary_page_header.as_ref().unwrap();
    assert_eq!(dictionary_header.num_values, 2);
    assert_eq!(dictionary_header.encoding, ParquetEncoding::PLAIN);
    // dictionary body: the two distinct values, plain-encoded
    assert_eq!(pages[0].1, vec![7, 0, 0, 0, 9, 0, 0, 0]);

    assert_eq!(pages[1].0.type_, PageType::DATA_PAGE);
    let data_header = pages[1].0.data_page_header.as_ref().unwrap();
    assert_eq!(data_header.encoding, ParquetEncoding::PLAIN_DICTIONARY);
    Ok(())
}

#[test]
fn optional_chunk_reads_back_levels_and_values() -> ParquetResult<()> {
    let pager = SerializedPageWriter::new(vec![], CompressionOptions::Uncompressed);
    let properties = WriterProperties::builder().dictionary_enabled(false).build();
    let mut writer = ColumnWriter::<Int32Type, _>::try_new(
        descriptor(Repetition::Optional, 1),
        pager,
        4,
        properties,
    )?;
    writer.write_batch(4, &[1, 0, 1, 1], &[], &[10, 30, 40])?;
    writer.close()?;

    let (pager, _) = writer.into_inner();
    let pages = read_pages(&pager.into_inner());
    let (header, body) = &pages[0];
    let num_values = header.data_page_header.as_ref().unwrap().num_values as usize;
    assert_eq!(num_values, 4);
    assert_eq!(
        header.uncompressed_page_size as usize,
        body.len(),
        "uncompressed pages store their body verbatim"
    );

    let (_, def_levels, values) = split_page_body(body, 1, 0, num_values);
    assert_eq!(def_levels, vec![1, 0, 1, 1]);
    let values: Vec<i32> = values
        .chunks_exact(4)
        .map(|chunk| i32::from_le_bytes(chunk.try_into().unwrap()))
        .collect();
    assert_eq!(values, vec![10, 30, 40]);
    Ok(())
}

#[test]
fn close_is_idempotent_over_a_real_stream() -> ParquetResult<()> {
    let pager = SerializedPageWriter::new(vec![], CompressionOptions::Uncompressed);
    let properties = WriterProperties::builder().dictionary_enabled(false).build();
    let mut writer = ColumnWriter::<Int32Type, _>::try_new(
        descriptor(Repetition::Required, 0),
        pager,
        3,
        properties,
    )?;
    writer.write_batch(3, &[], &[], &[1, 2, 3])?;
    let first = writer.close()?;
    let second = writer.close()?;
    assert_eq!(first, second);

    let (pager, _) = writer.into_inner();
    // no duplicate pages were written by the second close
    assert_eq!(read_pages(&pager.into_inner()).len(), 1);
    Ok(())
}
