use parquet_column_writer::error::{ParquetError, ParquetResult};
use parquet_column_writer::metadata::{ColumnDescriptor, Descriptor};
use parquet_column_writer::page::{CompressedDataPage, DictPage};
use parquet_column_writer::schema::types::{FieldInfo, PhysicalType, PrimitiveType};
use parquet_column_writer::types::{ByteArrayType, DoubleType, Int32Type};
use parquet_column_writer::write::{ColumnWriter, PageWriter, WriterProperties};
use parquet_column_writer::{Compression, Encoding, Repetition};

use super::{decode_indices, split_page_body};

/// A sink recording every page it receives.
#[derive(Default)]
struct RecordingSink {
    data_pages: Vec<CompressedDataPage>,
    dict_pages: Vec<DictPage>,
    /// `true` marks a dictionary page, in arrival order.
    order: Vec<bool>,
}

impl PageWriter for RecordingSink {
    fn compression(&self) -> Compression {
        Compression::Uncompressed
    }

    fn compress(&mut self, input: &[u8], output: &mut Vec<u8>) -> ParquetResult<()> {
        output.extend_from_slice(input);
        Ok(())
    }

    fn write_data_page(&mut self, page: &CompressedDataPage) -> ParquetResult<u64> {
        self.order.push(false);
        self.data_pages.push(page.clone());
        Ok(page.compressed_size() as u64)
    }

    fn write_dictionary_page(&mut self, page: &DictPage) -> ParquetResult<u64> {
        self.order.push(true);
        self.dict_pages.push(page.clone());
        Ok(page.buffer.len() as u64)
    }

    fn close(&mut self, _has_dictionary: bool, _fallback: bool) -> ParquetResult<()> {
        Ok(())
    }
}

fn descriptor(
    repetition: Repetition,
    physical_type: PhysicalType,
    max_def_level: i16,
    max_rep_level: i16,
) -> ColumnDescriptor {
    ColumnDescriptor::new(
        Descriptor {
            primitive_type: PrimitiveType {
                field_info: FieldInfo {
                    name: "a".to_string(),
                    repetition,
                    id: None,
                },
                physical_type,
            },
            max_def_level,
            max_rep_level,
        },
        vec!["a".to_string()],
    )
}

#[test]
fn optional_page_body_decodes_back() -> ParquetResult<()> {
    let descriptor = descriptor(Repetition::Optional, PhysicalType::Int32, 1, 0);
    let properties = WriterProperties::builder().dictionary_enabled(false).build();
    let mut writer = ColumnWriter::<Int32Type, _>::try_new(
        descriptor,
        RecordingSink::default(),
        4,
        properties,
    )?;
    writer.write_batch(4, &[1, 0, 1, 1], &[], &[10, 30, 40])?;
    writer.close()?;

    let (sink, _) = writer.into_inner();
    let page = &sink.data_pages[0];
    let (_, def_levels, values) = split_page_body(page.buffer(), 1, 0, page.num_values());
    assert_eq!(def_levels, vec![1, 0, 1, 1]);
    let values: Vec<i32> = values
        .chunks_exact(4)
        .map(|chunk| i32::from_le_bytes(chunk.try_into().unwrap()))
        .collect();
    assert_eq!(values, vec![10, 30, 40]);
    Ok(())
}

#[test]
fn repeated_page_body_decodes_back() -> ParquetResult<()> {
    let descriptor = descriptor(Repetition::Optional, PhysicalType::Int32, 1, 1);
    let properties = WriterProperties::builder().dictionary_enabled(false).build();
    let mut writer = ColumnWriter::<Int32Type, _>::try_new(
        descriptor,
        RecordingSink::default(),
        2,
        properties,
    )?;
    writer.write_batch(5, &[1, 1, 1, 1, 1], &[0, 1, 1, 0, 1], &[7, 8, 9, 10, 11])?;
    assert_eq!(writer.num_rows(), 2);
    writer.close()?;

    let (sink, _) = writer.into_inner();
    let page = &sink.data_pages[0];
    let (rep_levels, def_levels, values) = split_page_body(page.buffer(), 1, 1, page.num_values());
    assert_eq!(rep_levels, vec![0, 1, 1, 0, 1]);
    assert_eq!(def_levels, vec![1, 1, 1, 1, 1]);
    assert_eq!(values.len(), 5 * 4);
    Ok(())
}

#[test]
fn dictionary_round_trips_logical_values() -> ParquetResult<()> {
    let descriptor = descriptor(Repetition::Required, PhysicalType::ByteArray, 0, 0);
    let mut writer = ColumnWriter::<ByteArrayType, _>::try_new(
        descriptor,
        RecordingSink::default(),
        6,
        WriterProperties::default(),
    )?;
    let logical: Vec<Vec<u8>> = ["tawny", "owl", "tawny", "eagle", "owl", "tawny"]
        .iter()
        .map(|v| v.as_bytes().to_vec())
        .collect();
    writer.write_batch(6, &[], &[], &logical)?;
    writer.close()?;

    let (sink, _) = writer.into_inner();
    assert_eq!(sink.order, vec![true, false]);

    // the dictionary page holds the distinct values, plain-encoded in
    // insertion order
    let dictionary = &sink.dict_pages[0];
    assert_eq!(dictionary.num_values, 3);
    let mut entries = vec![];
    let mut data = dictionary.buffer.as_slice();
    while !data.is_empty() {
        let length = u32::from_le_bytes(data[..4].try_into().unwrap()) as usize;
        entries.push(data[4..4 + length].to_vec());
        data = &data[4 + length..];
    }
    assert_eq!(entries.len(), 3);

    // re-assembling indices against the dictionary restores the input
    let page = &sink.data_pages[0];
    let indices = decode_indices(page.buffer(), page.num_values());
    let decoded: Vec<Vec<u8>> = indices
        .iter()
        .map(|&index| entries[index as usize].clone())
        .collect();
    assert_eq!(decoded, logical);
    Ok(())
}

#[test]
fn fallback_threshold_trips_before_next_page() -> ParquetResult<()> {
    let descriptor = descriptor(Repetition::Required, PhysicalType::ByteArray, 0, 0);
    let properties = WriterProperties::builder()
        .data_page_size(1)
        .dictionary_page_size_limit(64)
        .build();
    let mut writer = ColumnWriter::<ByteArrayType, _>::try_new(
        descriptor,
        RecordingSink::default(),
        9,
        properties,
    )?;

    let batch = |prefix: &str| -> Vec<Vec<u8>> {
        (0..3)
            .map(|i| format!("{prefix}-value-{i}").into_bytes())
            .collect()
    };
    writer.write_batch(3, &[], &[], &batch("first"))?;
    writer.write_batch(3, &[], &[], &batch("second"))?;
    writer.write_batch(3, &[], &[], &batch("third"))?;
    writer.close()?;

    let (sink, _) = writer.into_inner();
    // the dictionary page arrives first and summarizes only the values of the
    // buffered pages; the post-fallback page is plain and written eagerly
    assert_eq!(sink.order, vec![true, false, false, false]);
    assert_eq!(sink.dict_pages[0].num_values, 6);
    assert_eq!(sink.data_pages[0].encoding(), Encoding::PlainDictionary);
    assert_eq!(sink.data_pages[1].encoding(), Encoding::PlainDictionary);
    assert_eq!(sink.data_pages[2].encoding(), Encoding::Plain);
    Ok(())
}

#[test]
fn nan_values_do_not_pollute_chunk_statistics() -> ParquetResult<()> {
    let descriptor = descriptor(Repetition::Required, PhysicalType::Double, 0, 0);
    let properties = WriterProperties::builder().dictionary_enabled(false).build();
    let mut writer = ColumnWriter::<DoubleType, _>::try_new(
        descriptor,
        RecordingSink::default(),
        4,
        properties,
    )?;
    writer.write_batch(4, &[], &[], &[f64::NAN, 2.5, -1.0, f64::NAN])?;
    writer.close()?;

    let (_, metadata) = writer.into_inner();
    let statistics = metadata.statistics().unwrap();
    assert_eq!(statistics.min_value, Some((-1.0f64).to_le_bytes().to_vec()));
    assert_eq!(statistics.max_value, Some(2.5f64.to_le_bytes().to_vec()));
    Ok(())
}

#[test]
fn writing_more_rows_than_expected_is_fatal() -> ParquetResult<()> {
    let descriptor = descriptor(Repetition::Required, PhysicalType::Int32, 0, 0);
    let properties = WriterProperties::builder().dictionary_enabled(false).build();
    let mut writer = ColumnWriter::<Int32Type, _>::try_new(
        descriptor,
        RecordingSink::default(),
        10,
        properties,
    )?;
    let err = writer.write_batch(11, &[], &[], &[0; 11]).unwrap_err();
    assert!(matches!(err, ParquetError::ViolatedInvariant(_)));

    // nothing was emitted: the failure happened before any page cut
    let (sink, _) = writer.into_inner();
    assert!(sink.data_pages.is_empty());
    assert!(sink.dict_pages.is_empty());
    Ok(())
}

#[test]
fn chunk_metadata_totals_cover_all_pages() -> ParquetResult<()> {
    let descriptor = descriptor(Repetition::Required, PhysicalType::Int32, 0, 0);
    let properties = WriterProperties::builder()
        .dictionary_enabled(false)
        .data_page_size(32)
        .build();
    let mut writer = ColumnWriter::<Int32Type, _>::try_new(
        descriptor,
        RecordingSink::default(),
        20,
        properties,
    )?;
    let values: Vec<i32> = (0..20).collect();
    // one batch per page: 8 values of 4 bytes cross the 32-byte threshold
    for chunk in values.chunks(8) {
        writer.write_batch(chunk.len(), &[], &[], chunk)?;
    }
    writer.close()?;

    let (sink, metadata) = writer.into_inner();
    assert!(sink.data_pages.len() > 1);
    assert_eq!(metadata.num_values(), 20);

    let thrift = metadata.into_thrift(0, None);
    let total: i64 = sink
        .data_pages
        .iter()
        .map(|page| page.compressed_size() as i64)
        .sum();
    assert_eq!(thrift.total_compressed_size, total);
    assert_eq!(thrift.codec, parquet_format_safe::CompressionCodec::UNCOMPRESSED);
    Ok(())
}
