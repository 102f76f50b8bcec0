mod column_chunk;
mod read_back;

use parquet_column_writer::encoding::hybrid_rle::{Decoder, HybridEncoded};
use parquet_column_writer::encoding::get_bit_width;

/// Decodes a level section (without its length prefix) back into levels.
pub fn decode_levels(data: &[u8], max_level: i16, num_values: usize) -> Vec<i16> {
    let bit_width = get_bit_width(max_level as u64) as usize;
    let mut levels = Vec::new();
    for run in Decoder::new(data, bit_width) {
        match run {
            HybridEncoded::Rle(value_bytes, length) => {
                let mut bytes = [0u8; 8];
                bytes[..value_bytes.len()].copy_from_slice(value_bytes);
                let value = u64::from_le_bytes(bytes) as i16;
                levels.extend(std::iter::repeat(value).take(length));
            },
            HybridEncoded::Bitpacked(packed) => {
                let count = (packed.len() * 8) / bit_width;
                for i in 0..count {
                    if levels.len() == num_values {
                        break;
                    }
                    let mut value = 0u64;
                    for bit in 0..bit_width {
                        let position = i * bit_width + bit;
                        if packed[position / 8] & (1 << (position % 8)) != 0 {
                            value |= 1 << bit;
                        }
                    }
                    levels.push(value as i16);
                }
            },
        }
    }
    levels.truncate(num_values);
    levels
}

/// Splits a data page body into its level sections and value payload.
pub fn split_page_body(
    body: &[u8],
    max_def_level: i16,
    max_rep_level: i16,
    num_values: usize,
) -> (Vec<i16>, Vec<i16>, Vec<u8>) {
    let mut offset = 0;
    let rep_section = if max_rep_level > 0 {
        let length = i32::from_le_bytes(body[offset..offset + 4].try_into().unwrap()) as usize;
        let section = &body[offset + 4..offset + 4 + length];
        offset += 4 + length;
        section
    } else {
        &[]
    };
    let def_section = if max_def_level > 0 {
        let length = i32::from_le_bytes(body[offset..offset + 4].try_into().unwrap()) as usize;
        let section = &body[offset + 4..offset + 4 + length];
        offset += 4 + length;
        section
    } else {
        &[]
    };
    (
        decode_levels(rep_section, max_rep_level, num_values),
        decode_levels(def_section, max_def_level, num_values),
        body[offset..].to_vec(),
    )
}

/// Decodes a dictionary-encoded value payload (bit-width byte plus
/// RLE/bit-packed indices) into indices.
pub fn decode_indices(payload: &[u8], num_values: usize) -> Vec<u32> {
    let bit_width = payload[0] as usize;
    let mut indices = Vec::with_capacity(num_values);
    for run in Decoder::new(&payload[1..], bit_width) {
        match run {
            HybridEncoded::Rle(value_bytes, length) => {
                let mut bytes = [0u8; 8];
                bytes[..value_bytes.len()].copy_from_slice(value_bytes);
                indices.extend(std::iter::repeat(u64::from_le_bytes(bytes) as u32).take(length));
            },
            HybridEncoded::Bitpacked(packed) => {
                let count = (packed.len() * 8) / bit_width;
                for i in 0..count {
                    if indices.len() == num_values {
                        break;
                    }
                    let mut value = 0u32;
                    for bit in 0..bit_width {
                        let position = i * bit_width + bit;
                        if packed[position / 8] & (1 << (position % 8)) != 0 {
                            value |= 1 << bit;
                        }
                    }
                    indices.push(value);
                }
            },
        }
    }
    indices.truncate(num_values);
    indices
}

#[test]
fn levels_round_trip_through_helpers() {
    let levels = vec![0i16, 1, 1, 0, 1, 0, 0, 1, 1, 1, 0];
    let size =
        parquet_column_writer::write::LevelEncoder::max_buffer_size(
            parquet_column_writer::Encoding::Rle,
            1,
            levels.len(),
        )
        .unwrap();
    let mut buffer = vec![0; size];
    let mut encoder = parquet_column_writer::write::LevelEncoder::new(
        parquet_column_writer::Encoding::Rle,
        1,
        &mut buffer,
    )
    .unwrap();
    assert_eq!(encoder.encode(&levels), levels.len());
    let length = encoder.len();
    assert_eq!(decode_levels(&buffer[..length], 1, levels.len()), levels);
}
