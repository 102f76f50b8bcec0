//! The value encoders driven by the column writer: plain and dictionary.

use hashbrown::HashMap;

use crate::encoding::hybrid_rle::RleEncoder;
use crate::encoding::{get_bit, get_bit_width};
use crate::error::{ParquetError, ParquetResult};
use crate::types::DataType;

/// Encodes values back to back in their plain layout.
pub struct PlainEncoder<T: DataType> {
    buffer: Vec<u8>,
    /// Bits used in the last byte of `buffer`; non-zero only for booleans.
    trailing_bits: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T: DataType> PlainEncoder<T> {
    pub fn new() -> Self {
        Self {
            buffer: vec![],
            trailing_bits: 0,
            _marker: std::marker::PhantomData,
        }
    }

    /// Appends `values` to the internal buffer.
    pub fn put(&mut self, values: &[T::T]) {
        T::plain_encode(values, &mut self.buffer, &mut self.trailing_bits);
    }

    /// Appends the values of `values` whose validity bit is set.
    pub fn put_spaced(&mut self, values: &[T::T], valid_bits: &[u8], offset: usize) {
        for (i, value) in values.iter().enumerate() {
            if get_bit(valid_bits, offset + i) {
                T::plain_encode(
                    std::slice::from_ref(value),
                    &mut self.buffer,
                    &mut self.trailing_bits,
                );
            }
        }
    }

    /// The number of buffered bytes.
    pub fn estimated_data_encoded_size(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the buffered bytes, resetting the encoder.
    pub fn flush_values(&mut self) -> Vec<u8> {
        self.trailing_bits = 0;
        std::mem::take(&mut self.buffer)
    }
}

impl<T: DataType> Default for PlainEncoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Maintains an insertion-ordered map from observed values to 0-based indices.
///
/// The data-page payload is one byte carrying the index bit width followed by
/// the RLE/bit-packed encoded indices; the dictionary page payload is the
/// distinct values in plain encoding, in insertion order.
pub struct DictEncoder<T: DataType> {
    indices: Vec<u32>,
    uniques: Vec<T::T>,
    map: HashMap<T::Key, u32>,
    /// Plain-encoded size of the dictionary payload, driving fallback.
    dict_encoded_size: usize,
}

impl<T: DataType> DictEncoder<T> {
    pub fn new() -> Self {
        Self {
            indices: vec![],
            uniques: vec![],
            map: HashMap::new(),
            dict_encoded_size: 0,
        }
    }

    /// Appends the indices of `values`, growing the dictionary on demand.
    pub fn put(&mut self, values: &[T::T]) {
        for value in values {
            self.put_one(value);
        }
    }

    /// Appends the indices of the values of `values` whose validity bit is set.
    pub fn put_spaced(&mut self, values: &[T::T], valid_bits: &[u8], offset: usize) {
        for (i, value) in values.iter().enumerate() {
            if get_bit(valid_bits, offset + i) {
                self.put_one(value);
            }
        }
    }

    fn put_one(&mut self, value: &T::T) {
        let index = match self.map.get(&T::key(value)) {
            Some(index) => *index,
            None => {
                let index = self.uniques.len() as u32;
                self.map.insert(T::key(value), index);
                self.dict_encoded_size += T::encoded_size(value);
                self.uniques.push(value.clone());
                index
            },
        };
        self.indices.push(index);
    }

    /// The number of distinct values observed so far.
    pub fn num_entries(&self) -> usize {
        self.uniques.len()
    }

    /// The plain-encoded byte size of the dictionary payload itself.
    pub fn dict_encoded_size(&self) -> usize {
        self.dict_encoded_size
    }

    /// The number of bits required to encode the widest index.
    fn bit_width(&self) -> u32 {
        match self.num_entries() {
            0 => 0,
            num_entries => get_bit_width(num_entries as u64 - 1).max(1),
        }
    }

    /// Serializes the dictionary payload: the distinct values, plain-encoded.
    pub fn write_dict(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.dict_encoded_size);
        let mut trailing_bits = 0;
        T::plain_encode(&self.uniques, &mut buffer, &mut trailing_bits);
        buffer
    }

    /// Worst-case size of the buffered indices once encoded.
    pub fn estimated_data_encoded_size(&self) -> usize {
        let bit_width = self.bit_width();
        1 + RleEncoder::min_buffer_size(bit_width)
            + RleEncoder::max_buffer_size(bit_width, self.indices.len())
    }

    /// Returns the encoded indices payload, resetting the buffered indices.
    /// The dictionary itself is retained.
    pub fn flush_values(&mut self) -> ParquetResult<Vec<u8>> {
        let bit_width = self.bit_width();
        let mut buffer = vec![0u8; self.estimated_data_encoded_size()];
        buffer[0] = bit_width as u8;
        let mut encoder = RleEncoder::new(&mut buffer[1..], bit_width);
        for &index in &self.indices {
            if !encoder.put(index as u64) {
                return Err(ParquetError::oos(
                    "The index encoder does not have enough space",
                ));
            }
        }
        let length = encoder.flush();
        buffer.truncate(1 + length);
        self.indices.clear();
        Ok(buffer)
    }
}

impl<T: DataType> Default for DictEncoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The value encoder driven by the column writer.
///
/// A writer constructed in a dictionary mode starts with
/// [`ValuesEncoder::Dictionary`] and is swapped for
/// [`ValuesEncoder::Plain`] exactly once if the dictionary outgrows its
/// budget.
pub enum ValuesEncoder<T: DataType> {
    Plain(PlainEncoder<T>),
    Dictionary(DictEncoder<T>),
}

impl<T: DataType> ValuesEncoder<T> {
    /// Appends `values`.
    pub fn put(&mut self, values: &[T::T]) {
        match self {
            ValuesEncoder::Plain(encoder) => encoder.put(values),
            ValuesEncoder::Dictionary(encoder) => encoder.put(values),
        }
    }

    /// Appends the valid values of a spaced batch.
    pub fn put_spaced(&mut self, values: &[T::T], valid_bits: &[u8], offset: usize) {
        match self {
            ValuesEncoder::Plain(encoder) => encoder.put_spaced(values, valid_bits, offset),
            ValuesEncoder::Dictionary(encoder) => encoder.put_spaced(values, valid_bits, offset),
        }
    }

    /// An O(1) estimate of the encoded size of the buffered values.
    pub fn estimated_data_encoded_size(&self) -> usize {
        match self {
            ValuesEncoder::Plain(encoder) => encoder.estimated_data_encoded_size(),
            ValuesEncoder::Dictionary(encoder) => encoder.estimated_data_encoded_size(),
        }
    }

    /// Returns the encoded buffered values, resetting the buffer.
    pub fn flush_values(&mut self) -> ParquetResult<Vec<u8>> {
        match self {
            ValuesEncoder::Plain(encoder) => Ok(encoder.flush_values()),
            ValuesEncoder::Dictionary(encoder) => encoder.flush_values(),
        }
    }

    /// The dictionary encoder, if this encoder maintains one.
    pub fn as_dictionary(&self) -> Option<&DictEncoder<T>> {
        match self {
            ValuesEncoder::Plain(_) => None,
            ValuesEncoder::Dictionary(encoder) => Some(encoder),
        }
    }
}
