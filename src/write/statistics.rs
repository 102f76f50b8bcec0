//! Typed accumulation of page and chunk statistics.

use std::cmp::Ordering;

pub use parquet_format_safe::Statistics as ParquetStatistics;

use crate::encoding::get_bit;
use crate::types::DataType;

/// Tracks min/max/null-count of the values written into a page or chunk.
///
/// Values are compared with the physical type's canonical write-side order:
/// signed for integers, unsigned lexicographic for byte arrays. Floating
/// point NaNs never participate in min/max.
#[derive(Debug, Clone)]
pub struct StatisticsAccumulator<T: DataType> {
    min: Option<T::T>,
    max: Option<T::T>,
    null_count: i64,
    distinct_count: Option<i64>,
}

impl<T: DataType> StatisticsAccumulator<T> {
    pub fn new() -> Self {
        Self {
            min: None,
            max: None,
            null_count: 0,
            distinct_count: None,
        }
    }

    /// Folds a batch of present values and a number of nulls.
    pub fn update(&mut self, values: &[T::T], num_nulls: usize) {
        self.null_count += num_nulls as i64;
        for value in values {
            self.update_one(value);
        }
    }

    /// Folds a spaced batch: one slot per defined-or-null position, with the
    /// validity bitmap selecting the present values.
    pub fn update_spaced(
        &mut self,
        values: &[T::T],
        valid_bits: &[u8],
        offset: usize,
        num_nulls: usize,
    ) {
        self.null_count += num_nulls as i64;
        for (i, value) in values.iter().enumerate() {
            if get_bit(valid_bits, offset + i) {
                self.update_one(value);
            }
        }
    }

    fn update_one(&mut self, value: &T::T) {
        if !T::is_ordered(value) {
            return;
        }
        match &self.min {
            Some(min) if T::compare(value, min) != Ordering::Less => {},
            _ => self.min = Some(value.clone()),
        }
        match &self.max {
            Some(max) if T::compare(value, max) != Ordering::Greater => {},
            _ => self.max = Some(value.clone()),
        }
    }

    /// Combines `other` into `self`. Distinct counts cannot be combined and
    /// are dropped.
    pub fn merge(&mut self, other: &Self) {
        self.null_count += other.null_count;
        self.distinct_count = None;
        if let Some(min) = &other.min {
            self.update_one(min);
        }
        if let Some(max) = &other.max {
            self.update_one(max);
        }
    }

    /// Clears the accumulator to the empty state.
    pub fn reset(&mut self) {
        self.min = None;
        self.max = None;
        self.null_count = 0;
        self.distinct_count = None;
    }

    /// Whether anything has been recorded.
    pub fn is_set(&self) -> bool {
        self.min.is_some() || self.max.is_some() || self.null_count > 0
    }

    /// Produces the thrift statistics struct, with min/max as their raw
    /// plain-encoded bytes.
    pub fn encode(&self) -> ParquetStatistics {
        ParquetStatistics {
            max: None,
            min: None,
            null_count: Some(self.null_count),
            distinct_count: self.distinct_count,
            max_value: self.max.as_ref().map(T::value_bytes),
            min_value: self.min.as_ref().map(T::value_bytes),
        }
    }
}

impl<T: DataType> Default for StatisticsAccumulator<T> {
    fn default() -> Self {
        Self::new()
    }
}
