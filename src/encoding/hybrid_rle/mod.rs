//! The RLE/bit-packed hybrid encoding used for levels and dictionary indices.
//!
//! The payload alternates runs of a repeated value and bit-packed groups of
//! eight values, each preceded by a ULEB128 header whose least significant bit
//! distinguishes the two. The bit width is conveyed out-of-band.

mod bit_writer;
mod decoder;

pub use decoder::{Decoder, HybridEncoded};

pub(crate) use bit_writer::BitWriter;

use crate::encoding::ceil8;

/// A repeated run must span at least this many values before it is worth
/// closing the current bit-packed group for it.
const MIN_REPEATED_RUN: usize = 8;

/// Number of 8-value groups a single reserved literal indicator byte can
/// describe; beyond it a new literal run must be started.
const MAX_LITERAL_GROUPS: usize = 1 << 6;

/// Maximum number of values a single literal run may hold.
const MAX_VALUES_PER_LITERAL_RUN: usize = MAX_LITERAL_GROUPS * 8;

/// Maximum byte length of a ULEB128-encoded `u32`.
const MAX_VLQ_BYTE_LEN: usize = 5;

/// An encoder of the RLE/bit-packed hybrid into a caller-supplied buffer.
///
/// The encoder never writes past the destination: once the remaining space
/// cannot absorb a worst-case run, [`RleEncoder::put`] reports `false` and all
/// further puts are rejected. The destination must be at least
/// [`RleEncoder::min_buffer_size`] bytes.
pub struct RleEncoder<'a> {
    bit_width: u32,
    writer: BitWriter<'a>,
    /// Values not yet assigned to a run, at most one 8-value group.
    buffered_values: [u64; 8],
    num_buffered_values: usize,
    current_value: u64,
    /// Length of the ongoing run of `current_value`.
    repeat_count: usize,
    /// Values committed to the open literal run, always a multiple of 8.
    literal_count: usize,
    /// Offset of the reserved indicator byte of the open literal run.
    literal_indicator_offset: Option<usize>,
    /// Worst-case byte size of a single run; used for the conservative
    /// fullness check.
    max_run_byte_size: usize,
    buffer_full: bool,
}

impl<'a> RleEncoder<'a> {
    /// Returns a new encoder writing values of `bit_width` bits into `buffer`.
    pub fn new(buffer: &'a mut [u8], bit_width: u32) -> Self {
        let max_run_byte_size = Self::min_buffer_size(bit_width);
        debug_assert!(
            buffer.len() >= max_run_byte_size,
            "buffer must hold at least one worst-case run"
        );
        Self {
            bit_width,
            writer: BitWriter::new(buffer),
            buffered_values: [0; 8],
            num_buffered_values: 0,
            current_value: 0,
            repeat_count: 0,
            literal_count: 0,
            literal_indicator_offset: None,
            max_run_byte_size,
            buffer_full: false,
        }
    }

    /// Minimum buffer size an encoder of `bit_width` needs: enough for the
    /// largest single run.
    pub fn min_buffer_size(bit_width: u32) -> usize {
        let max_literal_run_size = 1 + ceil8(MAX_VALUES_PER_LITERAL_RUN * bit_width as usize);
        let max_repeated_run_size = MAX_VLQ_BYTE_LEN + ceil8(bit_width as usize);
        max_literal_run_size.max(max_repeated_run_size)
    }

    /// Worst-case encoded size of `num_values` values of `bit_width` bits.
    pub fn max_buffer_size(bit_width: u32, num_values: usize) -> usize {
        // the worst literal case is an alternation of 8-value literal groups,
        // each paying its indicator byte
        let num_groups = ceil8(num_values);
        let literal_max_size = num_groups + num_groups * bit_width as usize;
        // the worst repeated case is a sequence of 8-value repeated runs, each
        // paying a 1-byte header and the byte-aligned value
        let min_repeated_run_size = 1 + ceil8(bit_width as usize);
        let repeated_max_size = num_groups * min_repeated_run_size;
        literal_max_size.max(repeated_max_size)
    }

    /// Buffers `value`. Returns false iff the encoder ran out of space, in
    /// which case the value was not consumed.
    pub fn put(&mut self, value: u64) -> bool {
        debug_assert!(self.bit_width == 64 || value < (1 << self.bit_width));
        if self.buffer_full {
            return false;
        }

        if self.current_value == value {
            self.repeat_count += 1;
            if self.repeat_count > MIN_REPEATED_RUN {
                // continuation of a committed repeated run, nothing to buffer
                return true;
            }
        } else {
            if self.repeat_count >= MIN_REPEATED_RUN {
                debug_assert_eq!(self.literal_count, 0);
                self.flush_repeated_run();
            }
            self.repeat_count = 1;
            self.current_value = value;
        }

        self.buffered_values[self.num_buffered_values] = value;
        self.num_buffered_values += 1;
        if self.num_buffered_values == 8 {
            debug_assert_eq!(self.literal_count % 8, 0);
            self.flush_buffered_values(false);
        }
        true
    }

    /// The number of bytes written so far.
    pub fn len(&self) -> usize {
        self.writer.bytes_written()
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closes all pending runs and byte-aligns the output. Returns the total
    /// number of bytes written.
    pub fn flush(&mut self) -> usize {
        if self.literal_count > 0 || self.repeat_count > 0 || self.num_buffered_values > 0 {
            let all_repeat = self.literal_count == 0
                && (self.repeat_count == self.num_buffered_values
                    || self.num_buffered_values == 0);
            if self.repeat_count > 0 && all_repeat {
                self.flush_repeated_run();
            } else {
                debug_assert_eq!(self.literal_count % 8, 0);
                // pad the open group to 8 values with zeros
                while self.num_buffered_values != 0 && self.num_buffered_values < 8 {
                    self.buffered_values[self.num_buffered_values] = 0;
                    self.num_buffered_values += 1;
                }
                self.literal_count += self.num_buffered_values;
                self.flush_literal_run(true);
                self.repeat_count = 0;
            }
        }
        self.writer.flush(true);
        self.len()
    }

    fn flush_literal_run(&mut self, update_indicator: bool) {
        if self.literal_indicator_offset.is_none() {
            // one byte is reserved for the indicator; runs are closed before
            // they outgrow what a single byte can express
            self.literal_indicator_offset = self.writer.reserve_bytes(1);
            debug_assert!(self.literal_indicator_offset.is_some());
        }

        for i in 0..self.num_buffered_values {
            let ok = self
                .writer
                .put_value(self.buffered_values[i], self.bit_width as usize);
            debug_assert!(ok);
        }
        self.num_buffered_values = 0;

        if update_indicator {
            debug_assert_eq!(self.literal_count % 8, 0);
            let num_groups = self.literal_count / 8;
            let indicator = ((num_groups << 1) | 1) as u8;
            if let Some(offset) = self.literal_indicator_offset.take() {
                self.writer.write_at(offset, indicator);
            }
            self.literal_count = 0;
            self.check_buffer_full();
        }
    }

    fn flush_repeated_run(&mut self) {
        debug_assert!(self.repeat_count > 0);
        // the lsb of 0 indicates a repeated run
        let indicator = (self.repeat_count as u64) << 1;
        let mut ok = self.writer.put_vlq(indicator);
        ok &= self
            .writer
            .put_aligned(self.current_value, ceil8(self.bit_width as usize));
        debug_assert!(ok);
        self.num_buffered_values = 0;
        self.repeat_count = 0;
        self.check_buffer_full();
    }

    /// Commits the buffered 8-value group, deciding between extending the
    /// literal run or converting into a repeated run.
    fn flush_buffered_values(&mut self, done: bool) {
        if self.repeat_count >= MIN_REPEATED_RUN {
            // the buffered values are covered by the repeated run; only the
            // indicator of a previously open literal run is outstanding
            self.num_buffered_values = 0;
            if self.literal_count != 0 {
                debug_assert_eq!(self.literal_count % 8, 0);
                self.flush_literal_run(true);
            }
            debug_assert_eq!(self.literal_count, 0);
            return;
        }

        self.literal_count += self.num_buffered_values;
        let num_groups = self.literal_count / 8;
        if num_groups + 1 >= MAX_LITERAL_GROUPS {
            // the reserved indicator byte cannot describe more groups
            self.flush_literal_run(true);
        } else {
            self.flush_literal_run(done);
        }
        self.repeat_count = 0;
    }

    fn check_buffer_full(&mut self) {
        if self.writer.bytes_written() + self.max_run_byte_size > self.writer.capacity() {
            self.buffer_full = true;
        }
    }
}
