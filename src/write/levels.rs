//! Encoding of definition and repetition levels into a page's level sections.

use crate::encoding::hybrid_rle::{BitWriter, RleEncoder};
use crate::encoding::{ceil8, get_bit_width, Encoding};
use crate::error::{ParquetError, ParquetResult};

enum LevelEncoderInner<'a> {
    Rle(RleEncoder<'a>),
    BitPacked { writer: BitWriter<'a>, bit_width: u32 },
}

/// Encodes one page's worth of levels in `[0, max_level]` into a
/// caller-supplied buffer, using either the RLE/bit-packed hybrid or the
/// deprecated pure bit-packed layout.
///
/// The encoder never overflows the destination: [`LevelEncoder::encode`]
/// stops early when the buffer fills and reports how many levels it consumed.
pub struct LevelEncoder<'a> {
    inner: LevelEncoderInner<'a>,
    length: usize,
}

impl<'a> LevelEncoder<'a> {
    /// Upper bound on the encoded size of `num_values` levels.
    ///
    /// For RLE this includes one extra worst-case run of headroom on top of
    /// the theoretical maximum: the encoder's fullness check is conservative
    /// and stops short without it.
    pub fn max_buffer_size(
        encoding: Encoding,
        max_level: i16,
        num_values: usize,
    ) -> ParquetResult<usize> {
        let bit_width = get_bit_width(max_level as u64);
        match encoding {
            Encoding::Rle => Ok(RleEncoder::max_buffer_size(bit_width, num_values)
                + RleEncoder::min_buffer_size(bit_width)),
            Encoding::BitPacked => Ok(ceil8(num_values * bit_width as usize)),
            other => Err(ParquetError::InvalidParameter(format!(
                "Levels cannot be encoded with {other:?}"
            ))),
        }
    }

    /// Binds a new encoder to `data`. `data` must be sized with
    /// [`LevelEncoder::max_buffer_size`].
    pub fn new(encoding: Encoding, max_level: i16, data: &'a mut [u8]) -> ParquetResult<Self> {
        let bit_width = get_bit_width(max_level as u64);
        let inner = match encoding {
            Encoding::Rle => LevelEncoderInner::Rle(RleEncoder::new(data, bit_width)),
            Encoding::BitPacked => LevelEncoderInner::BitPacked {
                writer: BitWriter::new(data),
                bit_width,
            },
            other => {
                return Err(ParquetError::InvalidParameter(format!(
                    "Levels cannot be encoded with {other:?}"
                )))
            },
        };
        Ok(Self { inner, length: 0 })
    }

    /// Appends `levels`, stopping early if the destination fills. The bit
    /// stream is flushed before returning; the number of consumed levels is
    /// returned.
    pub fn encode(&mut self, levels: &[i16]) -> usize {
        let mut num_encoded = 0;
        match &mut self.inner {
            LevelEncoderInner::Rle(encoder) => {
                for &level in levels {
                    if !encoder.put(level as u64) {
                        break;
                    }
                    num_encoded += 1;
                }
                self.length = encoder.flush();
            },
            LevelEncoderInner::BitPacked { writer, bit_width } => {
                for &level in levels {
                    if !writer.put_value(level as u64, *bit_width as usize) {
                        break;
                    }
                    num_encoded += 1;
                }
                writer.flush(true);
                self.length = writer.bytes_written();
            },
        }
        num_encoded
    }

    /// The number of bytes written. Valid after [`LevelEncoder::encode`].
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether nothing has been encoded yet.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}
