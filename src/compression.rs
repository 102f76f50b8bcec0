//! Functionality to compress page bodies.

pub use crate::parquet_bridge::{
    Compression, CompressionOptions, GzipLevel, ZstdLevel,
};

use crate::error::{ParquetError, ParquetResult};

#[cfg(any(feature = "snappy", feature = "gzip", feature = "zstd", feature = "lz4"))]
use std::io::Write;

/// Compresses `input_buf` with `compression`, appending the result to `output_buf`.
///
/// Callers are expected to clear `output_buf` when they reuse it as a scratch
/// buffer across pages.
pub fn compress(
    compression: CompressionOptions,
    input_buf: &[u8],
    output_buf: &mut Vec<u8>,
) -> ParquetResult<()> {
    match compression {
        CompressionOptions::Uncompressed => {
            output_buf.extend_from_slice(input_buf);
            Ok(())
        },
        #[cfg(feature = "snappy")]
        CompressionOptions::Snappy => {
            let offset = output_buf.len();
            output_buf.resize(offset + snap::raw::max_compress_len(input_buf.len()), 0);
            let written =
                snap::raw::Encoder::new().compress(input_buf, &mut output_buf[offset..])?;
            output_buf.truncate(offset + written);
            Ok(())
        },
        #[cfg(not(feature = "snappy"))]
        CompressionOptions::Snappy => Err(ParquetError::FeatureNotActive(
            crate::error::Feature::Snappy,
            "compress to snappy".to_string(),
        )),
        #[cfg(feature = "gzip")]
        CompressionOptions::Gzip(level) => {
            let level = level.unwrap_or_default().compression_level();
            let mut encoder = flate2::write::GzEncoder::new(
                output_buf,
                flate2::Compression::new(level as u32),
            );
            encoder.write_all(input_buf)?;
            encoder.try_finish()?;
            Ok(())
        },
        #[cfg(not(feature = "gzip"))]
        CompressionOptions::Gzip(_) => Err(ParquetError::FeatureNotActive(
            crate::error::Feature::Gzip,
            "compress to gzip".to_string(),
        )),
        #[cfg(feature = "zstd")]
        CompressionOptions::Zstd(level) => {
            let level = level.map(|v| v.compression_level()).unwrap_or_default();
            let mut encoder = zstd::Encoder::new(output_buf, level)?;
            encoder.write_all(input_buf)?;
            encoder.finish()?;
            Ok(())
        },
        #[cfg(not(feature = "zstd"))]
        CompressionOptions::Zstd(_) => Err(ParquetError::FeatureNotActive(
            crate::error::Feature::Zstd,
            "compress to zstd".to_string(),
        )),
        #[cfg(feature = "lz4")]
        CompressionOptions::Lz4Raw => {
            let offset = output_buf.len();
            output_buf.resize(
                offset + lz4_flex::block::get_maximum_output_size(input_buf.len()),
                0,
            );
            let written = lz4_flex::block::compress_into(input_buf, &mut output_buf[offset..])
                .map_err(|e| ParquetError::Transport(format!("underlying lz4 error: {e}")))?;
            output_buf.truncate(offset + written);
            Ok(())
        },
        #[cfg(not(feature = "lz4"))]
        CompressionOptions::Lz4Raw => Err(ParquetError::FeatureNotActive(
            crate::error::Feature::Lz4,
            "compress to lz4".to_string(),
        )),
        CompressionOptions::Lzo | CompressionOptions::Brotli | CompressionOptions::Lz4 => {
            Err(ParquetError::FeatureNotSupported(format!(
                "Compression {compression:?} is not supported",
            )))
        },
    }
}
