use std::io::{Read, Seek};

use tracing::debug;

use crate::error::{Error, Result};

/// Size of a tar header block.
pub(crate) const BLOCK_SIZE: usize = 512;

/// Bytes read when sniffing: a header block, or the two zero blocks that make
/// up an archive with no entries.
const SNIFF_SIZE: usize = 2 * BLOCK_SIZE;

const CHECKSUM_FIELD: std::ops::Range<usize> = 148..156;
const MAGIC_FIELD: std::ops::Range<usize> = 257..262;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar(TarCompress),
}

/// Compression codec for tar archives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TarCompress {
    None,
    Gzip,
    Xz,
    Zstd,
}

impl TarCompress {
    /// Wrap `reader` in a decoder for this codec.
    pub fn decoder<'a, R: Read + 'a>(self, reader: R) -> Result<Box<dyn Read + 'a>> {
        match self {
            Self::None => Ok(Box::new(reader)),
            Self::Gzip => Ok(Box::new(flate2::read::GzDecoder::new(reader))),
            #[cfg(feature = "xz")]
            Self::Xz => Ok(Box::new(xz2::read::XzDecoder::new(reader))),
            #[cfg(not(feature = "xz"))]
            Self::Xz => Err(Error::UnsupportedFormat),
            #[cfg(feature = "zstd")]
            Self::Zstd => {
                let decoder = zstd::stream::read::Decoder::new(reader)
                    .map_err(|source| Error::Corrupted { source })?;
                Ok(Box::new(decoder))
            }
            #[cfg(not(feature = "zstd"))]
            Self::Zstd => Err(Error::UnsupportedFormat),
        }
    }
}

/// Classify the leading bytes of a file.
///
/// Compressed formats are only candidates here: the magic number says nothing
/// about whether the payload is a tar stream. [`detect_from_reader`] confirms
/// them by decoding the first block.
pub fn detect_format(data: &[u8]) -> Option<ArchiveFormat> {
    match data {
        [0x1F, 0x8B, ..] => Some(ArchiveFormat::Tar(TarCompress::Gzip)),
        [0x28, 0xB5, 0x2F, 0xFD, ..] => Some(ArchiveFormat::Tar(TarCompress::Zstd)),
        [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, ..] => Some(ArchiveFormat::Tar(TarCompress::Xz)),
        _ => {
            if is_tar_header(data) || is_empty_archive(data) {
                Some(ArchiveFormat::Tar(TarCompress::None))
            } else {
                None
            }
        }
    }
}

/// A block is a tar header if it carries the POSIX `ustar` magic or, for
/// pre-POSIX archives, a matching header checksum.
pub(crate) fn is_tar_header(data: &[u8]) -> bool {
    if data.len() < BLOCK_SIZE {
        return false;
    }
    data[MAGIC_FIELD] == *b"ustar" || checksum_matches(&data[..BLOCK_SIZE])
}

/// An archive without entries is just its end-of-archive marker: two blocks
/// of zeros.
pub(crate) fn is_empty_archive(data: &[u8]) -> bool {
    data.len() >= SNIFF_SIZE && data[..SNIFF_SIZE].iter().all(|&b| b == 0)
}

fn checksum_matches(block: &[u8]) -> bool {
    let Some(stored) = parse_octal(&block[CHECKSUM_FIELD]) else {
        return false;
    };
    let computed: u64 = block
        .iter()
        .enumerate()
        .map(|(i, &b)| {
            if CHECKSUM_FIELD.contains(&i) {
                u64::from(b' ')
            } else {
                u64::from(b)
            }
        })
        .sum();
    stored == computed
}

fn parse_octal(field: &[u8]) -> Option<u64> {
    let text = std::str::from_utf8(field).ok()?;
    let trimmed = text.trim_matches(|c| c == ' ' || c == '\0');
    if trimmed.is_empty() {
        return None;
    }
    u64::from_str_radix(trimmed, 8).ok()
}

/// Sniff the archive format of a seekable reader and rewind it.
///
/// Returns `Ok(None)` for anything that is not a tar stream, including
/// compressed files whose payload is not tar and codecs compiled out of this
/// build. A compressed stream that cannot be decoded is reported as corrupt.
pub fn detect_from_reader<R: Read + Seek>(reader: &mut R) -> Result<Option<ArchiveFormat>> {
    let mut header = Vec::with_capacity(SNIFF_SIZE);
    reader
        .by_ref()
        .take(SNIFF_SIZE as u64)
        .read_to_end(&mut header)?;
    reader.rewind()?;

    let format = match detect_format(&header) {
        None => return Ok(None),
        Some(ArchiveFormat::Tar(TarCompress::None)) => ArchiveFormat::Tar(TarCompress::None),
        Some(ArchiveFormat::Tar(codec)) => {
            let confirmed = payload_is_tar(reader, codec)?;
            reader.rewind()?;
            if !confirmed {
                return Ok(None);
            }
            ArchiveFormat::Tar(codec)
        }
    };

    Ok(Some(format))
}

fn payload_is_tar<R: Read>(reader: &mut R, codec: TarCompress) -> Result<bool> {
    let decoder = match codec.decoder(reader) {
        Ok(decoder) => decoder,
        Err(Error::UnsupportedFormat) => {
            debug!(?codec, "codec not enabled in this build, treating file as non-archive");
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    let mut block = Vec::with_capacity(SNIFF_SIZE);
    decoder
        .take(SNIFF_SIZE as u64)
        .read_to_end(&mut block)
        .map_err(|source| Error::Corrupted { source })?;
    Ok(is_tar_header(&block) || is_empty_archive(&block))
}
