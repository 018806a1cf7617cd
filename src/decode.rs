use std::{
    fmt::{self, Display},
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, trace};

use crate::{Channels, Color, Colorspace, Header, Image};

pub const QOI_MAGIC: [u8; 4] = *b"qoif";
pub const QOI_HEADER_SIZE: usize = 14;

const QOI_MASK_2: u8 = 0b11000000;
const QOI_OP_INDEX: u8 = 0b00000000;
const QOI_OP_DIFF: u8 = 0b01000000;
const QOI_OP_LUMA: u8 = 0b10000000;
const QOI_OP_RGB: u8 = 0b11111110;
const QOI_OP_RGBA: u8 = 0b11111111;

/// Decodes a complete QOI file held in memory.
///
/// `name` only shows up in error messages, usually it is the path the bytes
/// were read from. Bytes after the last pixel are ignored.
pub fn decode(bytes: &[u8], name: Option<&str>) -> Result<Image, DecodeError> {
    decode_image(bytes).map_err(|kind| DecodeError::new(kind, name))
}

/// Parses and validates only the 14 byte header.
pub fn decode_header(bytes: &[u8]) -> Result<Header, DecodeError> {
    parse_header(bytes)
        .map(|(header, _)| header)
        .map_err(|kind| DecodeError::new(kind, None))
}

/// Reads a file and decodes it, naming the file in any error.
pub fn load(path: impl AsRef<Path>) -> Result<Image, LoadError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_owned(),
        source,
    })?;
    decode(&bytes, Some(&path.to_string_lossy())).map_err(|error| LoadError::Decode { error })
}

fn decode_image(bytes: &[u8]) -> Result<Image, ErrorKind> {
    let (header, mut stream) = parse_header(bytes)?;
    let n_pixels = header.n_pixels().ok_or(ErrorKind::TooManyPixels {
        width: header.width,
        height: header.height,
    })?;
    debug!(
        "decoding {}x{} image ({:?}, {}), {} bytes of opcodes",
        header.width,
        header.height,
        header.channels,
        header.colorspace,
        stream.len()
    );

    // A single byte never yields more than 64 pixels, so a short stream can't
    // make us reserve memory for the whole declared size.
    let capacity = n_pixels.min(stream.len().saturating_mul(64));
    let mut pixels = Vec::with_capacity(capacity);
    let mut decoder = Decoder::new();
    while pixels.len() < n_pixels {
        pixels.push(decoder.decode_pixel(&mut stream)?);
    }
    Ok(Image::new(header, pixels))
}

pub(crate) fn parse_header(bytes: &[u8]) -> Result<(Header, &[u8]), ErrorKind> {
    let (header, rest) = bytes
        .split_first_chunk::<QOI_HEADER_SIZE>()
        .ok_or(ErrorKind::TruncatedHeader)?;

    let [m0, m1, m2, m3, w0, w1, w2, w3, h0, h1, h2, h3, channels, colorspace] = *header;
    if [m0, m1, m2, m3] != QOI_MAGIC {
        return Err(ErrorKind::BadMagic {
            magic: [m0, m1, m2, m3],
        });
    }
    let header = Header {
        width: u32::from_be_bytes([w0, w1, w2, w3]),
        height: u32::from_be_bytes([h0, h1, h2, h3]),
        channels: Channels::from_byte(channels)
            .ok_or(ErrorKind::UnsupportedChannels { channels })?,
        colorspace: Colorspace::from_byte(colorspace)
            .ok_or(ErrorKind::UnsupportedColorspace { colorspace })?,
    };
    Ok((header, rest))
}

/// A failed decode, carrying the name of the file it came from if one was given.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Error)]
pub struct DecodeError {
    kind: ErrorKind,
    name: Option<String>,
}

impl DecodeError {
    pub(crate) fn new(kind: ErrorKind, name: Option<&str>) -> Self {
        Self {
            kind,
            name: name
                .filter(|name| !name.trim().is_empty())
                .map(str::to_owned),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}: {name}", self.kind),
            None => Display::fmt(&self.kind, f),
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum LoadError {
    #[display("failed to read {}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("{error}")]
    Decode { error: DecodeError },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ErrorKind {
    #[display("invalid QOI image, missing header")]
    TruncatedHeader,
    #[display("not a QOI image, incorrect magic bytes {magic:02x?}")]
    BadMagic { magic: [u8; 4] },
    #[display("unsupported channel count {channels}")]
    UnsupportedChannels { channels: u8 },
    #[display("unsupported color space {colorspace}")]
    UnsupportedColorspace { colorspace: u8 },
    /// `width * height` does not fit in `usize`.
    #[display("image dimensions {width}x{height} are too large")]
    TooManyPixels { width: u32, height: u32 },
    #[display("size mismatch, not enough data for the declared image size")]
    UnexpectedEof,
    #[display("incomplete {op}")]
    IncompleteOp { op: OpCode },
}

impl ErrorKind {
    /// `true` when the opcode stream ran out before the last pixel.
    pub fn is_unexpected_eof(&self) -> bool {
        matches!(self, Self::UnexpectedEof | Self::IncompleteOp { .. })
    }
}

/// The opcodes that carry bytes after the tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum OpCode {
    #[display("QOI_OP_LUMA")]
    Luma,
    #[display("QOI_OP_RGB")]
    Rgb,
    #[display("QOI_OP_RGBA")]
    Rgba,
}

fn lsb6(x: u8) -> u8 {
    x & !QOI_MASK_2
}

fn take<const N: usize>(stream: &mut &[u8], op: OpCode) -> Result<[u8; N], ErrorKind> {
    let (bytes, rest) = stream
        .split_first_chunk::<N>()
        .ok_or(ErrorKind::IncompleteOp { op })?;
    *stream = rest;
    Ok(*bytes)
}

#[derive(Debug, Clone)]
pub(crate) struct Decoder {
    pub(crate) index_array: [Color; 64],
    pub(crate) previous_pixel: Color,
    /// Repeats of `previous_pixel` still owed before the next opcode.
    pub(crate) run_length: u8,
}

impl Decoder {
    pub(crate) fn new() -> Self {
        Self {
            index_array: [Color::ZERO; 64],
            previous_pixel: Color::ZERO,
            run_length: 0,
        }
    }

    /// Produces the next pixel, reading an opcode from `stream` unless a run
    /// is still in progress.
    pub(crate) fn decode_pixel(&mut self, stream: &mut &[u8]) -> Result<Color, ErrorKind> {
        if self.run_length > 0 {
            self.run_length -= 1;
            return Ok(self.previous_pixel);
        }

        let (&op, rest) = stream.split_first().ok_or(ErrorKind::UnexpectedEof)?;
        *stream = rest;

        let prev = self.previous_pixel;
        let pixel = match op {
            QOI_OP_RGB => {
                let [r, g, b] = take(stream, OpCode::Rgb)?;
                Color { r, g, b, a: prev.a }
            }
            QOI_OP_RGBA => Color::from(take::<4>(stream, OpCode::Rgba)?),
            _ => match op & QOI_MASK_2 {
                // Already in the cache, nothing to store.
                QOI_OP_INDEX => {
                    self.previous_pixel = self.index_array[op as usize];
                    return Ok(self.previous_pixel);
                }
                QOI_OP_DIFF => {
                    let dr = ((op >> 4) & 0b11) as i8 - 2;
                    let dg = ((op >> 2) & 0b11) as i8 - 2;
                    let db = (op & 0b11) as i8 - 2;
                    prev.wrapping_add_rgb(dr, dg, db)
                }
                QOI_OP_LUMA => {
                    let [byte1] = take(stream, OpCode::Luma)?;
                    let dg = lsb6(op) as i8 - 32;
                    let dr = (byte1 >> 4) as i8 - 8 + dg;
                    let db = (byte1 & 0b1111) as i8 - 8 + dg;
                    prev.wrapping_add_rgb(dr, dg, db)
                }
                // QOI_OP_RUN: the tag byte itself accounts for one pixel, the
                // stored value counts the repeats after it.
                _ => {
                    self.run_length = lsb6(op);
                    trace!("run of {} after {prev}", self.run_length);
                    return Ok(prev);
                }
            },
        };
        self.index_array[pixel.cache_index()] = pixel;
        self.previous_pixel = pixel;
        Ok(pixel)
    }
}
