mod color;
pub mod convert;
mod decode;
mod raster;

pub use color::*;
pub use decode::*;
pub use raster::*;

/// The 14 bytes at the start of every QOI file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub width: u32,
    pub height: u32,
    pub channels: Channels,
    pub colorspace: Colorspace,
}

impl Header {
    /// Number of pixels the opcode stream has to produce.
    pub fn n_pixels(&self) -> Option<usize> {
        usize::try_from(self.width)
            .ok()?
            .checked_mul(usize::try_from(self.height).ok()?)
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Channels {
    Rgb = 3,
    #[default]
    Rgba = 4,
}

impl Channels {
    pub(crate) fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            3 => Some(Self::Rgb),
            4 => Some(Self::Rgba),
            _ => None,
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, derive_more::Display)]
pub enum Colorspace {
    #[default]
    /// sRGB with linear alpha.
    #[display("sRGB")]
    Srgb = 0,
    /// All channels linear.
    #[display("linear")]
    Linear = 1,
}

impl Colorspace {
    pub(crate) fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Srgb),
            1 => Some(Self::Linear),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_enums_from_bytes() {
        assert_eq!(Channels::from_byte(3), Some(Channels::Rgb));
        assert_eq!(Channels::from_byte(4), Some(Channels::Rgba));
        assert_eq!(Channels::from_byte(2), None);
        assert_eq!(Colorspace::from_byte(0), Some(Colorspace::Srgb));
        assert_eq!(Colorspace::from_byte(1), Some(Colorspace::Linear));
        assert_eq!(Colorspace::from_byte(2), None);
    }

    #[test]
    fn pixel_count() {
        let header = Header {
            width: 3,
            height: 7,
            ..Default::default()
        };
        assert_eq!(header.n_pixels(), Some(21));
    }
}
