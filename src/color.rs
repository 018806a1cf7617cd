use derive_more::Display;

/// An RGBA color with 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("Color({r:02X},{g:02X},{b:02X},{a:02X})")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for Color {
    /// Opaque black, the color every decode starts from.
    fn default() -> Self {
        Self::ZERO
    }
}

impl Color {
    pub const ZERO: Self = Self::rgba(0, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// A fully opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// The hashing function used by QOI, `(3r + 5g + 7b + 11a) mod 256`.
    pub const fn qoi_hash(self) -> u8 {
        self.r
            .wrapping_mul(3)
            .wrapping_add(self.g.wrapping_mul(5))
            .wrapping_add(self.b.wrapping_mul(7))
            .wrapping_add(self.a.wrapping_mul(11))
    }

    /// Slot of this color in the 64 entry running cache.
    pub const fn cache_index(self) -> usize {
        (self.qoi_hash() % 64) as usize
    }

    /// Adds signed deltas to the red, green and blue channels, wrapping at 256.
    /// Alpha is left untouched.
    pub const fn wrapping_add_rgb(self, dr: i8, dg: i8, db: i8) -> Self {
        Self {
            r: self.r.wrapping_add_signed(dr),
            g: self.g.wrapping_add_signed(dg),
            b: self.b.wrapping_add_signed(db),
            a: self.a,
        }
    }

    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<[u8; 4]> for Color {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self { r, g, b, a }
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::rgb(r, g, b)
    }
}

impl From<Color> for [u8; 4] {
    fn from(color: Color) -> Self {
        color.to_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_matches_formula() {
        let color = Color::rgba(10, 20, 30, 40);
        let expected = (3 * 10 + 5 * 20 + 7 * 30 + 11 * 40) % 256;
        assert_eq!(color.qoi_hash() as u32, expected);
        assert_eq!(color.cache_index() as u32, expected % 64);
    }

    #[test]
    fn hash_wraps_on_large_channels() {
        let white = Color::rgba(255, 255, 255, 255);
        assert_eq!(white.qoi_hash() as u32, (26 * 255) % 256);
        assert_eq!(white.cache_index(), 38);
        assert_eq!(Color::ZERO.cache_index(), 53);
    }

    #[test]
    fn default_is_opaque_black() {
        assert_eq!(Color::default(), Color::rgba(0, 0, 0, 255));
        assert_eq!(Color::from([1, 2, 3]), Color::rgba(1, 2, 3, 255));
    }

    #[test]
    fn deltas_wrap() {
        let color = Color::rgba(254, 1, 128, 7).wrapping_add_rgb(5, -2, 0);
        assert_eq!(color, Color::rgba(3, 255, 128, 7));
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(Color::rgba(255, 0, 16, 1).to_string(), "Color(FF,00,10,01)");
    }
}
