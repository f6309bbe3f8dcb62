use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub(crate) enum PaletteError {
    #[error("palette must contain at least one color")]
    Empty,
    #[error("invalid color literal {0:?}, expected #rrggbb or #rgb")]
    BadHex(String),
    #[error("palette has no slot {0}")]
    UnknownSlot(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub(crate) struct Rgb {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
}

impl Rgb {
    pub(crate) const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub(crate) fn from_hex(s: &str) -> Result<Self, PaletteError> {
        let t = s.trim();
        let hex = t.strip_prefix('#').unwrap_or(t);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(PaletteError::BadHex(s.to_string()));
        }
        let full: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return Err(PaletteError::BadHex(s.to_string())),
        };
        let v = u32::from_str_radix(&full, 16).map_err(|_| PaletteError::BadHex(s.to_string()))?;
        Ok(Self {
            r: (v >> 16) as u8,
            g: (v >> 8) as u8,
            b: v as u8,
        })
    }

    pub(crate) fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Hue in degrees `[0,360)`, saturation and value in `[0,1]`.
    fn to_hsv(self) -> (f32, f32, f32) {
        let r = self.r as f32 / 255.0;
        let g = self.g as f32 / 255.0;
        let b = self.b as f32 / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let d = max - min;

        let h = if d <= f32::EPSILON {
            0.0
        } else if max == r {
            60.0 * ((g - b) / d).rem_euclid(6.0)
        } else if max == g {
            60.0 * ((b - r) / d + 2.0)
        } else {
            60.0 * ((r - g) / d + 4.0)
        };
        let s = if max <= f32::EPSILON { 0.0 } else { d / max };
        (h, s, max)
    }

    fn from_hsv(h: f32, s: f32, v: f32) -> Self {
        let h = h.rem_euclid(360.0);
        let c = v * s;
        let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
        let m = v - c;
        let (r, g, b) = match (h / 60.0) as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let f = |u: f32| -> u8 { ((u + m) * 255.0).round().clamp(0.0, 255.0) as u8 };
        Self {
            r: f(r),
            g: f(g),
            b: f(b),
        }
    }

    pub(crate) fn rotate_hue(self, degrees: f32) -> Rgb {
        let (h, s, v) = self.to_hsv();
        Self::from_hsv(h + degrees, s, v)
    }
}

impl TryFrom<String> for Rgb {
    type Error = PaletteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::from_hex(&value)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_hex()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Swatch {
    pub(crate) name: String,
    pub(crate) color: Rgb,
}

/// Ordered, named color slots. Never empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Swatch>", into = "Vec<Swatch>")]
pub(crate) struct Palette {
    slots: Vec<Swatch>,
}

impl Palette {
    pub(crate) fn new(slots: Vec<Swatch>) -> Result<Self, PaletteError> {
        if slots.is_empty() {
            return Err(PaletteError::Empty);
        }
        Ok(Self { slots })
    }

    #[cfg(test)]
    pub(crate) fn from_colors(colors: &[Rgb]) -> Result<Self, PaletteError> {
        Self::new(named(colors))
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn get(&self, slot: usize) -> Option<Rgb> {
        self.slots.get(slot).map(|s| s.color)
    }

    pub(crate) fn swatches(&self) -> &[Swatch] {
        &self.slots
    }

    pub(crate) fn contains(&self, color: Rgb) -> bool {
        self.slots.iter().any(|s| s.color == color)
    }

    pub(crate) fn set(&mut self, slot: usize, color: Rgb) -> Result<(), PaletteError> {
        let s = self
            .slots
            .get_mut(slot)
            .ok_or(PaletteError::UnknownSlot(slot))?;
        s.color = color;
        Ok(())
    }

    /// Uniform pick over the slots.
    pub(crate) fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Rgb {
        self.slots[rng.gen_range(0..self.slots.len())].color
    }
}

impl Default for Palette {
    fn default() -> Self {
        let colors = [
            Rgb::new(0xe3, 0x42, 0x31),
            Rgb::new(0x2c, 0x6d, 0xeb),
            Rgb::new(0xf2, 0xd0, 0x46),
            Rgb::new(0xf4, 0xf5, 0xef),
            Rgb::new(0x03, 0x0c, 0x11),
        ];
        Self {
            slots: named(&colors),
        }
    }
}

fn named(colors: &[Rgb]) -> Vec<Swatch> {
    colors
        .iter()
        .enumerate()
        .map(|(i, &color)| Swatch {
            name: format!("Color {}", i + 1),
            color,
        })
        .collect()
}

impl TryFrom<Vec<Swatch>> for Palette {
    type Error = PaletteError;

    fn try_from(value: Vec<Swatch>) -> Result<Self, Self::Error> {
        Palette::new(value)
    }
}

impl From<Palette> for Vec<Swatch> {
    fn from(value: Palette) -> Self {
        value.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn parses_long_and_short_hex() {
        assert_eq!(Rgb::from_hex("#e34231").unwrap(), Rgb::new(0xe3, 0x42, 0x31));
        assert_eq!(Rgb::from_hex("2C6DEB").unwrap(), Rgb::new(0x2c, 0x6d, 0xeb));
        assert_eq!(Rgb::from_hex("#fa0").unwrap(), Rgb::new(0xff, 0xaa, 0x00));
    }

    #[test]
    fn rejects_malformed_hex() {
        for bad in ["", "#12345", "#gg0000", "#+12345", "#1234567"] {
            assert!(Rgb::from_hex(bad).is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn hex_formatting_is_lowercase_and_padded() {
        assert_eq!(Rgb::new(3, 12, 17).to_hex(), "#030c11");
    }

    #[test]
    fn hue_rotation_moves_primaries() {
        let red = Rgb::new(255, 0, 0);
        assert_eq!(red.rotate_hue(120.0), Rgb::new(0, 255, 0));
        assert_eq!(red.rotate_hue(-120.0), Rgb::new(0, 0, 255));
        assert_eq!(red.rotate_hue(360.0), red);
    }

    #[test]
    fn grey_is_unchanged_by_hue_rotation() {
        let grey = Rgb::new(170, 170, 170);
        assert_eq!(grey.rotate_hue(45.0), grey);
    }

    #[test]
    fn empty_palette_is_rejected() {
        assert_eq!(Palette::new(Vec::new()), Err(PaletteError::Empty));
        assert_eq!(Palette::from_colors(&[]), Err(PaletteError::Empty));
    }

    #[test]
    fn pick_always_returns_a_member() {
        let palette = Palette::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            assert!(palette.contains(palette.pick(&mut rng)));
        }
    }

    #[test]
    fn set_unknown_slot_fails() {
        let mut palette = Palette::default();
        assert_eq!(
            palette.set(9, Rgb::new(0, 0, 0)),
            Err(PaletteError::UnknownSlot(9))
        );
        palette.set(0, Rgb::new(1, 2, 3)).unwrap();
        assert_eq!(palette.get(0), Some(Rgb::new(1, 2, 3)));
    }

    #[test]
    fn palette_json_uses_hex_strings_and_rejects_empty() {
        let json = serde_json::to_string(&Palette::default()).unwrap();
        assert!(json.contains("\"#e34231\""));
        let back: Palette = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Palette::default());
        assert!(serde_json::from_str::<Palette>("[]").is_err());
    }
}
