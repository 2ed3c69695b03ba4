//! Serializable color type shared by layouts, text styles and strokes.

use peniko::Color;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a color string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid color: {0}")]
pub struct ColorParseError(pub String);

/// Serializable color representation (RGBA8).
///
/// Deserializes from either a `#rgb` / `#rrggbb` / `#rrggbbaa` string or an
/// `{ "r", "g", "b", "a" }` object; always serializes as the object form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr")]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Hex(String),
    Rgba {
        r: u8,
        g: u8,
        b: u8,
        #[serde(default = "opaque")]
        a: u8,
    },
}

fn opaque() -> u8 {
    255
}

impl TryFrom<ColorRepr> for SerializableColor {
    type Error = ColorParseError;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        match repr {
            ColorRepr::Hex(s) => Self::from_hex(&s),
            ColorRepr::Rgba { r, g, b, a } => Ok(Self::new(r, g, b, a)),
        }
    }
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`. The keyword `transparent` is
    /// also accepted.
    pub fn from_hex(color: &str) -> Result<Self, ColorParseError> {
        let color = color.trim();
        if color.eq_ignore_ascii_case("transparent") {
            return Ok(Self::transparent());
        }
        let hex = color
            .strip_prefix('#')
            .ok_or_else(|| ColorParseError(color.to_string()))?;
        let channel = |range: std::ops::Range<usize>| {
            hex.get(range)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| ColorParseError(color.to_string()))
        };
        match hex.len() {
            3 => Ok(Self::new(
                channel(0..1)? * 17,
                channel(1..2)? * 17,
                channel(2..3)? * 17,
                255,
            )),
            6 => Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?, 255)),
            8 => Ok(Self::new(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => Err(ColorParseError(color.to_string())),
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }
}

impl Default for SerializableColor {
    fn default() -> Self {
        Self::black()
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}
