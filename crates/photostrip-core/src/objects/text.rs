//! Text payload, styling and measurement.

use crate::color::SerializableColor;
use crate::scene::SceneError;
use serde::{Deserialize, Serialize};

/// Smallest font size a text object may have.
pub const MIN_FONT_SIZE: f64 = 10.0;

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Some(TextAlign::Left),
            "center" => Some(TextAlign::Center),
            "right" => Some(TextAlign::Right),
            _ => None,
        }
    }

    /// Offset of the alignment anchor from the left edge of a box `width` wide.
    pub fn anchor_offset(self, width: f64) -> f64 {
        match self {
            TextAlign::Left => 0.0,
            TextAlign::Center => width / 2.0,
            TextAlign::Right => width,
        }
    }
}

/// Glyph outline. A width of 0 means no outline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextOutline {
    pub color: SerializableColor,
    pub width: f64,
}

impl Default for TextOutline {
    fn default() -> Self {
        Self {
            color: SerializableColor::white(),
            width: 0.0,
        }
    }
}

/// Drop shadow applied to the glyph fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextShadow {
    pub color: SerializableColor,
    pub offset_x: f64,
    pub offset_y: f64,
    pub blur: f64,
}

impl TextShadow {
    /// A shadow with a transparent color or no offset and no blur draws nothing.
    pub fn is_visible(&self) -> bool {
        !self.color.is_transparent()
            && (self.offset_x != 0.0 || self.offset_y != 0.0 || self.blur > 0.0)
    }
}

impl Default for TextShadow {
    fn default() -> Self {
        Self {
            color: SerializableColor::transparent(),
            offset_x: 0.0,
            offset_y: 0.0,
            blur: 0.0,
        }
    }
}

/// Style properties for text objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    pub color: SerializableColor,
    pub font_family: String,
    /// Font size in pixels.
    pub size: f64,
    pub align: TextAlign,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub outline: TextOutline,
    pub shadow: TextShadow,
}

impl TextStyle {
    pub const DEFAULT_FONT_SIZE: f64 = 30.0;
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            color: SerializableColor::black(),
            font_family: "sans-serif".to_string(),
            size: Self::DEFAULT_FONT_SIZE,
            align: TextAlign::default(),
            bold: false,
            italic: false,
            underline: false,
            outline: TextOutline::default(),
            shadow: TextShadow::default(),
        }
    }
}

/// The font-selection subset of a style, as needed for measuring and drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
}

impl FontSpec {
    /// CSS-like font shorthand, e.g. `italic bold 30px Arial`.
    pub fn css(&self) -> String {
        let mut parts = Vec::with_capacity(4);
        if self.italic {
            parts.push("italic".to_string());
        }
        if self.bold {
            parts.push("bold".to_string());
        }
        parts.push(format!("{}px", self.size));
        parts.push(self.family.clone());
        parts.join(" ")
    }
}

/// Measures the horizontal advance of a line of text.
pub trait TextMeasurer {
    /// Width in pixels of `content` rendered with `font`.
    fn measure_text(&self, font: &FontSpec, content: &str) -> f64;
}

/// Fixed-ratio estimate (0.6 em per character) used when no font is loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproximateMeasurer;

impl ApproximateMeasurer {
    pub const EM_RATIO: f64 = 0.6;
}

impl TextMeasurer for ApproximateMeasurer {
    fn measure_text(&self, font: &FontSpec, content: &str) -> f64 {
        content.chars().count() as f64 * font.size * Self::EM_RATIO
    }
}

/// A text object's content and style. Its box size is derived, never stored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextData {
    pub content: String,
    pub style: TextStyle,
}

impl TextData {
    pub fn new(content: impl Into<String>, style: TextStyle) -> Self {
        let mut style = style;
        style.size = style.size.max(MIN_FONT_SIZE);
        Self {
            content: content.into(),
            style,
        }
    }

    pub fn font(&self) -> FontSpec {
        FontSpec {
            family: self.style.font_family.clone(),
            size: self.style.size,
            bold: self.style.bold,
            italic: self.style.italic,
        }
    }

    /// Box size: measured advance by font size.
    pub fn measure(&self, measurer: &dyn TextMeasurer) -> (f64, f64) {
        let width = measurer.measure_text(&self.font(), &self.content);
        (width, self.style.size)
    }

    /// Set the font size, clamped to [`MIN_FONT_SIZE`].
    pub fn set_size(&mut self, size: f64) {
        self.style.size = size.max(MIN_FONT_SIZE);
    }

    /// Apply a single property edit.
    pub fn apply(&mut self, property: TextProperty) {
        let style = &mut self.style;
        match property {
            TextProperty::Content(content) => self.content = content,
            TextProperty::Color(color) => style.color = color,
            TextProperty::FontFamily(family) => style.font_family = family,
            TextProperty::Size(size) => style.size = size.max(MIN_FONT_SIZE),
            TextProperty::Align(align) => style.align = align,
            TextProperty::Bold(on) => style.bold = on,
            TextProperty::Italic(on) => style.italic = on,
            TextProperty::Underline(on) => style.underline = on,
            TextProperty::OutlineColor(color) => style.outline.color = color,
            TextProperty::OutlineWidth(width) => style.outline.width = width.max(0.0),
            TextProperty::ShadowColor(color) => style.shadow.color = color,
            TextProperty::ShadowOffsetX(dx) => style.shadow.offset_x = dx,
            TextProperty::ShadowOffsetY(dy) => style.shadow.offset_y = dy,
            TextProperty::ShadowBlur(blur) => style.shadow.blur = blur.max(0.0),
        }
    }
}

/// One editable text property with its new value.
#[derive(Debug, Clone, PartialEq)]
pub enum TextProperty {
    Content(String),
    Color(SerializableColor),
    FontFamily(String),
    Size(f64),
    Align(TextAlign),
    Bold(bool),
    Italic(bool),
    Underline(bool),
    OutlineColor(SerializableColor),
    OutlineWidth(f64),
    ShadowColor(SerializableColor),
    ShadowOffsetX(f64),
    ShadowOffsetY(f64),
    ShadowBlur(f64),
}

impl TextProperty {
    /// Build a property from a UI control's name and string value.
    pub fn parse(name: &str, value: &str) -> Result<Self, SceneError> {
        let invalid = || SceneError::InvalidProperty {
            name: name.to_string(),
            value: value.to_string(),
        };
        let number = || value.trim().parse::<f64>().ok().filter(|v| v.is_finite()).ok_or_else(invalid);
        let color = || SerializableColor::from_hex(value).map_err(|_| invalid());
        let flag = || match value.trim() {
            "true" | "1" | "on" => Ok(true),
            "false" | "0" | "off" => Ok(false),
            _ => Err(invalid()),
        };

        Ok(match name {
            "content" | "text" => TextProperty::Content(value.to_string()),
            "color" => TextProperty::Color(color()?),
            "fontFamily" | "font_family" => TextProperty::FontFamily(value.trim().to_string()),
            "size" | "fontSize" => TextProperty::Size(number()?),
            "align" => TextProperty::Align(TextAlign::parse(value).ok_or_else(invalid)?),
            "bold" => TextProperty::Bold(flag()?),
            "italic" => TextProperty::Italic(flag()?),
            "underline" => TextProperty::Underline(flag()?),
            "outlineColor" => TextProperty::OutlineColor(color()?),
            "outlineWidth" => TextProperty::OutlineWidth(number()?),
            "shadowColor" => TextProperty::ShadowColor(color()?),
            "shadowOffsetX" => TextProperty::ShadowOffsetX(number()?),
            "shadowOffsetY" => TextProperty::ShadowOffsetY(number()?),
            "shadowBlur" => TextProperty::ShadowBlur(number()?),
            _ => return Err(SceneError::UnknownProperty(name.to_string())),
        })
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: measuring twice without edits yields identical boxes.
        #[test]
        fn prop_measure_idempotent(
            content in "[a-zA-Z ]{0,24}",
            size in 10.0f64..200.0,
            bold in any::<bool>(),
            italic in any::<bool>(),
        ) {
            let text = TextData::new(content, TextStyle { size, bold, italic, ..TextStyle::default() });
            let first = text.measure(&ApproximateMeasurer);
            let second = text.measure(&ApproximateMeasurer);
            prop_assert_eq!(first, second);
        }
    }
}
