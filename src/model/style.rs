//! Overlay styling: anchors, colors, fonts and the overlay page size.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The 14 standard PDF fonts, usable without embedding.
pub const STANDARD_FONTS: [&str; 14] = [
    "Courier",
    "Courier-Bold",
    "Courier-Oblique",
    "Courier-BoldOblique",
    "Helvetica",
    "Helvetica-Bold",
    "Helvetica-Oblique",
    "Helvetica-BoldOblique",
    "Times-Roman",
    "Times-Bold",
    "Times-Italic",
    "Times-BoldItalic",
    "Symbol",
    "ZapfDingbats",
];

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const RED: Rgb = Rgb::new(0xFF, 0x00, 0x00);
    pub const BLUE: Rgb = Rgb::new(0x00, 0x00, 0xFF);
    pub const BLACK: Rgb = Rgb::new(0x00, 0x00, 0x00);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Components in the 0..=1 range used by the PDF `rg` operator.
    pub fn to_unit(&self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = Error;

    /// Parse `#RRGGBB` (the leading `#` is optional).
    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidConfig(format!(
                "invalid color '{}', expected #RRGGBB",
                s
            )));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| Error::InvalidConfig(format!("invalid color '{}'", s)))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for Rgb {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_string()
    }
}

/// A text anchor in PDF user space (points, bottom-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
}

impl Anchor {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for Anchor {
    type Err = Error;

    /// Parse `"x,y"`.
    fn from_str(s: &str) -> Result<Self> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| Error::InvalidConfig(format!("expected anchor as x,y, got '{}'", s)))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f32>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| Error::InvalidConfig(format!("invalid anchor coordinate '{}'", v)))
        };
        Ok(Self::new(parse(x)?, parse(y)?))
    }
}

/// Page dimensions in points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// ISO A4 (210 x 297 mm).
    pub const fn a4() -> Self {
        Self::new(595.2756, 841.8898)
    }

    /// US Letter (8.5 x 11 inches).
    pub const fn letter() -> Self {
        Self::new(612.0, 792.0)
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::a4()
    }
}

/// Color, font and size for one line of overlay text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub color: Rgb,
    /// One of [`STANDARD_FONTS`].
    pub font: String,
    pub font_size: f32,
}

impl TextStyle {
    pub fn new(color: Rgb, font: impl Into<String>, font_size: f32) -> Self {
        Self {
            color,
            font: font.into(),
            font_size,
        }
    }

    fn validate(&self, role: &str) -> Result<()> {
        if !STANDARD_FONTS.contains(&self.font.as_str()) {
            return Err(Error::InvalidConfig(format!(
                "{} font '{}' is not a standard PDF font",
                role, self.font
            )));
        }
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "{} font size must be positive, got {}",
                role, self.font_size
            )));
        }
        Ok(())
    }
}

/// Run-wide overlay styling, shared read-only by every page.
///
/// Anchors are expressed in the overlay page's coordinate space
/// ([`StyleConfig::page_size`], A4 unless configured otherwise).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Where the combined name is drawn.
    pub primary_anchor: Anchor,
    pub primary: TextStyle,
    /// Where the extra value is drawn; nothing is drawn when unset.
    pub secondary_anchor: Option<Anchor>,
    pub secondary: TextStyle,
    pub page_size: PageSize,
}

impl StyleConfig {
    /// Check fonts, sizes and page dimensions.
    pub fn validate(&self) -> Result<()> {
        self.primary.validate("primary")?;
        self.secondary.validate("secondary")?;
        let PageSize { width, height } = self.page_size;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "overlay page size must be positive, got {}x{}",
                width, height
            )));
        }
        Ok(())
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            primary_anchor: Anchor::new(285.0, 785.0),
            primary: TextStyle::new(Rgb::RED, "Courier-Bold", 20.0),
            secondary_anchor: Some(Anchor::new(430.0, 755.0)),
            secondary: TextStyle::new(Rgb::BLUE, "Courier-Bold", 22.0),
            page_size: PageSize::a4(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rgb() {
        assert_eq!("#FF0000".parse::<Rgb>().unwrap(), Rgb::RED);
        assert_eq!("0000ff".parse::<Rgb>().unwrap(), Rgb::BLUE);
        assert!("#F00".parse::<Rgb>().is_err());
        assert!("#GG0000".parse::<Rgb>().is_err());
        assert_eq!(Rgb::new(18, 52, 86).to_string(), "#123456");
    }

    #[test]
    fn test_rgb_unit_components() {
        assert_eq!(Rgb::BLUE.to_unit(), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_parse_anchor() {
        let anchor: Anchor = "285, 785".parse().unwrap();
        assert_eq!(anchor, Anchor::new(285.0, 785.0));
        assert!("285".parse::<Anchor>().is_err());
        assert!("x,1".parse::<Anchor>().is_err());
    }

    #[test]
    fn test_default_style() {
        let style = StyleConfig::default();
        assert_eq!(style.primary.color, Rgb::RED);
        assert_eq!(style.secondary.color, Rgb::BLUE);
        assert_eq!(style.primary.font_size, 20.0);
        assert_eq!(style.secondary.font_size, 22.0);
        assert!(style.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_font() {
        let mut style = StyleConfig::default();
        style.secondary.font = "Comic Sans".to_string();
        assert!(matches!(style.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_style_partial_json() {
        let style: StyleConfig =
            serde_json::from_str(r##"{"secondary_anchor": null, "primary": {"color": "#00FF00", "font": "Helvetica", "font_size": 12}}"##)
                .unwrap();
        assert_eq!(style.secondary_anchor, None);
        assert_eq!(style.primary.color, Rgb::new(0, 255, 0));
        assert_eq!(style.primary_anchor, Anchor::new(285.0, 785.0));
    }
}
