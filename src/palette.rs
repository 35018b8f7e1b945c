//! Semantic ink shades and their encoding into target pixel formats.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::classify::Tool;

/// The three logical shades the pipeline reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shade {
    White,
    #[default]
    Black,
    Gray,
}

impl Shade {
    /// 8-bit luminance. Gray is the 0x44 level on every format, so on
    /// RGB565 it packs to 0x4228 rather than the raw 0x4444 word some
    /// panel tools use, which is not a neutral grey.
    pub const fn level(self) -> u8 {
        match self {
            Shade::White => 0xff,
            Shade::Gray => 0x44,
            Shade::Black => 0x00,
        }
    }

    pub fn is_intermediate(self) -> bool {
        self == Shade::Gray
    }
}

impl FromStr for Shade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "white" => Ok(Shade::White),
            "black" => Ok(Shade::Black),
            "gray" | "grey" => Ok(Shade::Gray),
            _ => Err(format!("Invalid shade '{}'. Valid values: white, black, gray", s)),
        }
    }
}

/// Framebuffer pixel layout of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PixelFormat {
    /// 8-bit grayscale panel.
    Gray8,
    /// Grayscale panel exposed as little-endian RGB565.
    Rgb565,
    /// 32-bit host framebuffer.
    Xrgb8888,
}

impl PixelFormat {
    /// Resolve the format for the running process: 32-bit ARM means the
    /// panel, anything else a development host.
    pub fn detect() -> Self {
        if std::env::consts::ARCH == "arm" {
            PixelFormat::Rgb565
        } else {
            PixelFormat::Xrgb8888
        }
    }

    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb565 => 2,
            PixelFormat::Xrgb8888 => 4,
        }
    }

    /// Pointer width of the target the format belongs to.
    pub const fn pointer_width(self) -> usize {
        match self {
            PixelFormat::Gray8 | PixelFormat::Rgb565 => 4,
            PixelFormat::Xrgb8888 => 8,
        }
    }

    pub fn encode(self, level: u8) -> u32 {
        let l = u32::from(level);
        match self {
            PixelFormat::Gray8 => l,
            PixelFormat::Rgb565 => ((l >> 3) << 11) | ((l >> 2) << 5) | (l >> 3),
            PixelFormat::Xrgb8888 => (l << 16) | (l << 8) | l,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelFormat::Gray8 => write!(f, "gray8"),
            PixelFormat::Rgb565 => write!(f, "rgb565"),
            PixelFormat::Xrgb8888 => write!(f, "xrgb8888"),
        }
    }
}

impl FromStr for PixelFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gray8" | "grey8" => Ok(PixelFormat::Gray8),
            "rgb565" => Ok(PixelFormat::Rgb565),
            "xrgb8888" | "rgb32" => Ok(PixelFormat::Xrgb8888),
            _ => Err(format!(
                "Invalid pixel format '{}'. Valid values: gray8, rgb565, xrgb8888",
                s
            )),
        }
    }
}

/// Converts semantic shades into pixels of one format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    format: PixelFormat,
}

impl Palette {
    pub fn new(format: PixelFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pixel(&self, shade: Shade) -> u32 {
        self.format.encode(shade.level())
    }

    /// Anti-aliased edge pixel: `coverage` of `shade` over white paper.
    pub fn blend(&self, shade: Shade, coverage: f32) -> u32 {
        let c = coverage.clamp(0.0, 1.0);
        let white = f32::from(Shade::White.level());
        let ink = f32::from(shade.level());
        let level = (white + (ink - white) * c).round() as u8;
        self.format.encode(level)
    }
}

/// Which shade each tool lays down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InkStyle {
    pub pen_shade: Shade,
    pub antialias: bool,
}

impl InkStyle {
    pub fn shade_for(&self, tool: Tool) -> Shade {
        match tool {
            Tool::StylusEraser | Tool::RubberEraser => Shade::White,
            Tool::Pen | Tool::Unknown => self.pen_shade,
        }
    }

    /// Strokes of this tool put intermediate grey on the panel.
    pub fn uses_gray(&self, tool: Tool) -> bool {
        self.antialias || self.shade_for(tool).is_intermediate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_extremes() {
        for format in [PixelFormat::Gray8, PixelFormat::Rgb565, PixelFormat::Xrgb8888] {
            let palette = Palette::new(format);
            assert_eq!(palette.pixel(Shade::Black), 0);
        }
        assert_eq!(Palette::new(PixelFormat::Gray8).pixel(Shade::White), 0xff);
        assert_eq!(Palette::new(PixelFormat::Rgb565).pixel(Shade::White), 0xffff);
        assert_eq!(Palette::new(PixelFormat::Xrgb8888).pixel(Shade::White), 0x00ff_ffff);
        assert_eq!(Palette::new(PixelFormat::Xrgb8888).pixel(Shade::Gray), 0x0044_4444);
    }

    #[test]
    fn test_gray_is_the_same_level_everywhere() {
        assert_eq!(Palette::new(PixelFormat::Gray8).pixel(Shade::Gray), 0x44);
        assert_eq!(Palette::new(PixelFormat::Rgb565).pixel(Shade::Gray), 0x4228);
    }

    #[test]
    fn test_blend_interpolates_from_white() {
        let palette = Palette::new(PixelFormat::Gray8);
        assert_eq!(palette.blend(Shade::Black, 0.0), 0xff);
        assert_eq!(palette.blend(Shade::Black, 1.0), 0x00);
        assert_eq!(palette.blend(Shade::Black, 0.5), 0x80);
        assert_eq!(palette.blend(Shade::Gray, 1.0), 0x44);
    }

    #[test]
    fn test_widths() {
        assert_eq!(PixelFormat::Rgb565.bytes_per_pixel(), 2);
        assert_eq!(PixelFormat::Rgb565.pointer_width(), 4);
        assert_eq!(PixelFormat::Xrgb8888.pointer_width(), 8);
    }

    #[test]
    fn test_ink_style() {
        let style = InkStyle::default();
        assert_eq!(style.shade_for(Tool::Pen), Shade::Black);
        assert_eq!(style.shade_for(Tool::RubberEraser), Shade::White);
        assert!(!style.uses_gray(Tool::Pen));

        let gray = InkStyle { pen_shade: Shade::Gray, antialias: false };
        assert!(gray.uses_gray(Tool::Pen));
        assert!(!gray.uses_gray(Tool::StylusEraser));

        let aa = InkStyle { antialias: true, ..InkStyle::default() };
        assert!(aa.uses_gray(Tool::StylusEraser));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("grey".parse::<Shade>().unwrap(), Shade::Gray);
        assert_eq!("RGB565".parse::<PixelFormat>().unwrap(), PixelFormat::Rgb565);
        assert!("cmyk".parse::<PixelFormat>().is_err());
    }
}
