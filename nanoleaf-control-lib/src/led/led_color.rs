use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hue is a whole number of degrees.
pub const HUE_RANGE: u16 = 360;
/// Saturation and brightness are whole percentages.
pub const PERCENT_RANGE: u8 = 100;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("color must be six hex digits or a color name, got {0:?}")]
    Invalid(String),
}

/// An 8-bit-per-channel color sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

/// A color in the device's own units: hue in degrees, saturation and brightness in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hsb {
    pub hue: u16,
    pub saturation: u8,
    pub brightness: u8,
}

impl Rgb {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Rgb { red, green, blue }
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper([self.red, self.green, self.blue])
    }
}

impl Hsb {
    pub const fn new(hue: u16, saturation: u8, brightness: u8) -> Self {
        Hsb {
            hue,
            saturation,
            brightness,
        }
    }
}

/// Converts device HSB to RGB.
///
/// Hue wraps at 360, saturation and brightness are clamped to 100. Channels are
/// truncated, not rounded, so `(0, 0, 50)` gives 127. The sector arithmetic runs in
/// a fixed order because truncation makes the last bit of every product visible.
pub fn rgb_from_hsb(hsb: Hsb) -> Rgb {
    let hue = f64::from(hsb.hue % HUE_RANGE) / f64::from(HUE_RANGE);
    let saturation = f64::from(hsb.saturation.min(PERCENT_RANGE)) / 100.0;
    let value = f64::from(hsb.brightness.min(PERCENT_RANGE)) / 100.0;

    let (red, green, blue) = if saturation == 0.0 {
        (value, value, value)
    } else {
        let sector = (hue * 6.0) as u8;
        let fraction = hue * 6.0 - f64::from(sector);
        let p = value * (1.0 - saturation);
        let q = value * (1.0 - saturation * fraction);
        let t = value * (1.0 - saturation * (1.0 - fraction));
        match sector % 6 {
            0 => (value, t, p),
            1 => (q, value, p),
            2 => (p, value, t),
            3 => (p, q, value),
            4 => (t, p, value),
            _ => (value, p, q),
        }
    };
    Rgb::new(truncate_channel(red), truncate_channel(green), truncate_channel(blue))
}

/// Converts RGB to device HSB, truncating each component to a whole unit.
pub fn hsb_from_rgb(rgb: Rgb) -> Hsb {
    let red = f64::from(rgb.red) / 255.0;
    let green = f64::from(rgb.green) / 255.0;
    let blue = f64::from(rgb.blue) / 255.0;

    let max = red.max(green).max(blue);
    let min = red.min(green).min(blue);
    let brightness = ((max * 100.0) as u8).min(PERCENT_RANGE);
    if max == min {
        return Hsb::new(0, 0, brightness);
    }

    let range = max - min;
    let saturation = ((range / max * 100.0) as u8).min(PERCENT_RANGE);
    let red_distance = (max - red) / range;
    let green_distance = (max - green) / range;
    let blue_distance = (max - blue) / range;
    let sector = if red == max {
        blue_distance - green_distance
    } else if green == max {
        2.0 + red_distance - blue_distance
    } else {
        4.0 + green_distance - red_distance
    };
    let hue = ((sector / 6.0).rem_euclid(1.0) * f64::from(HUE_RANGE)) as u16 % HUE_RANGE;
    Hsb::new(hue, saturation, brightness)
}

fn truncate_channel(value: f64) -> u8 {
    (value * 255.0).clamp(0.0, 255.0) as u8
}

impl From<Hsb> for Rgb {
    fn from(hsb: Hsb) -> Self {
        rgb_from_hsb(hsb)
    }
}

impl From<Rgb> for Hsb {
    fn from(rgb: Rgb) -> Self {
        hsb_from_rgb(rgb)
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from(tuple: (u8, u8, u8)) -> Self {
        Rgb::new(tuple.0, tuple.1, tuple.2)
    }
}

impl From<Rgb> for (u8, u8, u8) {
    fn from(rgb: Rgb) -> Self {
        (rgb.red, rgb.green, rgb.blue)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = ColorParseError;

    /// Accepts `RRGGBB`, `#RRGGBB` or one of the [`NamedColor`] names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(named) = s.parse::<NamedColor>() {
            return Ok(named.into());
        }

        let digits = s.strip_prefix('#').unwrap_or(s);
        match hex::decode(digits).as_deref() {
            Ok([red, green, blue]) => Ok(Rgb::new(*red, *green, *blue)),
            _ => Err(ColorParseError::Invalid(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NamedColor {
    Red,
    Green,
    Blue,
    Yellow,
    Orange,
    Purple,
    Cyan,
    Magenta,
    Pink,
    White,
}

impl FromStr for NamedColor {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "red" => Ok(NamedColor::Red),
            "green" => Ok(NamedColor::Green),
            "blue" => Ok(NamedColor::Blue),
            "yellow" => Ok(NamedColor::Yellow),
            "orange" => Ok(NamedColor::Orange),
            "purple" => Ok(NamedColor::Purple),
            "cyan" => Ok(NamedColor::Cyan),
            "magenta" => Ok(NamedColor::Magenta),
            "pink" => Ok(NamedColor::Pink),
            "white" => Ok(NamedColor::White),
            _ => Err(ColorParseError::Invalid(s.to_string())),
        }
    }
}

impl From<NamedColor> for Rgb {
    fn from(color: NamedColor) -> Self {
        match color {
            NamedColor::Red => Rgb::new(255, 0, 0),
            NamedColor::Green => Rgb::new(0, 255, 0),
            NamedColor::Blue => Rgb::new(0, 0, 255),
            NamedColor::Yellow => Rgb::new(255, 255, 0),
            NamedColor::Orange => Rgb::new(255, 165, 0),
            NamedColor::Purple => Rgb::new(128, 0, 128),
            NamedColor::Cyan => Rgb::new(0, 255, 255),
            NamedColor::Magenta => Rgb::new(255, 0, 255),
            NamedColor::Pink => Rgb::new(255, 192, 203),
            NamedColor::White => Rgb::new(255, 255, 255),
        }
    }
}
