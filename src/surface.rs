//! Seams between the slideshow and the platform: drawing, decoding and
//! input. The raylib implementation lives in `window.rs`.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::error::DecodeError;
use crate::geometry::Placement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Error)]
#[error("expected a colour as RRGGBB hex, got {0:?}")]
pub struct ParseRgbError(String);

impl FromStr for Rgb {
    type Err = ParseRgbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseRgbError(s.to_string()));
        }
        let channel = |at: usize| u8::from_str_radix(&hex[at..at + 2], 16).map_err(|_| ParseRgbError(s.to_string()));
        Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Where frames end up. Called once per frame in the order
/// `fill_background`, `blit` (background), `blit` (foreground), `present`.
pub trait Surface {
    type Image;

    fn fill_background(&mut self, color: Rgb);
    fn blit(&mut self, image: &Self::Image, placement: Placement);
    fn present(&mut self);
}

/// Turns a path into something a `Surface` can draw. Synchronous from the
/// caller's point of view; the returned image is fully materialised.
pub trait Decoder {
    type Image;

    fn decode(&mut self, path: &Path) -> Result<Self::Image, DecodeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Quit,
    Next,    // Show a new image now
    Refresh, // Rescan the image tree
}

/// Input, drained once per frame.
pub trait Events {
    fn poll(&mut self) -> Option<Signal>;
}
