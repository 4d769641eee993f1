//! Recognition region.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Rectangle `(x0, y0, x1, y1)` in raster pixel space, top-left origin.
///
/// Coordinates are given for a 72 DPI raster and are scaled when the
/// page is rendered at another resolution. `x1 > x0` and `y1 > y0` hold
/// for every constructed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[u32; 4]", into = "[u32; 4]")]
pub struct RecognitionRegion {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl RecognitionRegion {
    /// Create a region, validating its extent.
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Result<Self> {
        if x1 <= x0 || y1 <= y0 {
            return Err(Error::InvalidConfig(format!(
                "recognition region ({},{},{},{}) must satisfy x1 > x0 and y1 > y0",
                x0, y0, x1, y1
            )));
        }
        Ok(Self { x0, y0, x1, y1 })
    }

    pub fn x0(&self) -> u32 {
        self.x0
    }

    pub fn y0(&self) -> u32 {
        self.y0
    }

    pub fn x1(&self) -> u32 {
        self.x1
    }

    pub fn y1(&self) -> u32 {
        self.y1
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    /// Scale the region for a raster rendered at `dpi`.
    ///
    /// Edges are rounded outwards so the scaled region never shrinks below
    /// the area it covered at 72 DPI.
    pub fn for_dpi(&self, dpi: u32) -> Self {
        if dpi == 72 || dpi == 0 {
            return *self;
        }
        let factor = dpi as f64 / 72.0;
        let x0 = (self.x0 as f64 * factor).floor() as u32;
        let y0 = (self.y0 as f64 * factor).floor() as u32;
        let x1 = ((self.x1 as f64 * factor).ceil() as u32).max(x0 + 1);
        let y1 = ((self.y1 as f64 * factor).ceil() as u32).max(y0 + 1);
        Self { x0, y0, x1, y1 }
    }

    /// Intersect with an image of the given dimensions.
    ///
    /// Returns `None` when nothing of the region lies inside the image.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Self> {
        let x1 = self.x1.min(width);
        let y1 = self.y1.min(height);
        if self.x0 >= x1 || self.y0 >= y1 {
            return None;
        }
        Some(Self {
            x0: self.x0,
            y0: self.y0,
            x1,
            y1,
        })
    }
}

impl Default for RecognitionRegion {
    fn default() -> Self {
        Self {
            x0: 94,
            y0: 48,
            x1: 140,
            y1: 75,
        }
    }
}

impl fmt::Display for RecognitionRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x0, self.y0, self.x1, self.y1)
    }
}

impl FromStr for RecognitionRegion {
    type Err = Error;

    /// Parse `"x0,y0,x1,y1"`.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(Error::InvalidConfig(format!(
                "expected region as x0,y0,x1,y1, got '{}'",
                s
            )));
        }
        let mut values = [0u32; 4];
        for (slot, part) in values.iter_mut().zip(parts) {
            *slot = part.parse().map_err(|_| {
                Error::InvalidConfig(format!("invalid region coordinate '{}'", part))
            })?;
        }
        Self::try_from(values)
    }
}

impl TryFrom<[u32; 4]> for RecognitionRegion {
    type Error = Error;

    fn try_from([x0, y0, x1, y1]: [u32; 4]) -> Result<Self> {
        Self::new(x0, y0, x1, y1)
    }
}

impl From<RecognitionRegion> for [u32; 4] {
    fn from(region: RecognitionRegion) -> Self {
        [region.x0, region.y0, region.x1, region.y1]
    }
}
