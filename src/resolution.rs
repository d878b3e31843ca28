use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// A display mode in pixels
///
/// Dimensions are plain integers so a zero can still be represented and
/// rejected by the validator; aspect ratio is always derived on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolutionSpec {
    pub width: u32,
    pub height: u32,
}

impl ResolutionSpec {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_positive(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// True if either dimension is larger than `other`'s
    pub fn exceeds(&self, other: &ResolutionSpec) -> bool {
        self.width > other.width || self.height > other.height
    }
}

impl fmt::Display for ResolutionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Parses `WIDTHxHEIGHT` (either `x` or `X`, whitespace tolerated around the parts)
impl FromStr for ResolutionSpec {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ValidationError::MalformedResolution {
            input: s.to_string(),
        };

        let (w, h) = s.split_once(['x', 'X']).ok_or_else(malformed)?;
        let (w, h) = (w.trim(), h.trim());
        if w.is_empty() || h.is_empty() || !w.bytes().chain(h.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        let width = w.parse::<u32>().map_err(|_| malformed())?;
        let height = h.parse::<u32>().map_err(|_| malformed())?;
        Ok(Self { width, height })
    }
}
