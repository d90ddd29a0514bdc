/// Precision tiers supported by the splat buffer format
use crate::error::SplatBufferError;
use serde::{Deserialize, Serialize};
use splat_constants::format::{FULL_SCALE_RANGE, QUANTIZED_SCALE_RANGE};
use std::fmt;
use std::str::FromStr;

/// Attribute precision profile of a splat buffer.
/// `Full` keeps f32 everywhere; `Quantized` stores bucket relative u16
/// positions and half precision scales and rotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionLevel {
    #[default]
    Full,
    Quantized,
}

impl CompressionLevel {
    pub fn from_u8(level: u8) -> Result<Self, SplatBufferError> {
        match level {
            0 => Ok(Self::Full),
            1 => Ok(Self::Quantized),
            other => Err(SplatBufferError::UnsupportedCompressionLevel(other)),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Full => 0,
            Self::Quantized => 1,
        }
    }

    pub fn bytes_per_position(self) -> usize {
        match self {
            Self::Full => 12,
            Self::Quantized => 6,
        }
    }

    pub fn bytes_per_scale(self) -> usize {
        match self {
            Self::Full => 12,
            Self::Quantized => 6,
        }
    }

    pub fn bytes_per_color(self) -> usize {
        4
    }

    pub fn bytes_per_rotation(self) -> usize {
        match self {
            Self::Full => 16,
            Self::Quantized => 8,
        }
    }

    pub fn bytes_per_splat(self) -> usize {
        self.bytes_per_position()
            + self.bytes_per_scale()
            + self.bytes_per_color()
            + self.bytes_per_rotation()
    }

    /// Quantization half-range used when a header does not record one.
    pub fn default_scale_range(self) -> u32 {
        match self {
            Self::Full => FULL_SCALE_RANGE,
            Self::Quantized => QUANTIZED_SCALE_RANGE,
        }
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Quantized => write!(f, "quantized"),
        }
    }
}

impl FromStr for CompressionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "full" => Ok(Self::Full),
            "1" | "quantized" | "compressed" => Ok(Self::Quantized),
            other => Err(format!(
                "unknown compression level '{}' (expected full|quantized)",
                other
            )),
        }
    }
}
