//! Typed series format metadata.
//!
//! Catalogs historically carry per-dataset acquisition parameters as a loose
//! string-keyed map. At the boundary where this core consumes them they
//! become a validated struct with named fields.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    #[error("series format requires a non-empty file mask")]
    EmptyMask,

    #[error("timezone offset {0} is outside -12..=14 hours")]
    TimezoneOutOfRange(i8),

    #[error("series format must declare at least one band")]
    ZeroBands,
}

/// Acquisition parameters of one raster dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesFormat {
    /// Folder the dataset's files live in, relative to the provider root.
    #[serde(default)]
    pub folder: String,

    /// File name mask with date/time placeholders (e.g. `%YYYY%MM%DD_%hh%mm.tif`).
    pub file_mask: String,

    /// Timezone offset of the timestamps embedded in file names, in hours.
    #[serde(default)]
    pub timezone_offset_hours: i8,

    /// Reference system to assume when a file carries none.
    #[serde(default)]
    pub fallback_srid: Option<u32>,

    /// Number of bands each slice is expected to expose.
    #[serde(default = "default_bands")]
    pub bands: u32,
}

fn default_bands() -> u32 {
    1
}

impl SeriesFormat {
    /// Checks field ranges at the catalog boundary.
    pub fn validate(&self) -> Result<(), FormatError> {
        if self.file_mask.trim().is_empty() {
            return Err(FormatError::EmptyMask);
        }
        if !(-12..=14).contains(&self.timezone_offset_hours) {
            return Err(FormatError::TimezoneOutOfRange(self.timezone_offset_hours));
        }
        if self.bands == 0 {
            return Err(FormatError::ZeroBands);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format() -> SeriesFormat {
        SeriesFormat {
            folder: "hidro".to_string(),
            file_mask: "S10238225_%YYYY%MM%DD%hh%mm.tif".to_string(),
            timezone_offset_hours: -3,
            fallback_srid: Some(4326),
            bands: 1,
        }
    }

    #[test]
    fn test_valid_format() {
        assert!(format().validate().is_ok());
    }

    #[test]
    fn test_empty_mask_rejected() {
        let mut f = format();
        f.file_mask = "   ".to_string();
        assert_eq!(f.validate().unwrap_err(), FormatError::EmptyMask);
    }

    #[test]
    fn test_timezone_range() {
        let mut f = format();
        f.timezone_offset_hours = -13;
        assert_eq!(
            f.validate().unwrap_err(),
            FormatError::TimezoneOutOfRange(-13)
        );
    }

    #[test]
    fn test_zero_bands_rejected() {
        let mut f = format();
        f.bands = 0;
        assert_eq!(f.validate().unwrap_err(), FormatError::ZeroBands);
    }

    #[test]
    fn test_deserialize_defaults() {
        let f: SeriesFormat = serde_json::from_str(r#"{"file_mask":"%YYYY.tif"}"#).unwrap();
        assert_eq!(f.bands, 1);
        assert_eq!(f.timezone_offset_hours, 0);
        assert_eq!(f.fallback_srid, None);
        assert!(f.validate().is_ok());
    }
}
