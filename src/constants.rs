//! # Constants and type definitions for lightfeat
//!
//! This module centralizes the **file-naming conventions**, **survey constants**, and
//! **common type definitions** used throughout the crate.
//!
//! ## Overview
//!
//! - Markers used to pair header/photometry files and to locate the model number
//! - The LSST band prefix and the canonical filter set
//! - Cache layout constants (sub-directory, file extension, digest length)
//! - The [`ObjectId`] key type shared by the light-curve store and the feature tables

// -------------------------------------------------------------------------------------------------
// Input layout
// -------------------------------------------------------------------------------------------------

/// Environment variable naming the parent directory of the simulated light-curves
pub const DATA_ROOT_ENV_VAR: &str = "CADENCE_SIMS";

/// Substring identifying a header file (`*HEAD.FITS`)
pub const HEADER_MARKER: &str = "HEAD";

/// Substring identifying the photometry file paired with a header (`*PHOT.FITS`)
pub const PHOTOMETRY_MARKER: &str = "PHOT";

/// Token preceding the simulated model number in a directory name (`..._MODEL42/`)
pub const MODEL_MARKER: &str = "MODEL";

// -------------------------------------------------------------------------------------------------
// Survey
// -------------------------------------------------------------------------------------------------

/// Prefix prepended to every normalized band name (`"Z"` → `"lsstz"`)
pub const BAND_PREFIX: &str = "lsst";

/// LSST bands, in wavelength order
pub const LSST_BANDS: [char; 6] = ['u', 'g', 'r', 'i', 'z', 'y'];

/// Photometric zero-point system of the simulated fluxes
pub const ZP_SYSTEM: &str = "AB";

// -------------------------------------------------------------------------------------------------
// Feature cache
// -------------------------------------------------------------------------------------------------

/// Sub-directory of the cache root holding extracted features
pub const FEATURES_SUBDIR: &str = "features";

/// Sub-directory of the cache root reserved for classification outputs
pub const CLASSIFICATIONS_SUBDIR: &str = "classifications";

/// Extension of every cached file
pub const CACHE_FILE_EXT: &str = "ecsv";

/// Number of hexadecimal characters of the argument digest kept in a fingerprint
pub const FINGERPRINT_DIGEST_LEN: usize = 16;

/// Name of the default cache directory created under the user cache dir
pub const DEFAULT_CACHE_DIRNAME: &str = "lightfeat_cache";

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Modified Julian Date (days)
pub type MJD = f64;

// -------------------------------------------------------------------------------------------------
// Identifiers
// -------------------------------------------------------------------------------------------------

/// Identifier of a simulated object (the header `SNID`).
///
/// Simulations store it either as an integer column or as a fixed-width string column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectId {
    /// Integer-based identifier
    Int(i64),
    /// String-based identifier (trimmed)
    String(String),
}

impl ObjectId {
    /// `true` when the identifier is integer-based.
    pub fn is_int(&self) -> bool {
        matches!(self, ObjectId::Int(_))
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectId::Int(n) => write!(f, "{n}"),
            ObjectId::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for ObjectId {
    fn from(n: i64) -> Self {
        ObjectId::Int(n)
    }
}

impl From<String> for ObjectId {
    fn from(s: String) -> Self {
        ObjectId::String(s)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        ObjectId::String(s.to_string())
    }
}

impl std::str::FromStr for ObjectId {
    type Err = std::convert::Infallible;

    /// Parse an `ObjectId` from a string.
    /// - An integer literal → `Int(i64)`
    /// - Otherwise          → `String(String)`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<i64>() {
            Ok(n) => Ok(ObjectId::Int(n)),
            Err(_) => Ok(ObjectId::String(s.to_string())),
        }
    }
}

#[cfg(test)]
mod object_id_test {
    use super::*;

    #[test]
    fn test_object_id_from_str() {
        assert_eq!("1234".parse::<ObjectId>().unwrap(), ObjectId::Int(1234));
        assert_eq!("-7".parse::<ObjectId>().unwrap(), ObjectId::Int(-7));
        assert_eq!(
            "SN2011fe".parse::<ObjectId>().unwrap(),
            ObjectId::String("SN2011fe".into())
        );
        assert_eq!(ObjectId::Int(42).to_string(), "42");
    }
}
