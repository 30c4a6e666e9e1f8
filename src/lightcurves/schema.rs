//! # Photometry schema mapping
//!
//! The simulator writes photometry with its own column names (`MJD`, `FLT`, `FLUXCAL`, …).
//! Feature extraction expects the canonical names used by `sncosmo`-style light-curve
//! tables (`mjd`, `filter`, `flux`, …). This module maps one onto the other.
//!
//! ## Overview
//! -----------------
//! * [`CanonicalField`] – the canonical fields and their raw counterparts.
//! * [`SchemaMapper::project`] – resolves the raw column positions of every canonical field
//!   **once per file**. Unknown raw columns are dropped; a missing required field fails fast.
//! * [`Projection::map_row`] – converts one raw row into a typed [`PhotometrySample`].
//! * [`normalize_band`] – `" Z"` → `"lsstz"`.
//!
//! `SIM_MAGOBS` is the only optional field: when the column is absent the sample carries
//! `sim_magobs = None`.
use thiserror::Error;

use crate::{
    constants::{BAND_PREFIX, MJD},
    fits::{ColumnDescriptor, FitsValue},
};

/// Raw simulator column → canonical column.
pub const COLUMN_NAME_MAPPING: [(&str, &str); 11] = [
    ("MJD", "mjd"),
    ("FLT", "filter"),
    ("FIELD", "field"),
    ("PHOTFLAG", "photflag"),
    ("PHOTPROB", "photprob"),
    ("FLUXCAL", "flux"),
    ("FLUXCALERR", "flux_error"),
    ("PSF_SIG1", "psf_sig1"),
    ("SKY_SIG", "sky_sig"),
    ("ZEROPT", "zp"),
    ("SIM_MAGOBS", "sim_magobs"),
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("missing column {raw} (canonical field '{canonical}')")]
    MissingField {
        raw: &'static str,
        canonical: &'static str,
    },

    #[error("invalid value '{value}' for field '{field}'")]
    InvalidValue { field: &'static str, value: String },
}

/// Fields of the canonical photometry schema, in [`COLUMN_NAME_MAPPING`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Mjd,
    Filter,
    Field,
    PhotFlag,
    PhotProb,
    Flux,
    FluxError,
    PsfSig1,
    SkySig,
    Zp,
    SimMagObs,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 11] = [
        CanonicalField::Mjd,
        CanonicalField::Filter,
        CanonicalField::Field,
        CanonicalField::PhotFlag,
        CanonicalField::PhotProb,
        CanonicalField::Flux,
        CanonicalField::FluxError,
        CanonicalField::PsfSig1,
        CanonicalField::SkySig,
        CanonicalField::Zp,
        CanonicalField::SimMagObs,
    ];

    fn position(&self) -> usize {
        *self as usize
    }

    /// Canonical column name.
    pub fn name(&self) -> &'static str {
        COLUMN_NAME_MAPPING[self.position()].1
    }

    /// Column name in the simulator output.
    pub fn raw_name(&self) -> &'static str {
        COLUMN_NAME_MAPPING[self.position()].0
    }

    pub fn is_required(&self) -> bool {
        !matches!(self, CanonicalField::SimMagObs)
    }

    pub fn from_raw(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.raw_name() == raw)
    }
}

/// One flux measurement in the canonical schema.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotometrySample {
    pub mjd: MJD,
    /// Normalized band name, e.g. `"lsstg"`.
    pub filter: String,
    pub field: String,
    pub photflag: i32,
    pub photprob: f32,
    pub flux: f32,
    pub flux_error: f32,
    pub psf_sig1: f32,
    pub sky_sig: f32,
    pub zp: f32,
    pub sim_magobs: Option<f32>,
}

/// Normalize a raw filter value: strip, lowercase, prefix with [`BAND_PREFIX`].
pub fn normalize_band(raw: &str) -> String {
    format!("{BAND_PREFIX}{}", raw.trim().to_lowercase())
}

/// Maps raw photometry tables onto the canonical schema.
pub struct SchemaMapper;

impl SchemaMapper {
    /// Resolve the raw column of every canonical field.
    ///
    /// Arguments
    /// -----------------
    /// * `columns`: the raw photometry columns, in file order.
    ///
    /// Return
    /// ----------
    /// * A [`Projection`] mapping canonical fields to raw column positions.
    /// * [`SchemaError::MissingField`] for the first required field without a raw column.
    pub fn project(columns: &[ColumnDescriptor]) -> Result<Projection, SchemaError> {
        let mut indices = [None; 11];
        for (i, column) in columns.iter().enumerate() {
            // Raw columns outside the mapping are dropped.
            if let Some(field) = CanonicalField::from_raw(column.name.trim()) {
                indices[field.position()].get_or_insert(i);
            }
        }

        if let Some(missing) = CanonicalField::ALL
            .into_iter()
            .find(|f| f.is_required() && indices[f.position()].is_none())
        {
            return Err(SchemaError::MissingField {
                raw: missing.raw_name(),
                canonical: missing.name(),
            });
        }
        Ok(Projection { indices })
    }
}

/// Raw column positions of the canonical fields for one photometry file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    indices: [Option<usize>; 11],
}

impl Projection {
    /// Canonical names produced by this projection.
    pub fn canonical_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        CanonicalField::ALL
            .into_iter()
            .filter(|f| self.indices[f.position()].is_some())
            .map(|f| f.name())
    }

    fn value<'a>(&self, row: &'a [FitsValue], field: CanonicalField) -> Option<&'a FitsValue> {
        self.indices[field.position()].and_then(|i| row.get(i))
    }

    fn required<'a>(
        &self,
        row: &'a [FitsValue],
        field: CanonicalField,
    ) -> Result<&'a FitsValue, SchemaError> {
        self.value(row, field).ok_or(SchemaError::MissingField {
            raw: field.raw_name(),
            canonical: field.name(),
        })
    }

    fn float(&self, row: &[FitsValue], field: CanonicalField) -> Result<f64, SchemaError> {
        let value = self.required(row, field)?;
        value.as_f64().ok_or_else(|| invalid(field, value))
    }

    /// Convert one raw photometry row into a [`PhotometrySample`].
    pub fn map_row(&self, row: &[FitsValue]) -> Result<PhotometrySample, SchemaError> {
        use CanonicalField::*;

        let filter = self.required(row, Filter)?;
        let filter = filter
            .as_str()
            .map(normalize_band)
            .ok_or_else(|| invalid(Filter, filter))?;

        let field = match self.required(row, Field)? {
            FitsValue::Text(s) => s.trim().to_string(),
            other => other.to_string(),
        };

        let photflag = self.required(row, PhotFlag)?;
        let photflag = photflag
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| invalid(PhotFlag, photflag))?;

        let sim_magobs = match self.value(row, SimMagObs) {
            None => None,
            Some(v) => Some(v.as_f64().ok_or_else(|| invalid(SimMagObs, v))? as f32),
        };

        Ok(PhotometrySample {
            mjd: self.float(row, Mjd)?,
            filter,
            field,
            photflag,
            photprob: self.float(row, PhotProb)? as f32,
            flux: self.float(row, Flux)? as f32,
            flux_error: self.float(row, FluxError)? as f32,
            psf_sig1: self.float(row, PsfSig1)? as f32,
            sky_sig: self.float(row, SkySig)? as f32,
            zp: self.float(row, Zp)? as f32,
            sim_magobs,
        })
    }
}

fn invalid(field: CanonicalField, value: &FitsValue) -> SchemaError {
    SchemaError::InvalidValue {
        field: field.name(),
        value: value.to_string(),
    }
}
