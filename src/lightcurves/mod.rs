//! # Light-curves: ingestion and per-object storage
//!
//! Facilities to **discover**, **parse**, and **store** simulated light-curves grouped by
//! object. The central type is [`CadenceData`](crate::lightcurves::cadence_data::CadenceData),
//! an insertion-ordered map from [`ObjectId`] to [`Lightcurve`] built from every
//! header/photometry pair found under a cadence directory.
//!
//! Modules
//! -----------------
//! * [`slicer`](crate::lightcurves::slicer) – 1-based inclusive header ranges → photometry sub-slices.
//! * [`schema`](crate::lightcurves::schema) – Raw simulator columns → canonical schema, band normalization.
//! * [`model_column`](crate::lightcurves::model_column) – Model number from the path, classification-column lookup.
//! * [`photometry_reader`](crate::lightcurves::photometry_reader) – One header/photometry pair → light-curves.
//! * [`cadence_data`](crate::lightcurves::cadence_data) – Discovery, aggregation, load policy, parallel parsing.
//! * *(crate-private)* `progress_bar` – Optional progress UI when the `progress` feature is enabled.
//!
//! Data Model
//! -----------------
//! * **Key:** [`ObjectId`] (header `SNID`).
//! * **Value:** [`Lightcurve`] = [`LightcurveMeta`] + `Vec<PhotometrySample>`.
//! * **Set:** [`LightcurveSet`] = `IndexMap<ObjectId, Lightcurve, ahash::RandomState>`, which
//!   keeps discovery order for [`list_object_ids`](crate::lightcurves::cadence_data::CadenceData::list_object_ids).
//!
//! Ordering
//! -----------------
//! * Samples keep photometry-file order; sorting by time is not enforced here.
//! * A duplicate identifier replaces the earlier light-curve and keeps its position.
use ahash::RandomState;
use indexmap::IndexMap;

use crate::{
    constants::{Degree, ObjectId, ZP_SYSTEM},
    fits::FitsValue,
};

pub mod cadence_data;
pub mod model_column;
pub mod photometry_reader;
pub mod schema;
pub mod slicer;

#[cfg(feature = "progress")]
pub(crate) mod progress_bar;

pub use schema::PhotometrySample;

/// Object-level metadata copied from the header file.
#[derive(Debug, Clone, PartialEq)]
pub struct LightcurveMeta {
    pub snid: ObjectId,
    pub ra: Degree,
    pub dec: Degree,
    /// Value of the model-specific classification column.
    pub class_label: FitsValue,
    /// True redshift (`SIM_REDSHIFT_CMB`).
    pub redshift: f64,
}

/// The light-curve of one object.
#[derive(Debug, Clone, PartialEq)]
pub struct Lightcurve {
    pub meta: LightcurveMeta,
    pub samples: Vec<PhotometrySample>,
}

impl Lightcurve {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Zero-point system of every flux of the light-curve.
    pub fn zpsys(&self) -> &'static str {
        ZP_SYSTEM
    }

    /// Samples observed through `band` (canonical name, e.g. `"lsstr"`).
    pub fn band<'a>(&'a self, band: &'a str) -> impl Iterator<Item = &'a PhotometrySample> + 'a {
        self.samples.iter().filter(move |s| s.filter == band)
    }
}

/// Light-curves keyed by object, in discovery order.
///
/// Uses [`ahash`](https://docs.rs/ahash) for fast hashing.
pub type LightcurveSet = IndexMap<ObjectId, Lightcurve, RandomState>;
