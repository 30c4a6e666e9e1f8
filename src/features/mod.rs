//! # Feature extraction: interfaces and on-disk memoization
//!
//! The crate does not implement feature-extraction algorithms. It drives external ones through
//! the [`Extractor`] trait against any [`Dataset`] (typically a
//! [`CadenceData`](crate::lightcurves::cadence_data::CadenceData)) and memoizes their output
//! with [`FeatureCache`](crate::features::feature_cache::FeatureCache).
//!
//! Modules
//! -----------------
//! * [`cache_key`](crate::features::cache_key) – Deterministic `{survey}_{method}_{digest}` fingerprints.
//! * [`table_io`](crate::features::table_io) – Text formats of cached tables and PCA artifacts.
//! * [`feature_cache`](crate::features::feature_cache) – HIT/MISS orchestration.
//!
//! Data Model
//! -----------------
//! * [`FeatureArgs`] – Keyword arguments of an extraction, ordered by key.
//! * [`FeatureTable`] – One row per object, named `f64` columns, table metadata.
//! * [`PcaComponents`] – Auxiliary output of the [`MethodFamily::Wavelet`] family.
//! * [`Extraction`] – What an [`Extractor`] returns: a table and optional PCA components.
use std::collections::{btree_map::Entry, BTreeMap};

use itertools::Itertools;
use nalgebra::{DMatrix, DVector, RowDVector};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    constants::ObjectId,
    lightcurves::Lightcurve,
    lightfeat_errors::{ExtractionError, LightfeatError},
};

pub mod cache_key;
pub mod feature_cache;
pub mod table_io;

/// Read access to a light-curve collection, as seen by an [`Extractor`].
pub trait Dataset {
    /// Name of the survey the light-curves come from; part of every cache fingerprint.
    fn survey_name(&self) -> &str;

    /// Canonical band names present in the survey.
    fn filter_set(&self) -> &[String];

    /// Object identifiers, in a stable order.
    fn list_object_ids(&self) -> Vec<ObjectId>;

    fn get_lightcurve(&self, id: &ObjectId) -> Result<&Lightcurve, LightfeatError>;
}

/// Broad kind of extraction method. Drives cache behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MethodFamily {
    /// Model-fitting methods; they manage their own `save_output` default.
    Parametric,
    /// Wavelet decomposition followed by PCA; produces [`PcaComponents`].
    Wavelet,
    #[default]
    Generic,
}

impl MethodFamily {
    /// Whether extractions of this family produce [`PcaComponents`].
    pub fn has_auxiliary(&self) -> bool {
        matches!(self, MethodFamily::Wavelet)
    }
}

/// A feature-extraction method.
///
/// Implementations may emit `tracing` events; the cache silences them during extraction.
pub trait Extractor {
    /// Method name, used in cache fingerprints (e.g. `"WaveletFeatures"`).
    fn method(&self) -> &str;

    fn family(&self) -> MethodFamily {
        MethodFamily::Generic
    }

    fn extract_features(
        &mut self,
        data: &dyn Dataset,
        args: &FeatureArgs,
    ) -> Result<Extraction, ExtractionError>;
}

/// Keyword arguments of an extraction.
///
/// Keys are kept sorted, so iteration and serialization do not depend on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureArgs(BTreeMap<String, Value>);

impl FeatureArgs {
    pub fn new() -> Self {
        FeatureArgs::default()
    }

    /// Builder-style insertion.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Insert `value` only if `key` is absent. Returns `true` if it was inserted.
    pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        match self.0.entry(key.into()) {
            Entry::Vacant(slot) => {
                slot.insert(value.into());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Copy every entry of `other` into `self`, overwriting existing keys.
    pub fn update(&mut self, other: &FeatureArgs) {
        self.0
            .extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FeatureArgs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        FeatureArgs(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Extracted features: one row per object, one column per feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    object_ids: Vec<ObjectId>,
    columns: Vec<String>,
    values: DMatrix<f64>,
    /// Table-level metadata; the cache stores the extraction arguments here.
    pub meta: FeatureArgs,
}

impl FeatureTable {
    /// Build a table, checking that `values` is `object_ids.len() × columns.len()`.
    ///
    /// Return
    /// ----------
    /// * [`LightfeatError::InvalidFeatureTable`] on a shape mismatch or a duplicated column name.
    pub fn new(
        object_ids: Vec<ObjectId>,
        columns: Vec<String>,
        values: DMatrix<f64>,
    ) -> Result<Self, LightfeatError> {
        if values.nrows() != object_ids.len() || values.ncols() != columns.len() {
            return Err(LightfeatError::InvalidFeatureTable(format!(
                "{} objects × {} columns declared, values are {} × {}",
                object_ids.len(),
                columns.len(),
                values.nrows(),
                values.ncols()
            )));
        }
        if let Some(dup) = columns.iter().duplicates().next() {
            return Err(LightfeatError::InvalidFeatureTable(format!(
                "duplicated column '{dup}'"
            )));
        }
        Ok(FeatureTable {
            object_ids,
            columns,
            values,
            meta: FeatureArgs::default(),
        })
    }

    pub fn with_meta(mut self, meta: FeatureArgs) -> Self {
        self.meta = meta;
        self
    }

    pub fn object_ids(&self) -> &[ObjectId] {
        &self.object_ids
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    /// Number of rows (objects).
    pub fn len(&self) -> usize {
        self.object_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_ids.is_empty()
    }

    /// Feature row of `id`, if present.
    pub fn row(&self, id: &ObjectId) -> Option<RowDVector<f64>> {
        let i = self.object_ids.iter().position(|o| o == id)?;
        Some(self.values.row(i).into_owned())
    }

    /// Values of the feature column `name`, if present.
    pub fn column(&self, name: &str) -> Option<DVector<f64>> {
        let j = self.columns.iter().position(|c| c == name)?;
        Some(self.values.column(j).into_owned())
    }
}

/// PCA output of the wavelet family, persisted next to the cached table.
#[derive(Debug, Clone, PartialEq)]
pub struct PcaComponents {
    pub eigenvalues: DVector<f64>,
    pub eigenvectors: DMatrix<f64>,
    pub mean: DVector<f64>,
}

/// Output of [`Extractor::extract_features`].
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub table: FeatureTable,
    pub auxiliary: Option<PcaComponents>,
}

impl Extraction {
    pub fn new(table: FeatureTable) -> Self {
        Extraction {
            table,
            auxiliary: None,
        }
    }

    pub fn with_auxiliary(mut self, pca: PcaComponents) -> Self {
        self.auxiliary = Some(pca);
        self
    }
}
