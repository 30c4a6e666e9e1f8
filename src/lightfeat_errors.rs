use camino::Utf8PathBuf;
use thiserror::Error;

use crate::{
    constants::ObjectId,
    fits::FitsError,
    lightcurves::{schema::SchemaError, slicer::SliceError},
};

/// Opaque error produced by an external feature extractor.
pub type ExtractionError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum LightfeatError {
    #[error(
        "No data directory given and the `{0}` environment variable is not set; \
         pass `parent_dir` explicitly or export `{0}`"
    )]
    MissingDataRoot(&'static str),

    #[error("Invalid glob pattern for header discovery: {0}")]
    GlobPattern(String),

    #[error("UTF-8 Path error: {0}")]
    Utf8PathError(String),

    #[error("Error while parsing the FITS file {path}: {source}")]
    FitsParsing {
        path: Utf8PathBuf,
        #[source]
        source: FitsError,
    },

    #[error("{0} is not a header file (no `HEAD` marker in its name)")]
    NotAHeaderFile(Utf8PathBuf),

    #[error("Photometry file {photometry} paired with header {header} does not exist")]
    MissingPhotometryFile {
        header: Utf8PathBuf,
        photometry: Utf8PathBuf,
    },

    #[error("Column '{column}' not found in {path}")]
    MissingColumn { path: Utf8PathBuf, column: String },

    #[error("Photometry schema mismatch in {path}: {source}")]
    SchemaMismatch {
        path: Utf8PathBuf,
        #[source]
        source: SchemaError,
    },

    #[error("Invalid photometry range for object {snid} in {path}: {source}")]
    SliceOutOfRange {
        path: Utf8PathBuf,
        snid: ObjectId,
        #[source]
        source: SliceError,
    },

    #[error("Unable to read a model number after the `MODEL` marker in {0}")]
    ModelNumber(Utf8PathBuf),

    #[error("Model {model} does not resolve to a classification column in {path}")]
    UnknownModelColumn { path: Utf8PathBuf, model: u32 },

    #[error("Invalid value in column '{column}' of {path}: {reason}")]
    InvalidHeaderValue {
        path: Utf8PathBuf,
        column: String,
        reason: String,
    },

    #[error("Object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("Unable to use cached artifact {path}: {reason}")]
    CacheIo { path: Utf8PathBuf, reason: String },

    #[error("Extractor '{0}' did not produce the PCA components required for caching")]
    MissingAuxiliary(String),

    #[error("Feature extraction failed: {0}")]
    Extraction(ExtractionError),

    #[error("Invalid feature table: {0}")]
    InvalidFeatureTable(String),

    #[error("Unable to build the parse thread pool: {0}")]
    ThreadPool(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),
}

impl PartialEq for LightfeatError {
    fn eq(&self, other: &Self) -> bool {
        use LightfeatError::*;
        match (self, other) {
            (MissingDataRoot(a), MissingDataRoot(b)) => a == b,
            (GlobPattern(a), GlobPattern(b)) => a == b,
            (Utf8PathError(a), Utf8PathError(b)) => a == b,
            (
                FitsParsing {
                    path: a,
                    source: sa,
                },
                FitsParsing {
                    path: b,
                    source: sb,
                },
            ) => a == b && sa == sb,
            (
                MissingPhotometryFile {
                    header: a,
                    photometry: pa,
                },
                MissingPhotometryFile {
                    header: b,
                    photometry: pb,
                },
            ) => a == b && pa == pb,
            (
                MissingColumn {
                    path: a,
                    column: ca,
                },
                MissingColumn {
                    path: b,
                    column: cb,
                },
            ) => a == b && ca == cb,
            (
                SchemaMismatch {
                    path: a,
                    source: sa,
                },
                SchemaMismatch {
                    path: b,
                    source: sb,
                },
            ) => a == b && sa == sb,
            (
                SliceOutOfRange {
                    path: a,
                    snid: ia,
                    source: sa,
                },
                SliceOutOfRange {
                    path: b,
                    snid: ib,
                    source: sb,
                },
            ) => a == b && ia == ib && sa == sb,
            (NotAHeaderFile(a), NotAHeaderFile(b)) => a == b,
            (ModelNumber(a), ModelNumber(b)) => a == b,
            (
                UnknownModelColumn { path: a, model: ma },
                UnknownModelColumn { path: b, model: mb },
            ) => a == b && ma == mb,
            (
                InvalidHeaderValue {
                    path: a,
                    column: ca,
                    ..
                },
                InvalidHeaderValue {
                    path: b,
                    column: cb,
                    ..
                },
            ) => a == b && ca == cb,
            (ObjectNotFound(a), ObjectNotFound(b)) => a == b,
            (CacheIo { path: a, .. }, CacheIo { path: b, .. }) => a == b,
            (MissingAuxiliary(a), MissingAuxiliary(b)) => a == b,
            (InvalidFeatureTable(a), InvalidFeatureTable(b)) => a == b,
            (ThreadPool(a), ThreadPool(b)) => a == b,

            // Opaque payloads: equal if same variant
            (Extraction(_), Extraction(_)) => true,
            (IoError(_), IoError(_)) => true,

            _ => false,
        }
    }
}
