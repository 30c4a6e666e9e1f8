//! # Minimal FITS binary-table I/O
//!
//! The simulated light-curves are distributed as FITS files whose first extension is a
//! binary table (`XTENSION = 'BINTABLE'`). This module reads (and writes) exactly that
//! layout: a data-less primary HDU followed by one binary-table HDU.
//!
//! ## Overview
//! -----------------
//! * [`header`] – 80-byte card parsing/formatting, data-unit size computation.
//! * [`bintable`] – `TFORMn` formats and the big-endian row codec.
//! * [`BinTable`] – Row-oriented in-memory table with by-name column lookup.
//! * [`read_bintable`] / [`write_bintable`] – Path-based entry points that attach the
//!   file path to any parse error ([`LightfeatError::FitsParsing`]). Gzip-compressed files
//!   (`*.FITS.gz`) are recognised by their magic bytes and decompressed on read.
//!
//! ## Limitations
//! -----------------
//! * Only the **first** extension is decoded; later HDUs are ignored.
//! * Vector columns (repeat count > 1, except `rA`), variable-length arrays, and
//!   `TSCALn`/`TZEROn` scaling are not supported and are reported as
//!   [`FitsError::UnsupportedFormat`] (scaling keywords are ignored).
//!
//! ## See also
//! ------------
//! * [`crate::lightcurves::photometry_reader`] – Consumer of the decoded tables.
use std::{fs, io::Read};

use camino::Utf8Path;
use flate2::bufread::MultiGzDecoder;
use thiserror::Error;

use crate::lightfeat_errors::LightfeatError;

pub mod bintable;
pub mod header;

pub use bintable::{ColumnDescriptor, ColumnFormat};
pub use header::{CardValue, Header};

use header::{padded_len, MAX_KEYWORD_INDEX};

/// Low-level FITS decoding errors. Path context is added by the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitsError {
    #[error("Unexpected end of data: {needed} bytes needed, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("Missing mandatory keyword {0}")]
    MissingKeyword(String),

    #[error("Malformed header card: {0}")]
    InvalidCard(String),

    #[error("Invalid value for keyword {keyword}: {value}")]
    InvalidKeywordValue { keyword: String, value: String },

    #[error("Header card too long for keyword {0}")]
    CardTooLong(String),

    #[error("No extension HDU after the primary HDU")]
    MissingExtension,

    #[error("Expected a BINTABLE extension, found '{0}'")]
    NotBinTable(String),

    #[error("Unsupported column format TFORM = '{0}'")]
    UnsupportedFormat(String),

    #[error("Row width mismatch: NAXIS1 = {declared}, columns add up to {computed}")]
    RowWidthMismatch { declared: usize, computed: usize },

    #[error("Row {row} does not match the table layout at column '{column}'")]
    ValueMismatch { row: usize, column: String },

    #[error("Corrupt gzip stream: {0}")]
    Gzip(String),
}

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A single cell of a binary table.
#[derive(Debug, Clone, PartialEq)]
pub enum FitsValue {
    Logical(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FitsValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FitsValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value, integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FitsValue::Int(i) => Some(*i as f64),
            FitsValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FitsValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for FitsValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitsValue::Logical(b) => write!(f, "{}", if *b { "T" } else { "F" }),
            FitsValue::Int(i) => write!(f, "{i}"),
            FitsValue::Float(x) => write!(f, "{x}"),
            FitsValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Row-oriented binary table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BinTable {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Vec<FitsValue>>,
}

impl BinTable {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        BinTable {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Position of the column named `name` (exact match).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Width in bytes of one encoded row.
    pub fn row_width(&self) -> usize {
        self.columns.iter().map(|c| c.format.width()).sum()
    }

    /// Decode a complete FITS file: primary HDU (skipped) then the first BINTABLE extension.
    ///
    /// Arguments
    /// -----------------
    /// * `input`: the full content of a FITS file.
    ///
    /// Return
    /// ----------
    /// * The decoded table, or a [`FitsError`] describing the first inconsistency found.
    pub fn from_bytes(input: &[u8]) -> Result<Self, FitsError> {
        let (rest, primary) = Header::parse(input)?;
        let primary_data = primary.data_len()?;
        if rest.len() < primary_data {
            return Err(FitsError::Truncated {
                needed: primary_data,
                available: rest.len(),
            });
        }
        let primary_len = padded_len(primary_data);
        if rest.len() < primary_len {
            return Err(FitsError::Truncated {
                needed: primary_len,
                available: rest.len(),
            });
        }
        let rest = &rest[primary_len..];
        if rest.is_empty() {
            return Err(FitsError::MissingExtension);
        }

        let (data, ext) = Header::parse(rest)?;
        let xtension = ext.text("XTENSION")?;
        if xtension != "BINTABLE" {
            return Err(FitsError::NotBinTable(xtension.to_string()));
        }

        let tfields = ext.integer("TFIELDS")?;
        if !(0..=MAX_KEYWORD_INDEX).contains(&tfields) {
            return Err(FitsError::InvalidKeywordValue {
                keyword: "TFIELDS".into(),
                value: tfields.to_string(),
            });
        }
        let mut columns = Vec::with_capacity(tfields as usize);
        for i in 1..=tfields {
            let name = ext.text(&format!("TTYPE{i}"))?.trim().to_string();
            let format = ColumnFormat::parse(ext.text(&format!("TFORM{i}"))?)?;
            columns.push(ColumnDescriptor { name, format });
        }

        let declared = to_usize("NAXIS1", ext.integer("NAXIS1")?)?;
        let n_rows = to_usize("NAXIS2", ext.integer("NAXIS2")?)?;
        let computed = columns.iter().map(|c| c.format.width()).sum();
        if declared != computed {
            return Err(FitsError::RowWidthMismatch { declared, computed });
        }

        let rows = bintable::decode_rows(&columns, declared, n_rows, data)?;
        Ok(BinTable { columns, rows })
    }

    /// Encode the table as a FITS file with an empty primary HDU.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FitsError> {
        let mut primary = Header::default();
        primary.push("SIMPLE", CardValue::Logical(true));
        primary.push("BITPIX", CardValue::Integer(8));
        primary.push("NAXIS", CardValue::Integer(0));
        primary.push("EXTEND", CardValue::Logical(true));

        let row_width = self.row_width();
        let mut ext = Header::default();
        ext.push("XTENSION", CardValue::Text("BINTABLE".into()));
        ext.push("BITPIX", CardValue::Integer(8));
        ext.push("NAXIS", CardValue::Integer(2));
        ext.push("NAXIS1", CardValue::Integer(row_width as i64));
        ext.push("NAXIS2", CardValue::Integer(self.rows.len() as i64));
        ext.push("PCOUNT", CardValue::Integer(0));
        ext.push("GCOUNT", CardValue::Integer(1));
        ext.push("TFIELDS", CardValue::Integer(self.columns.len() as i64));
        for (i, column) in self.columns.iter().enumerate() {
            ext.push(format!("TTYPE{}", i + 1), CardValue::Text(column.name.clone()));
            ext.push(format!("TFORM{}", i + 1), CardValue::Text(column.format.tform()));
        }

        let mut out = primary.to_bytes()?;
        out.extend(ext.to_bytes()?);

        let data_start = out.len();
        for (r, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(FitsError::ValueMismatch {
                    row: r,
                    column: format!("<{} values for {} columns>", row.len(), self.columns.len()),
                });
            }
            for (column, value) in self.columns.iter().zip(row) {
                if !column.format.encode(value, &mut out) {
                    return Err(FitsError::ValueMismatch {
                        row: r,
                        column: column.name.clone(),
                    });
                }
            }
        }
        let data_len = out.len() - data_start;
        out.resize(data_start + padded_len(data_len), 0);
        Ok(out)
    }
}

fn to_usize(keyword: &str, value: i64) -> Result<usize, FitsError> {
    usize::try_from(value).map_err(|_| FitsError::InvalidKeywordValue {
        keyword: keyword.to_string(),
        value: value.to_string(),
    })
}

/// Decompress `bytes` if they start with the gzip magic, otherwise return them unchanged.
fn maybe_gunzip(bytes: Vec<u8>) -> Result<Vec<u8>, FitsError> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(bytes);
    }
    let mut out = Vec::new();
    MultiGzDecoder::new(bytes.as_slice())
        .read_to_end(&mut out)
        .map_err(|e| FitsError::Gzip(e.to_string()))?;
    Ok(out)
}

/// Read the first binary-table extension of the FITS file at `path`, gzipped or not.
pub fn read_bintable(path: &Utf8Path) -> Result<BinTable, LightfeatError> {
    let bytes = fs::read(path)?;
    maybe_gunzip(bytes)
        .and_then(|bytes| BinTable::from_bytes(&bytes))
        .map_err(|source| LightfeatError::FitsParsing {
            path: path.to_path_buf(),
            source,
        })
}

/// Write `table` to `path` as a FITS file (empty primary HDU + one BINTABLE).
pub fn write_bintable(path: &Utf8Path, table: &BinTable) -> Result<(), LightfeatError> {
    let bytes = table
        .to_bytes()
        .map_err(|source| LightfeatError::FitsParsing {
            path: path.to_path_buf(),
            source,
        })?;
    fs::write(path, bytes)?;
    Ok(())
}
