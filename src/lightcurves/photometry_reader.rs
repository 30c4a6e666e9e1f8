//! # Header/photometry pair reader
//!
//! Simulated light-curves come as file pairs in the same directory:
//!
//! * `*HEAD.FITS` – one row per object: `SNID`, `RA`, `DECL`, `SIM_REDSHIFT_CMB`, the
//!   classification columns, and the 1-based inclusive photometry range
//!   `PTROBS_MIN`..=`PTROBS_MAX`.
//! * `*PHOT.FITS` – the flat photometry array of every object of the header file.
//!
//! [`read_photometry_pair`] turns one pair into `(ObjectId, Lightcurve)` entries, in header
//! row order. Every failure is fatal for the file and names its path.
//!
//! ## Processing steps
//! -----------------
//! 1. Derive the photometry path ([`photometry_path_for`]) and check it exists.
//! 2. Decode both binary tables.
//! 3. Project the photometry columns onto the canonical schema (once per file).
//! 4. Resolve the model number from the path and the classification column.
//! 5. For each header row, slice `[PTROBS_MIN - 1, PTROBS_MAX)` and map every sample.
use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::{
    constants::{ObjectId, HEADER_MARKER, PHOTOMETRY_MARKER},
    fits::{read_bintable, BinTable, FitsValue},
    lightcurves::{
        model_column::{model_number_from_path, ClassColumns},
        schema::SchemaMapper,
        slicer::slice_object_range,
        Lightcurve, LightcurveMeta,
    },
    lightfeat_errors::LightfeatError,
};

/// Header column holding the object identifier
pub const SNID_COLUMN: &str = "SNID";
/// Header column holding the right ascension (degrees)
pub const RA_COLUMN: &str = "RA";
/// Header column holding the declination (degrees)
pub const DEC_COLUMN: &str = "DECL";
/// Header column holding the true (CMB-frame) redshift
pub const REDSHIFT_COLUMN: &str = "SIM_REDSHIFT_CMB";
/// Header column holding the first photometry row of an object (1-based)
pub const PTROBS_MIN_COLUMN: &str = "PTROBS_MIN";
/// Header column holding the last photometry row of an object (1-based, inclusive)
pub const PTROBS_MAX_COLUMN: &str = "PTROBS_MAX";

/// Path of the photometry file paired with `header`.
///
/// The last [`HEADER_MARKER`] of the file name is replaced by [`PHOTOMETRY_MARKER`];
/// the directory is unchanged.
///
/// Return
/// ----------
/// * [`LightfeatError::NotAHeaderFile`] if the file name carries no marker.
pub fn photometry_path_for(header: &Utf8Path) -> Result<Utf8PathBuf, LightfeatError> {
    let not_header = || LightfeatError::NotAHeaderFile(header.to_path_buf());

    let file_name = header.file_name().ok_or_else(not_header)?;
    let pos = file_name.rfind(HEADER_MARKER).ok_or_else(not_header)?;
    let phot_name = format!(
        "{}{}{}",
        &file_name[..pos],
        PHOTOMETRY_MARKER,
        &file_name[pos + HEADER_MARKER.len()..]
    );
    Ok(header.with_file_name(phot_name))
}

/// Typed accessors over the header table of one file, with the path attached to errors.
struct HeaderColumns<'a> {
    path: &'a Utf8Path,
    table: &'a BinTable,
}

impl HeaderColumns<'_> {
    fn index(&self, column: &str) -> Result<usize, LightfeatError> {
        self.table
            .column_index(column)
            .ok_or_else(|| LightfeatError::MissingColumn {
                path: self.path.to_path_buf(),
                column: column.to_string(),
            })
    }

    fn invalid(&self, column: usize, reason: String) -> LightfeatError {
        LightfeatError::InvalidHeaderValue {
            path: self.path.to_path_buf(),
            column: self.table.columns[column].name.clone(),
            reason,
        }
    }

    fn float(&self, row: &[FitsValue], column: usize) -> Result<f64, LightfeatError> {
        row[column]
            .as_f64()
            .ok_or_else(|| self.invalid(column, format!("expected a number, found '{}'", row[column])))
    }

    fn integer(&self, row: &[FitsValue], column: usize) -> Result<i64, LightfeatError> {
        row[column]
            .as_i64()
            .ok_or_else(|| self.invalid(column, format!("expected an integer, found '{}'", row[column])))
    }

    fn object_id(&self, row: &[FitsValue], column: usize) -> Result<ObjectId, LightfeatError> {
        match &row[column] {
            FitsValue::Int(i) => Ok(ObjectId::Int(*i)),
            FitsValue::Text(s) => Ok(ObjectId::String(s.trim().to_string())),
            other => Err(self.invalid(column, format!("'{other}' is not an identifier"))),
        }
    }
}

/// Read one header/photometry pair.
///
/// Arguments
/// -----------------
/// * `header_path`: path of the `*HEAD.*` file.
/// * `class_columns`: rule selecting the classification column from the model number.
///
/// Return
/// ----------
/// * The light-curves of every header row, in row order.
/// * Any [`LightfeatError`] parse variant naming `header_path` (or the photometry path).
///
/// See also
/// ------------
/// * [`slice_object_range`] – 1-based inclusive → 0-based half-open conversion.
/// * [`SchemaMapper::project`] – Canonical column projection.
/// * [`ClassColumns::resolve`] – Model → classification column.
pub fn read_photometry_pair(
    header_path: &Utf8Path,
    class_columns: &ClassColumns,
) -> Result<Vec<(ObjectId, Lightcurve)>, LightfeatError> {
    let phot_path = photometry_path_for(header_path)?;
    if !phot_path.is_file() {
        return Err(LightfeatError::MissingPhotometryFile {
            header: header_path.to_path_buf(),
            photometry: phot_path,
        });
    }

    let header = read_bintable(header_path)?;
    let photometry = read_bintable(&phot_path)?;
    debug!(
        header = %header_path,
        objects = header.num_rows(),
        samples = photometry.num_rows(),
        "read photometry pair"
    );

    let projection =
        SchemaMapper::project(&photometry.columns).map_err(|source| {
            LightfeatError::SchemaMismatch {
                path: phot_path.clone(),
                source,
            }
        })?;

    let model = model_number_from_path(header_path)?;
    let class_idx = class_columns.resolve(&header, model, header_path)?;

    let cols = HeaderColumns {
        path: header_path,
        table: &header,
    };
    let snid_idx = cols.index(SNID_COLUMN)?;
    let ra_idx = cols.index(RA_COLUMN)?;
    let dec_idx = cols.index(DEC_COLUMN)?;
    let z_idx = cols.index(REDSHIFT_COLUMN)?;
    let min_idx = cols.index(PTROBS_MIN_COLUMN)?;
    let max_idx = cols.index(PTROBS_MAX_COLUMN)?;

    let mut lightcurves = Vec::with_capacity(header.num_rows());
    for record in &header.rows {
        let snid = cols.object_id(record, snid_idx)?;
        let start = cols.integer(record, min_idx)?;
        let end = cols.integer(record, max_idx)?;

        let raw_samples = slice_object_range(&photometry.rows, start, end).map_err(|source| {
            LightfeatError::SliceOutOfRange {
                path: header_path.to_path_buf(),
                snid: snid.clone(),
                source,
            }
        })?;

        let samples = raw_samples
            .iter()
            .map(|row| projection.map_row(row))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| LightfeatError::SchemaMismatch {
                path: phot_path.clone(),
                source,
            })?;

        let meta = LightcurveMeta {
            snid: snid.clone(),
            ra: cols.float(record, ra_idx)?,
            dec: cols.float(record, dec_idx)?,
            class_label: record[class_idx].clone(),
            redshift: cols.float(record, z_idx)?,
        };
        lightcurves.push((snid, Lightcurve { meta, samples }));
    }

    Ok(lightcurves)
}

#[cfg(test)]
mod photometry_reader_test {
    use super::*;

    #[test]
    fn test_photometry_path_for() {
        let header = Utf8Path::new("/sims/HEAD_DIR/LSST_WFD_NONIa-0004_HEAD.FITS");
        assert_eq!(
            photometry_path_for(header).unwrap(),
            Utf8PathBuf::from("/sims/HEAD_DIR/LSST_WFD_NONIa-0004_PHOT.FITS")
        );

        let header = Utf8Path::new("run/HEAD.fits.gz");
        assert_eq!(
            photometry_path_for(header).unwrap(),
            Utf8PathBuf::from("run/PHOT.fits.gz")
        );
    }

    #[test]
    fn test_photometry_path_requires_marker() {
        let header = Utf8Path::new("/sims/LSST_WFD_NONIa-0004.FITS");
        assert_eq!(
            photometry_path_for(header),
            Err(LightfeatError::NotAHeaderFile(header.to_path_buf()))
        );
    }
}
