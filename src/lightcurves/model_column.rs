//! Classification-label column lookup.
//!
//! Each simulated physical model stores the object class under a different header column.
//! The model number is encoded in the directory layout (`.../LSST_WFD_MODEL42/...`) and
//! selects the column. [`ClassColumns`] makes that selection explicit and validated:
//!
//! * [`ClassColumns::Positional`] – model `m` selects the header column at position `m`
//!   (0-based), the simulator convention.
//! * [`ClassColumns::Explicit`] – a caller-supplied `model → column name` table.
use std::collections::HashMap;

use camino::Utf8Path;

use crate::{constants::MODEL_MARKER, fits::BinTable, lightfeat_errors::LightfeatError};

/// Extract the model number from a header path.
///
/// The number is the text between the **last** [`MODEL_MARKER`] in the path and the next
/// path separator, parsed as an unsigned integer.
///
/// Arguments
/// -----------------
/// * `path`: path of a header file, e.g. `sims/alt_sched/LSST_WFD_MODEL42/x_HEAD.FITS`.
///
/// Return
/// ----------
/// * The model number (`42` above).
/// * [`LightfeatError::ModelNumber`] if no marker is present or the text after it is not
///   an integer.
pub fn model_number_from_path(path: &Utf8Path) -> Result<u32, LightfeatError> {
    let err = || LightfeatError::ModelNumber(path.to_path_buf());

    let (_, after) = path.as_str().rsplit_once(MODEL_MARKER).ok_or_else(err)?;
    let segment = after.split(['/', '\\']).next().unwrap_or_default();
    segment.parse::<u32>().map_err(|_| err())
}

/// Rule used to pick the classification column of a header table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClassColumns {
    /// Model `m` selects the header column at position `m`.
    #[default]
    Positional,
    /// Explicit model → column-name table.
    Explicit(HashMap<u32, String>),
}

impl ClassColumns {
    /// Resolve the classification column of `header` for `model`.
    ///
    /// Return
    /// ----------
    /// * The position of the column in `header`.
    /// * [`LightfeatError::UnknownModelColumn`] if the model has no entry or its column
    ///   does not exist in the table.
    pub fn resolve(
        &self,
        header: &BinTable,
        model: u32,
        path: &Utf8Path,
    ) -> Result<usize, LightfeatError> {
        let unknown = || LightfeatError::UnknownModelColumn {
            path: path.to_path_buf(),
            model,
        };

        match self {
            ClassColumns::Positional => {
                let index = model as usize;
                if index < header.columns.len() {
                    Ok(index)
                } else {
                    Err(unknown())
                }
            }
            ClassColumns::Explicit(table) => table
                .get(&model)
                .and_then(|name| header.column_index(name))
                .ok_or_else(unknown),
        }
    }
}

#[cfg(test)]
mod model_column_test {
    use super::*;
    use crate::fits::{ColumnDescriptor, ColumnFormat};

    fn header() -> BinTable {
        BinTable::new(vec![
            ColumnDescriptor::new("SNID", ColumnFormat::Int64),
            ColumnDescriptor::new("SNTYPE", ColumnFormat::Int32),
            ColumnDescriptor::new("SIM_TYPE_INDEX", ColumnFormat::Int32),
        ])
    }

    #[test]
    fn test_model_number_from_path() {
        let path = Utf8Path::new("/data/alt_sched/LSST_WFD_MODEL42/LSST_WFD_NONIa-0001_HEAD.FITS");
        assert_eq!(model_number_from_path(path).unwrap(), 42);

        // The last marker wins.
        let path = Utf8Path::new("/MODEL1/sims/run_MODEL7/part_HEAD.FITS");
        assert_eq!(model_number_from_path(path).unwrap(), 7);
    }

    #[test]
    fn test_model_number_errors() {
        for p in [
            "/data/alt_sched/LSST_WFD/part_HEAD.FITS",
            "/data/LSST_WFD_MODELx/part_HEAD.FITS",
            "/data/LSST_WFD_NONIaMODEL0-0001_HEAD.FITS",
        ] {
            let path = Utf8Path::new(p);
            assert_eq!(
                model_number_from_path(path),
                Err(LightfeatError::ModelNumber(path.to_path_buf()))
            );
        }
    }

    #[test]
    fn test_positional_lookup() {
        let path = Utf8Path::new("x_HEAD.FITS");
        let cols = ClassColumns::Positional;
        assert_eq!(cols.resolve(&header(), 2, path).unwrap(), 2);
        assert_eq!(
            cols.resolve(&header(), 3, path),
            Err(LightfeatError::UnknownModelColumn {
                path: path.to_path_buf(),
                model: 3
            })
        );
    }

    #[test]
    fn test_explicit_lookup() {
        let path = Utf8Path::new("x_HEAD.FITS");
        let cols = ClassColumns::Explicit(HashMap::from([
            (42, "SNTYPE".to_string()),
            (90, "MISSING".to_string()),
        ]));
        assert_eq!(cols.resolve(&header(), 42, path).unwrap(), 1);
        assert!(cols.resolve(&header(), 90, path).is_err());
        assert!(cols.resolve(&header(), 1, path).is_err());
    }
}
