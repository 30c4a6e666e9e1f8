//! # Text formats of the feature cache
//!
//! ## Feature tables
//!
//! An ECSV-flavoured layout: `#`-prefixed header lines followed by a CSV body.
//!
//! ```text
//! # %ECSV-lightfeat 1.0
//! # {"version":1,"id_kind":"int","meta":{"ngp":100,"save_output":false}}
//! object_id,c0,c1
//! 101,0.25,-1.5
//! 102,0.5,3.0
//! ```
//!
//! * The JSON header carries the format version, the kind of the object identifiers and the
//!   table metadata ([`FeatureArgs`]). Tables mixing integer and string identifiers also list
//!   the rows holding a string, so `"42"` never reads back as `42`.
//! * Only the first two lines are header; a body row may start with `#`.
//! * Values are written with Rust's shortest round-trip formatting, so a table reads back
//!   bit-identical (`NaN` and `inf` included).
//!
//! ## Auxiliary arrays
//!
//! Vectors and matrices are plain whitespace-separated text, one matrix row (or one vector
//! element) per line; lines starting with `#` are comments.
//!
//! Every failure, on read or write, is a [`LightfeatError::CacheIo`] naming the file.
use std::{
    fmt::Display,
    fs::{self, File},
    io::{BufWriter, Write},
};

use camino::Utf8Path;
use itertools::Itertools;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::{
    constants::ObjectId,
    features::{FeatureArgs, FeatureTable},
    lightfeat_errors::LightfeatError,
};

/// First line of every cached table.
pub const TABLE_MAGIC: &str = "# %ECSV-lightfeat 1.0";

/// Name of the identifier column.
pub const ID_COLUMN: &str = "object_id";

const FORMAT_VERSION: u32 = 1;

/// How the identifier column is read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum IdKind {
    Int,
    String,
    /// Integers and strings; the header lists the string rows.
    Mixed,
}

impl IdKind {
    fn of(ids: &[ObjectId]) -> Self {
        let ints = ids.iter().filter(|id| id.is_int()).count();
        if ints == ids.len() {
            IdKind::Int
        } else if ints == 0 {
            IdKind::String
        } else {
            IdKind::Mixed
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TableHeader {
    version: u32,
    id_kind: IdKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    string_rows: Vec<usize>,
    #[serde(default)]
    meta: FeatureArgs,
}

fn cache_io<E: Display>(path: &Utf8Path) -> impl FnOnce(E) -> LightfeatError + '_ {
    move |e| LightfeatError::CacheIo {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

/// Write `table` to `path`, replacing any existing file.
pub fn write_table(path: &Utf8Path, table: &FeatureTable) -> Result<(), LightfeatError> {
    let id_kind = IdKind::of(table.object_ids());
    let string_rows = match id_kind {
        IdKind::Mixed => table
            .object_ids()
            .iter()
            .positions(|id| !id.is_int())
            .collect(),
        _ => Vec::new(),
    };
    let header = TableHeader {
        version: FORMAT_VERSION,
        id_kind,
        string_rows,
        meta: table.meta.clone(),
    };
    let header_json = serde_json::to_string(&header).map_err(cache_io(path))?;

    let file = File::create(path).map_err(cache_io(path))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "{TABLE_MAGIC}").map_err(cache_io(path))?;
    writeln!(out, "# {header_json}").map_err(cache_io(path))?;

    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(std::iter::once(ID_COLUMN).chain(table.columns().iter().map(String::as_str)))
        .map_err(cache_io(path))?;
    for (i, id) in table.object_ids().iter().enumerate() {
        let row = table.values().row(i);
        let record = std::iter::once(id.to_string()).chain(row.iter().map(|v| v.to_string()));
        writer.write_record(record).map_err(cache_io(path))?;
    }
    writer.flush().map_err(cache_io(path))?;
    Ok(())
}

/// Read a table written by [`write_table`].
pub fn read_table(path: &Utf8Path) -> Result<FeatureTable, LightfeatError> {
    let content = fs::read_to_string(path).map_err(cache_io(path))?;
    let err = |reason: &str| LightfeatError::CacheIo {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let (magic, rest) = content.split_once('\n').unwrap_or((content.as_str(), ""));
    if magic.trim_end() != TABLE_MAGIC {
        return Err(err("missing table signature"));
    }
    let (header_line, body) = rest.split_once('\n').unwrap_or((rest, ""));
    let header_json = header_line
        .trim_end()
        .strip_prefix("# ")
        .ok_or_else(|| err("missing JSON header"))?;
    let header: TableHeader = serde_json::from_str(header_json).map_err(cache_io(path))?;
    if header.version != FORMAT_VERSION {
        return Err(err(&format!("unsupported format version {}", header.version)));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(body.as_bytes());

    let names = reader.headers().map_err(cache_io(path))?.clone();
    let mut names = names.iter();
    if names.next() != Some(ID_COLUMN) {
        return Err(err("first column is not the object identifier"));
    }
    let columns: Vec<String> = names.map(str::to_string).collect();

    let mut object_ids = Vec::new();
    let mut values = Vec::new();
    for record in reader.records() {
        let record = record.map_err(cache_io(path))?;
        let mut fields = record.iter();
        let raw_id = fields.next().ok_or_else(|| err("empty row"))?;
        let kind = match header.id_kind {
            IdKind::Mixed if header.string_rows.contains(&object_ids.len()) => IdKind::String,
            IdKind::Mixed => IdKind::Int,
            kind => kind,
        };
        object_ids.push(parse_id(raw_id, kind).map_err(cache_io(path))?);
        for field in fields {
            values.push(
                field
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| err(&format!("'{field}': {e}")))?,
            );
        }
    }

    let matrix = DMatrix::from_row_slice(object_ids.len(), columns.len(), &values);
    FeatureTable::new(object_ids, columns, matrix)
        .map(|table| table.with_meta(header.meta))
        .map_err(cache_io(path))
}

fn parse_id(raw: &str, kind: IdKind) -> Result<ObjectId, String> {
    match kind {
        IdKind::Int => raw
            .parse::<i64>()
            .map(ObjectId::Int)
            .map_err(|e| format!("object id '{raw}': {e}")),
        IdKind::String | IdKind::Mixed => Ok(ObjectId::String(raw.to_string())),
    }
}

/// Write `vector` one element per line.
pub fn write_vector(path: &Utf8Path, vector: &DVector<f64>) -> Result<(), LightfeatError> {
    let body = vector.iter().map(|v| format!("{v}\n")).collect::<String>();
    fs::write(path, body).map_err(cache_io(path))
}

/// Write `matrix` one row per line, values separated by a space.
pub fn write_matrix(path: &Utf8Path, matrix: &DMatrix<f64>) -> Result<(), LightfeatError> {
    let body = matrix
        .row_iter()
        .map(|row| format!("{}\n", row.iter().join(" ")))
        .collect::<String>();
    fs::write(path, body).map_err(cache_io(path))
}

/// Read a vector; every value of the file is an element, whatever the line layout.
pub fn read_vector(path: &Utf8Path) -> Result<DVector<f64>, LightfeatError> {
    let rows = read_numeric_rows(path)?;
    Ok(DVector::from_iterator(
        rows.iter().map(Vec::len).sum(),
        rows.into_iter().flatten(),
    ))
}

/// Read a matrix; all rows must have the same length.
pub fn read_matrix(path: &Utf8Path) -> Result<DMatrix<f64>, LightfeatError> {
    let rows = read_numeric_rows(path)?;
    let ncols = rows.first().map_or(0, Vec::len);
    if let Some((i, row)) = rows.iter().find_position(|r| r.len() != ncols) {
        return Err(LightfeatError::CacheIo {
            path: path.to_path_buf(),
            reason: format!("row {i} has {} values, expected {ncols}", row.len()),
        });
    }
    Ok(DMatrix::from_row_iterator(
        rows.len(),
        ncols,
        rows.into_iter().flatten(),
    ))
}

fn read_numeric_rows(path: &Utf8Path) -> Result<Vec<Vec<f64>>, LightfeatError> {
    let content = fs::read_to_string(path).map_err(cache_io(path))?;
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|line| {
            line.split_whitespace()
                .map(|tok| tok.parse::<f64>().map_err(|e| format!("'{tok}': {e}")))
                .collect::<Result<Vec<_>, _>>()
                .map_err(cache_io(path))
        })
        .collect()
}

#[cfg(test)]
mod table_io_test {
    use super::*;
    use approx::assert_relative_eq;
    use camino::Utf8PathBuf;
    use serde_json::json;

    fn scratch() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    fn table(ids: Vec<ObjectId>) -> FeatureTable {
        let n = ids.len();
        let values = DMatrix::from_fn(n, 2, |i, j| 0.1 * (i as f64) - 1.5 * (j as f64) + 1e-17);
        FeatureTable::new(ids, vec!["c0".into(), "c 1".into()], values)
            .unwrap()
            .with_meta(FeatureArgs::new().with("ngp", 100).with("wavelet", "sym2"))
    }

    #[test]
    fn test_table_round_trip() {
        let (_dir, root) = scratch();
        let path = root.join("t_features.ecsv");

        let original = table(vec![ObjectId::Int(101), ObjectId::Int(-7)]);
        write_table(&path, &original).unwrap();
        assert_eq!(read_table(&path).unwrap(), original);

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(TABLE_MAGIC));
        assert!(content.contains(r#""id_kind":"int""#));
    }

    #[test]
    fn test_table_id_kinds() {
        let (_dir, root) = scratch();
        let path = root.join("t.ecsv");

        let strings = table(vec![ObjectId::from("SN 1, a"), ObjectId::from("0042x")]);
        write_table(&path, &strings).unwrap();
        assert_eq!(read_table(&path).unwrap(), strings);

        let mixed = table(vec![ObjectId::Int(3), ObjectId::from("b")]);
        write_table(&path, &mixed).unwrap();
        assert_eq!(read_table(&path).unwrap(), mixed);

        // An integer-looking string stays a string.
        let lookalike = table(vec![ObjectId::Int(1), ObjectId::String("42".into())]);
        write_table(&path, &lookalike).unwrap();
        assert_eq!(
            read_table(&path).unwrap().object_ids(),
            &[ObjectId::Int(1), ObjectId::String("42".into())]
        );
    }

    #[test]
    fn test_hash_prefixed_ids_are_rows() {
        let (_dir, root) = scratch();
        let path = root.join("t.ecsv");
        let original = table(vec![ObjectId::from("#7"), ObjectId::from("SN8")]);
        write_table(&path, &original).unwrap();

        let back = read_table(&path).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back, original);
    }

    #[test]
    fn test_special_values() {
        let (_dir, root) = scratch();
        let path = root.join("t.ecsv");
        let values = DMatrix::from_row_slice(1, 3, &[f64::INFINITY, -0.0, 1.0 / 3.0]);
        let original =
            FeatureTable::new(vec![ObjectId::Int(1)], vec!["a".into(), "b".into(), "c".into()], values)
                .unwrap();
        write_table(&path, &original).unwrap();
        let back = read_table(&path).unwrap();
        assert_eq!(back.values()[(0, 0)], f64::INFINITY);
        assert_eq!(back.values()[(0, 2)], 1.0 / 3.0);
        assert!(back.meta.is_empty());
    }

    #[test]
    fn test_empty_table() {
        let (_dir, root) = scratch();
        let path = root.join("t.ecsv");
        let empty = FeatureTable::new(vec![], vec![], DMatrix::zeros(0, 0)).unwrap();
        write_table(&path, &empty).unwrap();
        assert!(read_table(&path).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_table() {
        let (_dir, root) = scratch();
        let path = root.join("t.ecsv");

        fs::write(&path, "object_id,a\n1,2\n").unwrap();
        assert!(matches!(read_table(&path), Err(LightfeatError::CacheIo { .. })));

        let original = table(vec![ObjectId::Int(1), ObjectId::Int(2)]);
        write_table(&path, &original).unwrap();
        let truncated = fs::read_to_string(&path).unwrap().replace("-1.5", "oops");
        fs::write(&path, truncated).unwrap();
        assert_eq!(
            read_table(&path),
            Err(LightfeatError::CacheIo {
                path: path.clone(),
                reason: String::new()
            })
        );

        assert!(matches!(
            read_table(&root.join("missing.ecsv")),
            Err(LightfeatError::CacheIo { .. })
        ));
    }

    #[test]
    fn test_header_meta() {
        let (_dir, root) = scratch();
        let path = root.join("t.ecsv");
        let mut original = table(vec![ObjectId::Int(1)]);
        original.meta.insert("nested", json!({"z": [1, 2], "a": null}));
        write_table(&path, &original).unwrap();
        assert_eq!(read_table(&path).unwrap().meta, original.meta);
    }

    #[test]
    fn test_auxiliary_arrays() {
        let (_dir, root) = scratch();

        let vector = DVector::from_vec(vec![3.5, 1e-12, -2.0]);
        let vpath = root.join("v.ecsv");
        write_vector(&vpath, &vector).unwrap();
        assert_eq!(read_vector(&vpath).unwrap(), vector);

        let matrix = DMatrix::from_fn(3, 4, |i, j| (i as f64 + 1.0).powf(j as f64 * 0.37));
        let mpath = root.join("m.ecsv");
        write_matrix(&mpath, &matrix).unwrap();
        let back = read_matrix(&mpath).unwrap();
        assert_eq!(back.shape(), (3, 4));
        assert_relative_eq!(back, matrix, epsilon = 1e-15);

        fs::write(&mpath, "# comment\n1 2\n3\n").unwrap();
        assert!(read_matrix(&mpath).is_err());
        fs::write(&vpath, "1.0\nnope\n").unwrap();
        assert!(read_vector(&vpath).is_err());
    }
}
