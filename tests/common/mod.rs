#![allow(dead_code)]

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use flate2::{write::GzEncoder, Compression};
use lightfeat::fits::{write_bintable, BinTable, ColumnDescriptor, ColumnFormat, FitsValue};

/// Bands of the fixture photometry, cycled row by row. Raw values as the simulator writes them.
pub const RAW_BANDS: [&str; 6] = ["u", "g", "r", "i", "Z ", "y"];

/// One header row of a fixture file.
#[derive(Debug, Clone)]
pub struct ObjectRow {
    pub snid: i64,
    pub class: i32,
    pub ptrobs_min: i32,
    pub ptrobs_max: i32,
}

impl ObjectRow {
    pub fn new(snid: i64, ptrobs_min: i32, ptrobs_max: i32) -> Self {
        ObjectRow {
            snid,
            class: 42,
            ptrobs_min,
            ptrobs_max,
        }
    }
}

pub fn ra_of(snid: i64) -> f64 {
    (snid % 360) as f64 + 0.25
}

pub fn dec_of(snid: i64) -> f64 {
    -((snid % 90) as f64) + 0.5
}

pub fn redshift_of(snid: i64) -> f64 {
    0.1 + (snid % 10) as f64 * 0.05
}

/// Header table; the classification column `SNTYPE` sits at position 1.
pub fn header_table(objects: &[ObjectRow]) -> BinTable {
    let mut table = BinTable::new(vec![
        ColumnDescriptor::new("SNID", ColumnFormat::Int64),
        ColumnDescriptor::new("SNTYPE", ColumnFormat::Int32),
        ColumnDescriptor::new("RA", ColumnFormat::Float64),
        ColumnDescriptor::new("DECL", ColumnFormat::Float64),
        ColumnDescriptor::new("SIM_REDSHIFT_CMB", ColumnFormat::Float32),
        ColumnDescriptor::new("PTROBS_MIN", ColumnFormat::Int32),
        ColumnDescriptor::new("PTROBS_MAX", ColumnFormat::Int32),
    ]);
    for o in objects {
        table.rows.push(vec![
            FitsValue::Int(o.snid),
            FitsValue::Int(o.class as i64),
            FitsValue::Float(ra_of(o.snid)),
            FitsValue::Float(dec_of(o.snid)),
            FitsValue::Float(redshift_of(o.snid)),
            FitsValue::Int(o.ptrobs_min as i64),
            FitsValue::Int(o.ptrobs_max as i64),
        ]);
    }
    table
}

/// Photometry table of `n_rows` rows. Row `i` has `MJD = 60000 + i` and `FLUXCAL = 10 * i`.
pub fn photometry_table(n_rows: usize) -> BinTable {
    let mut table = BinTable::new(vec![
        ColumnDescriptor::new("MJD", ColumnFormat::Float64),
        ColumnDescriptor::new("FLT", ColumnFormat::Text(2)),
        ColumnDescriptor::new("FIELD", ColumnFormat::Text(12)),
        ColumnDescriptor::new("PHOTFLAG", ColumnFormat::Int32),
        ColumnDescriptor::new("PHOTPROB", ColumnFormat::Float32),
        ColumnDescriptor::new("FLUXCAL", ColumnFormat::Float32),
        ColumnDescriptor::new("FLUXCALERR", ColumnFormat::Float32),
        ColumnDescriptor::new("PSF_SIG1", ColumnFormat::Float32),
        ColumnDescriptor::new("SKY_SIG", ColumnFormat::Float32),
        ColumnDescriptor::new("ZEROPT", ColumnFormat::Float32),
        ColumnDescriptor::new("SIM_MAGOBS", ColumnFormat::Float32),
        ColumnDescriptor::new("CCDNUM", ColumnFormat::Int16),
    ]);
    for i in 0..n_rows {
        table.rows.push(vec![
            FitsValue::Float(60000.0 + i as f64),
            FitsValue::Text(RAW_BANDS[i % RAW_BANDS.len()].to_string()),
            FitsValue::Text("WFD".to_string()),
            FitsValue::Int(0),
            FitsValue::Float(-9.0),
            FitsValue::Float(10.0 * i as f64),
            FitsValue::Float(1.5),
            FitsValue::Float(2.0),
            FitsValue::Float(30.5),
            FitsValue::Float(27.5),
            FitsValue::Float(99.0),
            FitsValue::Int(1),
        ]);
    }
    table
}

/// Scratch data root, removed when the guard is dropped.
pub fn scratch_root() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, root)
}

/// `<root>/<cadence>/LSST_WFD_MODEL<model>`
pub fn model_dir(root: &Utf8Path, cadence: &str, model: u32) -> Utf8PathBuf {
    root.join(cadence).join(format!("LSST_WFD_MODEL{model}"))
}

/// Write `<dir>/<stem>_HEAD.FITS` and `<dir>/<stem>_PHOT.FITS`; returns the header path.
pub fn write_pair(dir: &Utf8Path, stem: &str, header: &BinTable, photometry: &BinTable) -> Utf8PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let header_path = dir.join(format!("{stem}_HEAD.FITS"));
    write_bintable(&header_path, header).unwrap();
    write_bintable(&dir.join(format!("{stem}_PHOT.FITS")), photometry).unwrap();
    header_path
}

/// One file pair under model 1 holding `objects` over `n_rows` photometry rows.
pub fn write_objects(
    root: &Utf8Path,
    cadence: &str,
    stem: &str,
    objects: &[ObjectRow],
    n_rows: usize,
) -> Utf8PathBuf {
    write_pair(
        &model_dir(root, cadence, 1),
        stem,
        &header_table(objects),
        &photometry_table(n_rows),
    )
}

/// Replace `path` by `path.gz`, gzip-compressed; returns the new path.
pub fn gzip_file(path: &Utf8Path) -> Utf8PathBuf {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&std::fs::read(path).unwrap()).unwrap();
    let gz = Utf8PathBuf::from(format!("{path}.gz"));
    std::fs::write(&gz, encoder.finish().unwrap()).unwrap();
    std::fs::remove_file(path).unwrap();
    gz
}
