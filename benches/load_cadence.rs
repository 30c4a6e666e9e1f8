use std::num::NonZeroUsize;

use camino::Utf8PathBuf;
use criterion::Throughput;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use lightfeat::fits::{write_bintable, BinTable, ColumnDescriptor, ColumnFormat, FitsValue};
use lightfeat::{CadenceData, LoadOptions, ParseWorkers};

const CADENCE: &str = "bench_cadence";
const FILES: usize = 16;
const OBJECTS_PER_FILE: usize = 200;
const SAMPLES_PER_OBJECT: usize = 50;

fn header(first_snid: i64) -> BinTable {
    let mut table = BinTable::new(vec![
        ColumnDescriptor::new("SNID", ColumnFormat::Int64),
        ColumnDescriptor::new("SNTYPE", ColumnFormat::Int32),
        ColumnDescriptor::new("RA", ColumnFormat::Float64),
        ColumnDescriptor::new("DECL", ColumnFormat::Float64),
        ColumnDescriptor::new("SIM_REDSHIFT_CMB", ColumnFormat::Float32),
        ColumnDescriptor::new("PTROBS_MIN", ColumnFormat::Int32),
        ColumnDescriptor::new("PTROBS_MAX", ColumnFormat::Int32),
    ]);
    for k in 0..OBJECTS_PER_FILE {
        let start = (k * SAMPLES_PER_OBJECT + 1) as i64;
        table.rows.push(vec![
            FitsValue::Int(first_snid + k as i64),
            FitsValue::Int(42),
            FitsValue::Float(150.0),
            FitsValue::Float(-30.0),
            FitsValue::Float(0.3),
            FitsValue::Int(start),
            FitsValue::Int(start + SAMPLES_PER_OBJECT as i64 - 1),
        ]);
    }
    table
}

fn photometry() -> BinTable {
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
    ]);
    let bands = ["u", "g", "r", "i", "z", "y"];
    for i in 0..OBJECTS_PER_FILE * SAMPLES_PER_OBJECT {
        table.rows.push(vec![
            FitsValue::Float(60000.0 + i as f64 * 0.1),
            FitsValue::Text(bands[i % bands.len()].to_string()),
            FitsValue::Text("WFD".to_string()),
            FitsValue::Int(0),
            FitsValue::Float(-9.0),
            FitsValue::Float(i as f64),
            FitsValue::Float(1.0),
            FitsValue::Float(2.0),
            FitsValue::Float(30.0),
            FitsValue::Float(27.5),
        ]);
    }
    table
}

fn bench_load_cadence(c: &mut Criterion) {
    let tmp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
    let dir = root.join(CADENCE).join("LSST_WFD_MODEL1");
    std::fs::create_dir_all(&dir).unwrap();
    let phot = photometry();
    for f in 0..FILES {
        let stem = format!("LSST_WFD_NONIa-{f:04}");
        write_bintable(
            &dir.join(format!("{stem}_HEAD.FITS")),
            &header((f * OBJECTS_PER_FILE) as i64),
        )
        .unwrap();
        write_bintable(&dir.join(format!("{stem}_PHOT.FITS")), &phot).unwrap();
    }

    let mut group = c.benchmark_group("parse_workers");
    group.throughput(Throughput::Elements((FILES * OBJECTS_PER_FILE) as u64));
    for threads in [1usize, 2, 4, 8] {
        let workers = ParseWorkers::new(NonZeroUsize::new(threads).unwrap()).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(threads), &workers, |b, workers| {
            b.iter(|| {
                let options = LoadOptions::default().with_workers(workers.clone());
                let data = CadenceData::with_options(CADENCE, Some(&root), options).unwrap();
                assert_eq!(data.len(), FILES * OBJECTS_PER_FILE);
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_load_cadence);
criterion_main!(benches);
