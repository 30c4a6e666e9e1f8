//! # Cadence data: every light-curve of one simulated cadence
//!
//! [`CadenceData`] discovers all header files below `<root>/<cadence>/`, reads each
//! header/photometry pair with [`read_photometry_pair`] and merges the results into one
//! insertion-ordered [`LightcurveSet`].
//!
//! Loading
//! -----------------
//! * The data root is resolved first (explicit directory, then `CADENCE_SIMS`); a missing
//!   root fails with [`LightfeatError::MissingDataRoot`] before any file is touched.
//! * Discovery uses the recursive pattern `<root>/<cadence>/**/*HEAD.*`; files are parsed and
//!   merged in discovery order.
//! * [`LoadPolicy`] decides what a malformed file does: abort the load (default) or be
//!   skipped with a `warn!` and recorded in [`CadenceData::skipped_files`].
//! * [`ParseWorkers`] optionally parses files on a caller-owned `rayon` pool. Workers only
//!   parse; the results are collected in discovery order and merged on the calling thread, so
//!   the result is identical to a sequential load.
//!
//! Example
//! -----------------
//! ```rust,no_run
//! use camino::Utf8Path;
//! use lightfeat::lightcurves::cadence_data::{CadenceData, LoadOptions, LoadPolicy, ParseWorkers};
//!
//! let options = LoadOptions::default()
//!     .with_policy(LoadPolicy::SkipAndWarn)
//!     .with_workers(ParseWorkers::available()?);
//! let data = CadenceData::with_options("alt_sched", Some(Utf8Path::new("/data/sims")), options)?;
//!
//! for id in data.list_object_ids().iter().take(3) {
//!     let lc = data.get_lightcurve(id)?;
//!     println!("{id}: {} samples, z = {}", lc.len(), lc.meta.redshift);
//! }
//! # Ok::<(), lightfeat::lightfeat_errors::LightfeatError>(())
//! ```
use std::{num::NonZeroUsize, sync::Arc, thread};

use camino::{Utf8Path, Utf8PathBuf};
use glob::Pattern;
use indexmap::map::Entry;
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use crate::{
    constants::{ObjectId, BAND_PREFIX, HEADER_MARKER, LSST_BANDS},
    env_state,
    features::Dataset,
    lightcurves::{
        model_column::ClassColumns, photometry_reader::read_photometry_pair, Lightcurve,
        LightcurveSet,
    },
    lightfeat_errors::LightfeatError,
};

#[cfg(feature = "progress")]
use crate::lightcurves::progress_bar::FileProgress;

type PairResult = Result<Vec<(ObjectId, Lightcurve)>, LightfeatError>;

/// What to do with a header/photometry pair that fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPolicy {
    /// Stop at the first malformed file and return its error.
    #[default]
    Abort,
    /// Log the failure, record it in [`CadenceData::skipped_files`] and continue.
    SkipAndWarn,
}

/// Caller-owned `rayon` pool for header parsing.
///
/// Clones share the same pool. Without a handle, files are parsed on the calling thread.
#[derive(Debug, Clone)]
pub struct ParseWorkers {
    pool: Arc<ThreadPool>,
}

impl ParseWorkers {
    /// Build a dedicated pool of `threads` workers.
    pub fn new(threads: NonZeroUsize) -> Result<Self, LightfeatError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.get())
            .thread_name(|i| format!("lightfeat-parse-{i}"))
            .build()
            .map_err(|e| LightfeatError::ThreadPool(e.to_string()))?;
        Ok(ParseWorkers::from_pool(Arc::new(pool)))
    }

    /// One worker per available CPU (one if the count is unknown).
    pub fn available() -> Result<Self, LightfeatError> {
        ParseWorkers::new(thread::available_parallelism().unwrap_or(NonZeroUsize::MIN))
    }

    /// Parse on a pool the caller already owns.
    pub fn from_pool(pool: Arc<ThreadPool>) -> Self {
        ParseWorkers { pool }
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Parse every pair on the pool. Results come back in `files` order.
    fn parse(
        &self,
        files: &[Utf8PathBuf],
        class_columns: &ClassColumns,
        on_parsed: &(dyn Fn(&Utf8Path) + Sync),
    ) -> Vec<PairResult> {
        self.pool.install(|| {
            files
                .par_iter()
                .map(|path| {
                    let result = read_photometry_pair(path, class_columns);
                    on_parsed(path);
                    result
                })
                .collect()
        })
    }
}

/// Two handles are equal when they share the same pool.
impl PartialEq for ParseWorkers {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.pool, &other.pool)
    }
}

/// Options of [`CadenceData::with_options`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOptions {
    pub policy: LoadPolicy,
    pub class_columns: ClassColumns,
    pub workers: Option<ParseWorkers>,
}

impl LoadOptions {
    pub fn with_policy(mut self, policy: LoadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_class_columns(mut self, class_columns: ClassColumns) -> Self {
        self.class_columns = class_columns;
        self
    }

    pub fn with_workers(mut self, workers: ParseWorkers) -> Self {
        self.workers = Some(workers);
        self
    }
}

/// A header file left out of the collection under [`LoadPolicy::SkipAndWarn`].
#[derive(Debug)]
pub struct SkippedFile {
    pub path: Utf8PathBuf,
    pub error: LightfeatError,
}

/// All light-curves of one simulated cadence.
///
/// Built once by [`CadenceData::new`] or [`CadenceData::with_options`], read-only afterwards.
#[derive(Debug)]
pub struct CadenceData {
    cadence: String,
    root: Utf8PathBuf,
    data: LightcurveSet,
    filter_set: Vec<String>,
    skipped: Vec<SkippedFile>,
}

impl CadenceData {
    /// Load `cadence` below `parent_dir` (or `CADENCE_SIMS`) with the default options.
    pub fn new(cadence: &str, parent_dir: Option<&Utf8Path>) -> Result<Self, LightfeatError> {
        CadenceData::with_options(cadence, parent_dir, LoadOptions::default())
    }

    /// Load `cadence` below `parent_dir` (or `CADENCE_SIMS`).
    ///
    /// Arguments
    /// -----------------
    /// * `cadence`: name of the cadence directory, also used as the survey name.
    /// * `parent_dir`: directory holding the cadence directories; overrides `CADENCE_SIMS`.
    /// * `options`: error policy, classification-column rule and parse workers.
    ///
    /// Return
    /// ----------
    /// * The loaded collection. Zero discovered files give an empty collection.
    /// * [`LightfeatError::MissingDataRoot`] when no root can be resolved.
    /// * The first parse error under [`LoadPolicy::Abort`].
    pub fn with_options(
        cadence: &str,
        parent_dir: Option<&Utf8Path>,
        options: LoadOptions,
    ) -> Result<Self, LightfeatError> {
        let root = env_state::data_root(parent_dir)?;
        let files = discover_header_files(&root, cadence)?;
        if files.is_empty() {
            warn!(root = %root, cadence, "no header files found");
        }

        let LoadOptions {
            policy,
            class_columns,
            workers,
        } = options;

        #[cfg(feature = "progress")]
        let progress = FileProgress::new(files.len());
        let on_parsed = |_path: &Utf8Path| {
            #[cfg(feature = "progress")]
            progress.tick(_path);
        };

        let mut merger = Merger::new(policy);
        match workers {
            Some(workers) if files.len() > 1 => {
                debug!(threads = workers.threads(), "parsing header files in parallel");
                let results = workers.parse(&files, &class_columns, &on_parsed);
                for (path, result) in files.iter().zip(results) {
                    merger.absorb(path, result)?;
                }
            }
            _ => {
                for path in &files {
                    let result = read_photometry_pair(path, &class_columns);
                    on_parsed(path);
                    merger.absorb(path, result)?;
                }
            }
        }

        #[cfg(feature = "progress")]
        progress.finish();

        info!(
            cadence,
            files = files.len(),
            objects = merger.data.len(),
            skipped = merger.skipped.len(),
            "cadence loaded"
        );

        Ok(CadenceData {
            cadence: cadence.to_string(),
            root,
            data: merger.data,
            filter_set: lsst_filter_set(),
            skipped: merger.skipped,
        })
    }

    /// Light-curve of `id`, or [`LightfeatError::ObjectNotFound`].
    pub fn get_lightcurve(&self, id: &ObjectId) -> Result<&Lightcurve, LightfeatError> {
        self.data
            .get(id)
            .ok_or_else(|| LightfeatError::ObjectNotFound(id.clone()))
    }

    /// Every object identifier, in discovery order.
    pub fn list_object_ids(&self) -> Vec<ObjectId> {
        self.data.keys().cloned().collect()
    }

    /// Alias of [`CadenceData::list_object_ids`].
    pub fn object_names(&self) -> Vec<ObjectId> {
        self.list_object_ids()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, ObjectId, Lightcurve> {
        self.data.iter()
    }

    /// Canonical bands: `lsstu`, `lsstg`, `lsstr`, `lssti`, `lsstz`, `lssty`.
    pub fn filter_set(&self) -> &[String] {
        &self.filter_set
    }

    pub fn cadence(&self) -> &str {
        &self.cadence
    }

    /// Data root the cadence was loaded from.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Files left out under [`LoadPolicy::SkipAndWarn`], in discovery order.
    pub fn skipped_files(&self) -> &[SkippedFile] {
        &self.skipped
    }
}

impl<'a> IntoIterator for &'a CadenceData {
    type Item = (&'a ObjectId, &'a Lightcurve);
    type IntoIter = indexmap::map::Iter<'a, ObjectId, Lightcurve>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl Dataset for CadenceData {
    fn survey_name(&self) -> &str {
        &self.cadence
    }

    fn filter_set(&self) -> &[String] {
        &self.filter_set
    }

    fn list_object_ids(&self) -> Vec<ObjectId> {
        CadenceData::list_object_ids(self)
    }

    fn get_lightcurve(&self, id: &ObjectId) -> Result<&Lightcurve, LightfeatError> {
        CadenceData::get_lightcurve(self, id)
    }
}

fn lsst_filter_set() -> Vec<String> {
    LSST_BANDS
        .iter()
        .map(|band| format!("{BAND_PREFIX}{band}"))
        .collect()
}

/// Header files below `<root>/<cadence>/`, in glob order.
///
/// The root and cadence are escaped so glob metacharacters in directory names match
/// literally. Only regular files are kept.
pub fn discover_header_files(
    root: &Utf8Path,
    cadence: &str,
) -> Result<Vec<Utf8PathBuf>, LightfeatError> {
    let base = Pattern::escape(root.join(cadence).as_str());
    let pattern = format!("{base}/**/*{HEADER_MARKER}.*");
    debug!(%pattern, "discovering header files");

    let entries =
        glob::glob(&pattern).map_err(|e| LightfeatError::GlobPattern(format!("{pattern}: {e}")))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| LightfeatError::IoError(e.into()))?;
        let path = Utf8PathBuf::from_path_buf(path).map_err(|p| {
            LightfeatError::Utf8PathError(format!("Non UTF-8 header path: {}", p.display()))
        })?;
        if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

/// Single-writer accumulation of parsed pairs under a [`LoadPolicy`].
struct Merger {
    policy: LoadPolicy,
    data: LightcurveSet,
    skipped: Vec<SkippedFile>,
}

impl Merger {
    fn new(policy: LoadPolicy) -> Self {
        Merger {
            policy,
            data: LightcurveSet::default(),
            skipped: Vec::new(),
        }
    }

    fn absorb(&mut self, path: &Utf8Path, result: PairResult) -> Result<(), LightfeatError> {
        match result {
            Ok(lightcurves) => {
                for (id, lc) in lightcurves {
                    match self.data.entry(id) {
                        Entry::Occupied(mut slot) => {
                            debug!(snid = %slot.key(), file = %path, "duplicate object replaced");
                            slot.insert(lc);
                        }
                        Entry::Vacant(slot) => {
                            slot.insert(lc);
                        }
                    }
                }
                Ok(())
            }
            Err(error) => match self.policy {
                LoadPolicy::Abort => Err(error),
                LoadPolicy::SkipAndWarn => {
                    warn!(file = %path, %error, "skipping malformed header file");
                    self.skipped.push(SkippedFile {
                        path: path.to_path_buf(),
                        error,
                    });
                    Ok(())
                }
            },
        }
    }
}

#[cfg(test)]
mod cadence_data_test {
    use super::*;
    use crate::{
        fits::FitsValue,
        lightcurves::{slicer::SliceError, LightcurveMeta},
    };

    fn lightcurve(snid: i64, redshift: f64) -> (ObjectId, Lightcurve) {
        let meta = LightcurveMeta {
            snid: ObjectId::Int(snid),
            ra: 10.0,
            dec: -5.0,
            class_label: FitsValue::Int(42),
            redshift,
        };
        (
            ObjectId::Int(snid),
            Lightcurve {
                meta,
                samples: vec![],
            },
        )
    }

    fn slice_error(path: &str) -> LightfeatError {
        LightfeatError::SliceOutOfRange {
            path: path.into(),
            snid: ObjectId::Int(9),
            source: SliceError::OutOfRange {
                start: 5,
                end: 12,
                len: 6,
            },
        }
    }

    #[test]
    fn test_filter_set() {
        assert_eq!(
            lsst_filter_set(),
            vec!["lsstu", "lsstg", "lsstr", "lssti", "lsstz", "lssty"]
        );
    }

    #[test]
    fn test_load_options_builder() {
        let options = LoadOptions::default();
        assert_eq!(options.policy, LoadPolicy::Abort);
        assert_eq!(options.class_columns, ClassColumns::Positional);
        assert_eq!(options.workers, None);

        let workers = ParseWorkers::new(NonZeroUsize::new(4).unwrap()).unwrap();
        let options = options
            .with_policy(LoadPolicy::SkipAndWarn)
            .with_workers(workers.clone());
        assert_eq!(options.policy, LoadPolicy::SkipAndWarn);
        assert_eq!(options.workers.as_ref().map(|w| w.threads()), Some(4));
        assert_eq!(options.workers, Some(workers));
        assert!(ParseWorkers::available().unwrap().threads() >= 1);
    }

    #[test]
    fn test_merge_duplicates_keep_position() {
        let mut merger = Merger::new(LoadPolicy::Abort);
        let path = Utf8Path::new("a_HEAD.FITS");
        merger
            .absorb(path, Ok(vec![lightcurve(1, 0.1), lightcurve(2, 0.2)]))
            .unwrap();
        merger
            .absorb(path, Ok(vec![lightcurve(3, 0.3), lightcurve(1, 0.9)]))
            .unwrap();

        let ids: Vec<_> = merger.data.keys().cloned().collect();
        assert_eq!(ids, vec![ObjectId::Int(1), ObjectId::Int(2), ObjectId::Int(3)]);
        assert_eq!(merger.data[&ObjectId::Int(1)].meta.redshift, 0.9);
    }

    #[test]
    fn test_merge_policies() {
        let path = Utf8Path::new("bad_HEAD.FITS");

        let mut abort = Merger::new(LoadPolicy::Abort);
        assert_eq!(
            abort.absorb(path, Err(slice_error("bad_HEAD.FITS"))),
            Err(slice_error("bad_HEAD.FITS"))
        );

        let mut skip = Merger::new(LoadPolicy::SkipAndWarn);
        skip.absorb(path, Err(slice_error("bad_HEAD.FITS"))).unwrap();
        skip.absorb(Utf8Path::new("ok_HEAD.FITS"), Ok(vec![lightcurve(4, 0.4)]))
            .unwrap();
        assert_eq!(skip.skipped.len(), 1);
        assert_eq!(skip.skipped[0].path, Utf8PathBuf::from("bad_HEAD.FITS"));
        assert_eq!(skip.data.len(), 1);
    }

    #[test]
    fn test_discover_missing_cadence_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(tmp.path()).unwrap();
        assert!(discover_header_files(root, "no_such_cadence")
            .unwrap()
            .is_empty());
    }
}
