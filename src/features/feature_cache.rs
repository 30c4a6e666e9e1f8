//! # Feature cache
//!
//! [`FeatureCache::extract_features`] memoizes an [`Extractor`] run on disk, keyed by a
//! [`CacheFingerprint`] `F`:
//!
//! ```text
//! <root>/features/F_features.ecsv        feature table + arguments as metadata
//! <root>/features/F_eigenvals.ecsv       ┐
//! <root>/features/F_eigenvectors.ecsv    ├ wavelet family only
//! <root>/features/F_mean.ecsv            ┘
//! ```
//!
//! * **HIT** – the table file exists: it is loaded with its auxiliary artifacts, the extractor
//!   is not called. Any unreadable file is a [`LightfeatError::CacheIo`].
//! * **MISS** – the extractor runs with its `tracing` output silenced, the call arguments are
//!   merged into the table metadata, auxiliary artifacts are written, then the table. The
//!   table is written last, so its presence marks a complete entry.
//! * **Disabled** – the extractor runs silenced and its output is returned as is: no
//!   metadata merge, nothing read or written.
//!
//! Entries are never rewritten or evicted. Concurrent writers of one entry race, the last
//! one wins.
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use nalgebra::{DMatrix, DVector};
use tracing::{debug, info, subscriber::NoSubscriber};

use crate::{
    constants::{CACHE_FILE_EXT, CLASSIFICATIONS_SUBDIR, FEATURES_SUBDIR},
    env_state::default_cache_root,
    features::{
        cache_key::{cache_fingerprint, CacheFingerprint},
        table_io::{read_matrix, read_table, read_vector, write_matrix, write_table, write_vector},
        Dataset, Extraction, Extractor, FeatureArgs, FeatureTable, MethodFamily, PcaComponents,
    },
    lightfeat_errors::LightfeatError,
};

/// Argument disabling the extractor's own intermediate outputs.
pub const SAVE_OUTPUT_ARG: &str = "save_output";

/// Auxiliary files of a wavelet-family entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuxiliaryArtifact {
    Eigenvalues,
    Eigenvectors,
    Mean,
}

impl AuxiliaryArtifact {
    /// Every artifact, in write order.
    pub const ALL: [AuxiliaryArtifact; 3] = [
        AuxiliaryArtifact::Eigenvalues,
        AuxiliaryArtifact::Eigenvectors,
        AuxiliaryArtifact::Mean,
    ];

    /// File-name suffix, after the fingerprint.
    pub fn suffix(&self) -> &'static str {
        match self {
            AuxiliaryArtifact::Eigenvalues => "eigenvals",
            AuxiliaryArtifact::Eigenvectors => "eigenvectors",
            AuxiliaryArtifact::Mean => "mean",
        }
    }
}

/// File locations of one cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
    dir: Utf8PathBuf,
    fingerprint: CacheFingerprint,
}

impl CachePaths {
    pub fn new(root: &Utf8Path, fingerprint: CacheFingerprint) -> Self {
        CachePaths {
            dir: root.join(FEATURES_SUBDIR),
            fingerprint,
        }
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    fn file(&self, suffix: &str) -> Utf8PathBuf {
        self.dir
            .join(format!("{}_{suffix}.{CACHE_FILE_EXT}", self.fingerprint))
    }

    /// `F_features.ecsv`
    pub fn features(&self) -> Utf8PathBuf {
        self.file("features")
    }

    pub fn auxiliary(&self, artifact: AuxiliaryArtifact) -> Utf8PathBuf {
        self.file(artifact.suffix())
    }
}

/// Where a [`CachedFeatures`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Extracted and written to the cache.
    Computed,
    /// Read back from the cache.
    Loaded,
    /// Extracted with caching disabled.
    Uncached,
}

/// Result of [`FeatureCache::extract_features`].
#[derive(Debug, Clone, PartialEq)]
pub struct CachedFeatures {
    pub table: FeatureTable,
    /// PCA components of wavelet-family methods.
    pub auxiliary: Option<PcaComponents>,
    pub fingerprint: CacheFingerprint,
    pub status: CacheStatus,
}

/// On-disk memoization of feature extractions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureCache {
    root: Option<Utf8PathBuf>,
}

impl FeatureCache {
    /// Cache rooted at `root`; directories are created on first use.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        FeatureCache {
            root: Some(root.into()),
        }
    }

    /// No caching: every call extracts, nothing touches the disk.
    pub fn disabled() -> Self {
        FeatureCache { root: None }
    }

    /// Cache under the per-user cache directory (see [`default_cache_root`]).
    pub fn in_user_cache_dir() -> Result<Self, LightfeatError> {
        Ok(FeatureCache::new(default_cache_root()?))
    }

    pub fn root(&self) -> Option<&Utf8Path> {
        self.root.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.root.is_some()
    }

    /// Extract features of `data` with `extractor`, or load them from the cache.
    ///
    /// Arguments
    /// -----------------
    /// * `extractor`: the extraction method; called at most once.
    /// * `data`: the light-curves; its survey name enters the fingerprint.
    /// * `args`: extraction arguments. Unless the method is [`MethodFamily::Parametric`],
    ///   `save_output` defaults to `false`.
    /// * `file_prefix`: fingerprint override.
    ///
    /// Return
    /// ----------
    /// * The features, the PCA components of wavelet-family methods, the fingerprint and a
    ///   [`CacheStatus`].
    /// * [`LightfeatError::Extraction`] with the extractor's error, unchanged.
    /// * [`LightfeatError::CacheIo`] if an entry cannot be read or written.
    /// * [`LightfeatError::MissingAuxiliary`] if a wavelet-family extraction returns no PCA
    ///   components.
    pub fn extract_features(
        &self,
        extractor: &mut dyn Extractor,
        data: &dyn Dataset,
        mut args: FeatureArgs,
        file_prefix: Option<&str>,
    ) -> Result<CachedFeatures, LightfeatError> {
        let family = extractor.family();
        if family != MethodFamily::Parametric {
            args.set_default(SAVE_OUTPUT_ARG, false);
        }

        let fingerprint = match file_prefix {
            Some(prefix) => CacheFingerprint::from_prefix(prefix),
            None => cache_fingerprint(data.survey_name(), extractor.method(), &args),
        };

        let Some(root) = self.root.as_deref() else {
            debug!(method = extractor.method(), "feature cache disabled, extracting");
            let Extraction { table, auxiliary } = extract_quietly(extractor, data, &args)?;
            return Ok(CachedFeatures {
                table,
                auxiliary,
                fingerprint,
                status: CacheStatus::Uncached,
            });
        };

        let paths = CachePaths::new(root, fingerprint.clone());
        create_cache_dirs(root)?;

        let features_path = paths.features();
        if features_path.is_file() {
            info!(%fingerprint, path = %features_path, "feature cache hit");
            let table = read_table(&features_path)?;
            let auxiliary = if family.has_auxiliary() {
                Some(read_auxiliary(&paths)?)
            } else {
                None
            };
            return Ok(CachedFeatures {
                table,
                auxiliary,
                fingerprint,
                status: CacheStatus::Loaded,
            });
        }

        info!(%fingerprint, method = extractor.method(), "feature cache miss, extracting");
        let Extraction {
            mut table,
            auxiliary,
        } = extract_quietly(extractor, data, &args)?;
        table.meta.update(&args);

        if family.has_auxiliary() {
            let pca = auxiliary
                .as_ref()
                .ok_or_else(|| LightfeatError::MissingAuxiliary(extractor.method().to_string()))?;
            write_auxiliary(&paths, pca)?;
        }
        write_table(&features_path, &table)?;
        debug!(path = %features_path, rows = table.len(), "wrote cached features");

        Ok(CachedFeatures {
            table,
            auxiliary,
            fingerprint,
            status: CacheStatus::Computed,
        })
    }
}

fn create_cache_dirs(root: &Utf8Path) -> Result<(), LightfeatError> {
    for sub in [FEATURES_SUBDIR, CLASSIFICATIONS_SUBDIR] {
        let dir = root.join(sub);
        fs::create_dir_all(&dir).map_err(|e| LightfeatError::CacheIo {
            path: dir,
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

/// Run the extractor with every `tracing` event routed to a no-op subscriber.
fn extract_quietly(
    extractor: &mut dyn Extractor,
    data: &dyn Dataset,
    args: &FeatureArgs,
) -> Result<Extraction, LightfeatError> {
    tracing::subscriber::with_default(NoSubscriber::default(), || {
        extractor.extract_features(data, args)
    })
    .map_err(LightfeatError::Extraction)
}

fn write_auxiliary(paths: &CachePaths, pca: &PcaComponents) -> Result<(), LightfeatError> {
    for artifact in AuxiliaryArtifact::ALL {
        let path = paths.auxiliary(artifact);
        match artifact {
            AuxiliaryArtifact::Eigenvalues => write_vector(&path, &pca.eigenvalues)?,
            AuxiliaryArtifact::Eigenvectors => write_matrix(&path, &pca.eigenvectors)?,
            AuxiliaryArtifact::Mean => write_vector(&path, &pca.mean)?,
        }
        debug!(path = %path, "wrote auxiliary artifact");
    }
    Ok(())
}

fn read_auxiliary(paths: &CachePaths) -> Result<PcaComponents, LightfeatError> {
    let mut pca = PcaComponents {
        eigenvalues: DVector::zeros(0),
        eigenvectors: DMatrix::zeros(0, 0),
        mean: DVector::zeros(0),
    };
    for artifact in AuxiliaryArtifact::ALL {
        let path = paths.auxiliary(artifact);
        match artifact {
            AuxiliaryArtifact::Eigenvalues => pca.eigenvalues = read_vector(&path)?,
            AuxiliaryArtifact::Eigenvectors => pca.eigenvectors = read_matrix(&path)?,
            AuxiliaryArtifact::Mean => pca.mean = read_vector(&path)?,
        }
    }
    Ok(pca)
}
