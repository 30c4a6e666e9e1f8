//! # Environment state
//!
//! This module defines [`CadenceEnv`], the configuration read from the process environment:
//!
//! - The **data root** holding one directory per simulated cadence, from the
//!   [`CADENCE_SIMS`](crate::constants::DATA_ROOT_ENV_VAR) variable.
//! - The **default cache root** for extracted features, under the per-user cache directory
//!   given by [`directories::BaseDirs`].
//!
//! An explicit directory passed by the caller always wins over the environment. With
//! neither, construction of a [`CadenceData`](crate::lightcurves::cadence_data::CadenceData)
//! fails immediately with [`LightfeatError::MissingDataRoot`], before any file is touched.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lightfeat::env_state::CadenceEnv;
//!
//! let env = CadenceEnv::from_env()?;
//! let root = env.resolve_data_root(None)?;
//! println!("simulations under {root}");
//! # Ok::<(), lightfeat::lightfeat_errors::LightfeatError>(())
//! ```
use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;

use crate::{
    constants::{DATA_ROOT_ENV_VAR, DEFAULT_CACHE_DIRNAME},
    lightfeat_errors::LightfeatError,
};

/// Configuration picked up from the environment.
///
/// # Fields
///
/// * `data_root` - Value of `CADENCE_SIMS`, if set and non-empty
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CadenceEnv {
    pub data_root: Option<Utf8PathBuf>,
}

impl CadenceEnv {
    /// Read the environment of the current process.
    ///
    /// Return
    /// ------
    /// * The environment state. An empty `CADENCE_SIMS` counts as unset.
    /// * [`LightfeatError::Utf8PathError`] if `CADENCE_SIMS` is not valid UTF-8.
    pub fn from_env() -> Result<Self, LightfeatError> {
        let data_root = match std::env::var_os(DATA_ROOT_ENV_VAR) {
            None => None,
            Some(raw) if raw.is_empty() => None,
            Some(raw) => Some(Utf8PathBuf::from_path_buf(raw.into()).map_err(|p| {
                LightfeatError::Utf8PathError(format!(
                    "{DATA_ROOT_ENV_VAR} is not valid UTF-8: {}",
                    p.display()
                ))
            })?),
        };
        Ok(CadenceEnv { data_root })
    }

    /// Pick the data root: `explicit` first, then the environment.
    pub fn resolve_data_root(
        &self,
        explicit: Option<&Utf8Path>,
    ) -> Result<Utf8PathBuf, LightfeatError> {
        explicit
            .map(Utf8Path::to_path_buf)
            .or_else(|| self.data_root.clone())
            .ok_or(LightfeatError::MissingDataRoot(DATA_ROOT_ENV_VAR))
    }
}

/// Data root for a load: `explicit` when given, otherwise `CADENCE_SIMS`.
///
/// The environment is only read when no explicit directory is passed.
pub fn data_root(explicit: Option<&Utf8Path>) -> Result<Utf8PathBuf, LightfeatError> {
    match explicit {
        Some(dir) => Ok(dir.to_path_buf()),
        None => CadenceEnv::from_env()?.resolve_data_root(None),
    }
}

/// Default cache root: `<user cache dir>/lightfeat_cache`.
///
/// The directory is not created here.
pub fn default_cache_root() -> Result<Utf8PathBuf, LightfeatError> {
    let base_dir = BaseDirs::new().ok_or_else(|| {
        LightfeatError::Utf8PathError("Cannot find the user base directories".into())
    })?;
    let cache_path = Utf8Path::from_path(base_dir.cache_dir()).ok_or_else(|| {
        LightfeatError::Utf8PathError(format!(
            "Invalid cache path: {}",
            base_dir.cache_dir().display()
        ))
    })?;
    Ok(cache_path.join(DEFAULT_CACHE_DIRNAME))
}
