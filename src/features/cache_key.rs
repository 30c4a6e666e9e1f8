//! Cache fingerprints.
//!
//! A fingerprint names every file of one cache entry: `"{survey}_{method}_{digest}"`, where
//! `digest` is the first [`FINGERPRINT_DIGEST_LEN`] lowercase hex characters of the SHA-256 of
//! the **canonical JSON** of the relevant arguments.
//!
//! * Control-only arguments ([`CONTROL_ONLY_ARGS`]) change how an extraction runs, not what it
//!   produces, and are left out.
//! * Canonical JSON sorts object keys at every nesting level and has no whitespace, so the
//!   digest depends neither on insertion order nor on the process.
//! * Numbers keep their JSON spelling: `5` and `5.0` are different arguments.
use std::fmt;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::{constants::FINGERPRINT_DIGEST_LEN, features::FeatureArgs};

/// Arguments that never take part in a fingerprint.
pub const CONTROL_ONLY_ARGS: [&str; 6] = [
    "save_chains",
    "chain_directory",
    "nprocesses",
    "save_output",
    "convert_to_binary",
    "output_root",
];

/// File-name prefix of one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheFingerprint(String);

impl CacheFingerprint {
    /// Use a caller-chosen prefix as is.
    pub fn from_prefix(prefix: impl Into<String>) -> Self {
        CacheFingerprint(prefix.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the fingerprint of an extraction.
///
/// Arguments
/// -----------------
/// * `survey`: survey name of the dataset.
/// * `method`: extraction method name.
/// * `args`: every keyword argument of the call; control-only keys are ignored.
pub fn cache_fingerprint(survey: &str, method: &str, args: &FeatureArgs) -> CacheFingerprint {
    CacheFingerprint(format!("{survey}_{method}_{}", args_digest(args)))
}

/// Hex digest of the relevant arguments, truncated to [`FINGERPRINT_DIGEST_LEN`].
pub fn args_digest(args: &FeatureArgs) -> String {
    let relevant = Value::Object(
        args.iter()
            .filter(|(k, _)| !CONTROL_ONLY_ARGS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    );
    let digest = format!("{:x}", Sha256::digest(canonical_json(&relevant).as_bytes()));
    digest[..FINGERPRINT_DIGEST_LEN].to_string()
}

/// Compact JSON with object keys sorted at every level.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
