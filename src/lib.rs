pub mod constants;
pub mod env_state;
pub mod features;
pub mod fits;
pub mod lightcurves;
pub mod lightfeat_errors;

pub use constants::ObjectId;
pub use features::{
    feature_cache::{CacheStatus, CachedFeatures, FeatureCache},
    Dataset, Extractor, FeatureArgs, FeatureTable,
};
pub use lightcurves::cadence_data::{CadenceData, LoadOptions, LoadPolicy, ParseWorkers};
pub use lightfeat_errors::LightfeatError;
