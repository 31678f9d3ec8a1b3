//! Configuration snapshot assembled from defaults, the process environment, and overrides.

pub mod settings;

pub use settings::*;
