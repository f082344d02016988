//! Configuration: types, defaults, loading and startup validation.

pub mod persistence;
pub mod types;

pub use persistence::{load_config, save_config, validate};
pub use types::AppConfig;
