//! Model Portal Library
//!
//! Web front end for three pre-trained models (coffee price regression,
//! course approval classification, KNN category recommendation) plus a
//! small portal with accounts, per-user entries and a geolocated alert map.

pub mod auth;
pub mod config;
pub mod error;
pub mod feature_extractor;
pub mod map;
pub mod metrics;
pub mod models;
pub mod server;
pub mod store;
pub mod types;
pub mod views;

pub use config::AppConfig;
pub use error::AppError;
pub use feature_extractor::FeatureExtractor;
pub use models::inference::InferenceEngine;
pub use server::AppState;
pub use store::Store;
