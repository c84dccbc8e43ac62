//! Pre-trained model artifacts and the services built on them

pub mod estimators;
pub mod evaluation;
pub mod inference;
pub mod loader;

use thiserror::Error;

pub use estimators::{
    Encoder, KNeighborsClassifier, LabelEncoder, LinearRegression, LogisticRegression, Predictor,
    Scaler, StandardScaler,
};
pub use evaluation::{EvaluationReport, EvaluationSet};
pub use inference::{ApprovalClassifier, CategoryRecommender, InferenceEngine, PricePredictor};
pub use loader::ModelLoader;

/// Errors raised while validating artifacts or running inference
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("expected {expected} features, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("unknown class code {0}")]
    UnknownClass(i64),

    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),
}
