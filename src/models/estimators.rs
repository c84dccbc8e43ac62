//! Fitted estimators and the capability traits they implement.
//!
//! Each estimator is deserialized from a JSON artifact exported after
//! training. Only the inference half lives here: parameters are read,
//! validated once, and never mutated afterwards.

use super::ModelError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A fitted model that maps a feature vector to a prediction.
pub trait Predictor: Send + Sync {
    type Output;

    /// Number of features the model was trained on
    fn n_features(&self) -> usize;

    fn predict(&self, features: &[f64]) -> Result<Self::Output, ModelError>;
}

/// A fitted preprocessing transform applied before prediction.
pub trait Scaler: Send + Sync {
    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ModelError>;
}

/// Maps encoded class codes back to their labels.
pub trait Encoder: Send + Sync {
    fn inverse_transform(&self, code: i64) -> Result<String, ModelError>;
}

/// Parameter checks run once when an artifact is loaded.
pub trait Artifact {
    fn validate(&self) -> Result<(), ModelError>;
}

fn check_len(expected: usize, features: &[f64]) -> Result<(), ModelError> {
    if features.len() != expected {
        return Err(ModelError::DimensionMismatch {
            expected,
            got: features.len(),
        });
    }
    Ok(())
}

fn dot(coefficients: &[f64], features: &[f64]) -> f64 {
    coefficients.iter().zip(features).map(|(w, x)| w * x).sum()
}

/// Ordinary least squares regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Feature names in training order
    #[serde(default)]
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl Predictor for LinearRegression {
    type Output = f64;

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        check_len(self.n_features(), features)?;
        Ok(self.intercept + dot(&self.coefficients, features))
    }
}

impl Artifact for LinearRegression {
    fn validate(&self) -> Result<(), ModelError> {
        if self.coefficients.is_empty() {
            return Err(ModelError::InvalidArtifact(
                "linear regression has no coefficients".into(),
            ));
        }
        if !self.feature_names.is_empty() && self.feature_names.len() != self.coefficients.len() {
            return Err(ModelError::InvalidArtifact(format!(
                "{} feature names for {} coefficients",
                self.feature_names.len(),
                self.coefficients.len()
            )));
        }
        Ok(())
    }
}

/// Binary logistic regression classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Class codes for the negative and positive outcome
    #[serde(default = "default_binary_classes")]
    pub classes: Vec<i64>,
}

fn default_binary_classes() -> Vec<i64> {
    vec![0, 1]
}

impl LogisticRegression {
    /// Probability of the positive class
    pub fn predict_proba(&self, features: &[f64]) -> Result<f64, ModelError> {
        check_len(self.coefficients.len(), features)?;
        let z = self.intercept + dot(&self.coefficients, features);
        Ok(1.0 / (1.0 + (-z).exp()))
    }
}

impl Predictor for LogisticRegression {
    type Output = i64;

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict(&self, features: &[f64]) -> Result<i64, ModelError> {
        let p = self.predict_proba(features)?;
        Ok(if p >= 0.5 { self.classes[1] } else { self.classes[0] })
    }
}

impl Artifact for LogisticRegression {
    fn validate(&self) -> Result<(), ModelError> {
        if self.coefficients.is_empty() {
            return Err(ModelError::InvalidArtifact(
                "logistic regression has no coefficients".into(),
            ));
        }
        if self.classes.len() != 2 {
            return Err(ModelError::InvalidArtifact(format!(
                "binary classifier needs 2 classes, found {}",
                self.classes.len()
            )));
        }
        Ok(())
    }
}

/// k-nearest-neighbors classifier over already-scaled samples
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNeighborsClassifier {
    pub k: usize,
    /// Fitted samples, one row per training example
    pub samples: Vec<Vec<f64>>,
    /// Encoded class code for each sample
    pub labels: Vec<i64>,
}

impl Predictor for KNeighborsClassifier {
    type Output = i64;

    fn n_features(&self) -> usize {
        self.samples.first().map(Vec::len).unwrap_or(0)
    }

    /// Majority vote among the `k` nearest samples; ties go to the lowest code.
    fn predict(&self, features: &[f64]) -> Result<i64, ModelError> {
        check_len(self.n_features(), features)?;

        let mut distances: Vec<(f64, i64)> = self
            .samples
            .iter()
            .zip(&self.labels)
            .map(|(sample, &label)| {
                let d2: f64 = sample
                    .iter()
                    .zip(features)
                    .map(|(a, b)| (a - b).powi(2))
                    .sum();
                (d2, label)
            })
            .collect();
        distances.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut votes: BTreeMap<i64, usize> = BTreeMap::new();
        for (_, label) in distances.iter().take(self.k) {
            *votes.entry(*label).or_insert(0) += 1;
        }

        let mut best: Option<(i64, usize)> = None;
        for (label, count) in votes {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((label, count));
            }
        }
        best.map(|(label, _)| label)
            .ok_or_else(|| ModelError::InvalidArtifact("no fitted samples".into()))
    }
}

impl Artifact for KNeighborsClassifier {
    fn validate(&self) -> Result<(), ModelError> {
        if self.k == 0 {
            return Err(ModelError::InvalidArtifact("k must be at least 1".into()));
        }
        if self.samples.is_empty() {
            return Err(ModelError::InvalidArtifact("no fitted samples".into()));
        }
        if self.samples.len() != self.labels.len() {
            return Err(ModelError::InvalidArtifact(format!(
                "{} samples but {} labels",
                self.samples.len(),
                self.labels.len()
            )));
        }
        let width = self.n_features();
        if self.samples.iter().any(|s| s.len() != width) {
            return Err(ModelError::InvalidArtifact("ragged sample matrix".into()));
        }
        Ok(())
    }
}

/// Standardization by per-feature mean and scale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl Scaler for StandardScaler {
    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_len(self.mean.len(), features)?;
        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| {
                // Constant features are fitted with scale 0; leave them centered only.
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect())
    }
}

impl Artifact for StandardScaler {
    fn validate(&self) -> Result<(), ModelError> {
        if self.mean.is_empty() || self.mean.len() != self.scale.len() {
            return Err(ModelError::InvalidArtifact(format!(
                "scaler has {} means and {} scales",
                self.mean.len(),
                self.scale.len()
            )));
        }
        Ok(())
    }
}

/// Index-based label encoding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl Encoder for LabelEncoder {
    fn inverse_transform(&self, code: i64) -> Result<String, ModelError> {
        usize::try_from(code)
            .ok()
            .and_then(|i| self.classes.get(i))
            .cloned()
            .ok_or(ModelError::UnknownClass(code))
    }
}

impl Artifact for LabelEncoder {
    fn validate(&self) -> Result<(), ModelError> {
        if self.classes.is_empty() {
            return Err(ModelError::InvalidArtifact("encoder has no classes".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_regression_predict() {
        let model = LinearRegression {
            feature_names: vec!["rainfall".into(), "temperature".into()],
            coefficients: vec![0.5, 2.0],
            intercept: 10.0,
        };
        let value = model.predict(&[4.0, 3.0]).unwrap();
        assert!((value - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_dimension_mismatch() {
        let model = LinearRegression {
            feature_names: vec![],
            coefficients: vec![1.0, 1.0],
            intercept: 0.0,
        };
        assert_eq!(
            model.predict(&[1.0]),
            Err(ModelError::DimensionMismatch { expected: 2, got: 1 })
        );
    }

    #[test]
    fn test_logistic_threshold() {
        let model = LogisticRegression {
            coefficients: vec![1.0],
            intercept: 0.0,
            classes: vec![0, 1],
        };
        assert_eq!(model.predict(&[0.0]).unwrap(), 1); // p == 0.5
        assert_eq!(model.predict(&[-0.1]).unwrap(), 0);
        assert!((model.predict_proba(&[0.0]).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_knn_majority_vote() {
        let model = KNeighborsClassifier {
            k: 3,
            samples: vec![vec![0.0], vec![0.1], vec![0.2], vec![5.0], vec![5.1]],
            labels: vec![2, 2, 1, 1, 1],
        };
        assert_eq!(model.predict(&[0.05]).unwrap(), 2);
        assert_eq!(model.predict(&[5.05]).unwrap(), 1);
    }

    #[test]
    fn test_knn_tie_goes_to_lowest_code() {
        let model = KNeighborsClassifier {
            k: 2,
            samples: vec![vec![1.0], vec![-1.0]],
            labels: vec![3, 1],
        };
        assert_eq!(model.predict(&[0.0]).unwrap(), 1);
    }

    #[test]
    fn test_knn_validation() {
        let model = KNeighborsClassifier {
            k: 1,
            samples: vec![vec![0.0, 1.0], vec![1.0]],
            labels: vec![0, 1],
        };
        assert!(model.validate().is_err());

        let zero_k = KNeighborsClassifier {
            k: 0,
            samples: vec![vec![0.0]],
            labels: vec![0],
        };
        assert!(zero_k.validate().is_err());
    }

    #[test]
    fn test_standard_scaler() {
        let scaler = StandardScaler {
            mean: vec![10.0, 5.0],
            scale: vec![2.0, 0.0],
        };
        assert_eq!(scaler.transform(&[14.0, 7.0]).unwrap(), vec![2.0, 2.0]);
        assert!(scaler.transform(&[1.0]).is_err());
    }

    #[test]
    fn test_label_encoder() {
        let encoder = LabelEncoder {
            classes: vec!["Deportes".into(), "Moda".into()],
        };
        assert_eq!(encoder.inverse_transform(1).unwrap(), "Moda");
        assert_eq!(encoder.inverse_transform(2), Err(ModelError::UnknownClass(2)));
        assert_eq!(encoder.inverse_transform(-1), Err(ModelError::UnknownClass(-1)));
    }
}
