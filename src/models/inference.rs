//! Named prediction services and the engine that owns them

use crate::config::ModelsConfig;
use crate::models::estimators::{
    Encoder, KNeighborsClassifier, LabelEncoder, LinearRegression, LogisticRegression, Predictor,
    Scaler, StandardScaler,
};
use crate::models::evaluation::{EvaluationReport, EvaluationSet};
use crate::models::loader::ModelLoader;
use crate::models::ModelError;
use anyhow::{Context, Result};
use tracing::{debug, info};

/// Coffee price regression over `[rainfall, temperature]`
pub struct PricePredictor {
    model: Box<dyn Predictor<Output = f64>>,
}

impl PricePredictor {
    pub fn new(model: impl Predictor<Output = f64> + 'static) -> Self {
        Self {
            model: Box::new(model),
        }
    }

    pub fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        let price = self.model.predict(features)?;
        debug!(model = "price", price, "Price predicted");
        Ok(price)
    }
}

/// Course approval classifier over scaled `[horas, foros, nivel]`
pub struct ApprovalClassifier {
    scaler: Box<dyn Scaler>,
    model: Box<dyn Predictor<Output = i64>>,
    evaluation: Option<EvaluationReport>,
}

impl ApprovalClassifier {
    pub fn new(
        scaler: impl Scaler + 'static,
        model: impl Predictor<Output = i64> + 'static,
    ) -> Self {
        Self {
            scaler: Box::new(scaler),
            model: Box::new(model),
            evaluation: None,
        }
    }

    /// Compute the static metrics shown next to the form.
    pub fn with_evaluation(mut self, set: &EvaluationSet) -> Result<Self, ModelError> {
        let report = EvaluationReport::compute(set, |row| self.predict(row))?;
        info!(
            accuracy = report.accuracy,
            samples = set.labels.len(),
            "Approval classifier evaluated"
        );
        self.evaluation = Some(report);
        Ok(self)
    }

    /// Scale the raw features and classify them
    pub fn predict(&self, features: &[f64]) -> Result<i64, ModelError> {
        let scaled = self.scaler.transform(features)?;
        self.model.predict(&scaled)
    }

    pub fn evaluation(&self) -> Option<&EvaluationReport> {
        self.evaluation.as_ref()
    }
}

/// Category recommender: scaler, k-nearest-neighbors and label encoder
pub struct CategoryRecommender {
    scaler: Box<dyn Scaler>,
    model: Box<dyn Predictor<Output = i64>>,
    encoder: Box<dyn Encoder>,
}

impl CategoryRecommender {
    pub fn new(
        scaler: impl Scaler + 'static,
        model: impl Predictor<Output = i64> + 'static,
        encoder: impl Encoder + 'static,
    ) -> Self {
        Self {
            scaler: Box::new(scaler),
            model: Box::new(model),
            encoder: Box::new(encoder),
        }
    }

    /// Recommend a category name for the raw feature vector
    pub fn recommend(&self, features: &[f64]) -> Result<String, ModelError> {
        let scaled = self.scaler.transform(features)?;
        let code = self.model.predict(&scaled)?;
        let category = self.encoder.inverse_transform(code)?;
        debug!(model = "knn", code, category = %category, "Category recommended");
        Ok(category)
    }
}

/// All prediction services, built once at startup and shared read-only
pub struct InferenceEngine {
    price: PricePredictor,
    approval: ApprovalClassifier,
    recommender: CategoryRecommender,
}

impl InferenceEngine {
    /// Load every artifact named in the configuration.
    pub fn new(config: &ModelsConfig) -> Result<Self> {
        let loader = ModelLoader::new(&config.models_dir);

        let price_model: LinearRegression = loader.load(&config.price_model, "price_model")?;

        let approval_model: LogisticRegression =
            loader.load(&config.approval_model, "approval_model")?;
        let approval_scaler: StandardScaler =
            loader.load(&config.approval_scaler, "approval_scaler")?;
        let evaluation: EvaluationSet =
            loader.load(&config.approval_evaluation, "approval_evaluation")?;
        check_pairing("approval", approval_scaler.mean.len(), approval_model.n_features())?;

        let knn_model: KNeighborsClassifier = loader.load(&config.knn_model, "knn_model")?;
        let knn_scaler: StandardScaler = loader.load(&config.knn_scaler, "knn_scaler")?;
        let knn_encoder: LabelEncoder = loader.load(&config.knn_encoder, "knn_encoder")?;
        check_pairing("knn", knn_scaler.mean.len(), knn_model.n_features())?;

        let approval = ApprovalClassifier::new(approval_scaler, approval_model)
            .with_evaluation(&evaluation)
            .context("Failed to evaluate approval classifier")?;

        let engine = Self::from_parts(
            PricePredictor::new(price_model),
            approval,
            CategoryRecommender::new(knn_scaler, knn_model, knn_encoder),
        );

        info!(
            models = ?engine.model_names(),
            models_dir = %loader.models_dir().display(),
            "Inference engine initialized"
        );

        Ok(engine)
    }

    /// Assemble an engine from already-built services
    pub fn from_parts(
        price: PricePredictor,
        approval: ApprovalClassifier,
        recommender: CategoryRecommender,
    ) -> Self {
        Self {
            price,
            approval,
            recommender,
        }
    }

    pub fn price(&self) -> &PricePredictor {
        &self.price
    }

    pub fn approval(&self) -> &ApprovalClassifier {
        &self.approval
    }

    pub fn recommender(&self) -> &CategoryRecommender {
        &self.recommender
    }

    /// Names of the loaded services
    pub fn model_names(&self) -> Vec<&'static str> {
        vec!["price", "approval", "recommender"]
    }
}

fn check_pairing(family: &str, scaler_width: usize, model_width: usize) -> Result<()> {
    if scaler_width != model_width {
        anyhow::bail!(
            "{} scaler expects {} features but the model expects {}",
            family,
            scaler_width,
            model_width
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn identity_scaler(width: usize) -> StandardScaler {
        StandardScaler {
            mean: vec![0.0; width],
            scale: vec![1.0; width],
        }
    }

    #[test]
    fn test_approval_applies_scaler_first() {
        let scaler = StandardScaler {
            mean: vec![10.0],
            scale: vec![1.0],
        };
        let model = LogisticRegression {
            coefficients: vec![1.0],
            intercept: 0.0,
            classes: vec![0, 1],
        };
        let classifier = ApprovalClassifier::new(scaler, model);
        // 12 - 10 = 2 -> positive; 8 - 10 = -2 -> negative
        assert_eq!(classifier.predict(&[12.0]).unwrap(), 1);
        assert_eq!(classifier.predict(&[8.0]).unwrap(), 0);
        assert!(classifier.evaluation().is_none());
    }

    #[test]
    fn test_approval_evaluation() {
        let model = LogisticRegression {
            coefficients: vec![1.0],
            intercept: 0.0,
            classes: vec![0, 1],
        };
        let set = EvaluationSet {
            features: vec![vec![1.0], vec![-1.0], vec![2.0], vec![-2.0]],
            labels: vec![1, 0, 0, 0],
        };
        let classifier = ApprovalClassifier::new(identity_scaler(1), model)
            .with_evaluation(&set)
            .unwrap();
        let report = classifier.evaluation().unwrap();
        assert!((report.accuracy - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_recommender_decodes_category() {
        let knn = KNeighborsClassifier {
            k: 1,
            samples: vec![vec![0.0, 0.0], vec![10.0, 10.0]],
            labels: vec![0, 1],
        };
        let encoder = LabelEncoder {
            classes: vec!["Deportes".into(), "Tecnologia".into()],
        };
        let recommender = CategoryRecommender::new(identity_scaler(2), knn, encoder);
        assert_eq!(recommender.recommend(&[9.0, 9.5]).unwrap(), "Tecnologia");
        assert!(recommender.recommend(&[1.0]).is_err());
    }

    #[test]
    fn test_engine_loads_shipped_artifacts() {
        let config = crate::config::AppConfig::default().models;
        let config = ModelsConfig {
            models_dir: concat!(env!("CARGO_MANIFEST_DIR"), "/models").to_string(),
            ..config
        };
        let engine = InferenceEngine::new(&config).unwrap();
        assert_eq!(engine.model_names().len(), 3);
        assert!(engine.approval().evaluation().is_some());
        assert!(engine.price().predict(&[150.0, 22.0]).is_ok());
    }

    #[test]
    fn test_engine_fails_on_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("linear_regression_model.json"),
            r#"{"coefficients": [1.0, 2.0], "intercept": 0.0}"#,
        )
        .unwrap();
        let config = ModelsConfig {
            models_dir: dir.path().display().to_string(),
            ..crate::config::AppConfig::default().models
        };
        assert!(InferenceEngine::new(&config).is_err());
    }

    #[test]
    fn test_scaler_model_pairing() {
        assert!(check_pairing("knn", 5, 5).is_ok());
        assert!(check_pairing("knn", 4, 5).is_err());
    }
}
