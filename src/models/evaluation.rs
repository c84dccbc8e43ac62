//! Held-out evaluation of a classifier: accuracy, per-class report and
//! confusion matrix.

use super::{ModelError, estimators::Artifact};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Raw (unscaled) held-out samples with their true class codes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSet {
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<i64>,
}

impl Artifact for EvaluationSet {
    fn validate(&self) -> Result<(), ModelError> {
        if self.features.is_empty() {
            return Err(ModelError::InvalidArtifact("evaluation set is empty".into()));
        }
        if self.features.len() != self.labels.len() {
            return Err(ModelError::InvalidArtifact(format!(
                "{} evaluation rows but {} labels",
                self.features.len(),
                self.labels.len()
            )));
        }
        Ok(())
    }
}

/// Precision, recall and F1 for one class (or an average over classes).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: u64,
}

/// Static metrics computed once when the classifier is loaded.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    /// Class codes in ascending order; indexes rows and columns of `confusion`
    pub classes: Vec<i64>,
    pub per_class: Vec<ClassMetrics>,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    /// `confusion[true][predicted]`
    pub confusion: Vec<Vec<u64>>,
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl EvaluationReport {
    /// Run `predict` over every held-out row and tabulate the outcome.
    pub fn compute<F>(set: &EvaluationSet, predict: F) -> Result<Self, ModelError>
    where
        F: Fn(&[f64]) -> Result<i64, ModelError>,
    {
        let predictions = set
            .features
            .iter()
            .map(|row| predict(row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_predictions(&set.labels, &predictions))
    }

    /// Tabulate true labels against predictions of equal length.
    pub fn from_predictions(truth: &[i64], predicted: &[i64]) -> Self {
        let classes: Vec<i64> = truth
            .iter()
            .chain(predicted)
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index = |code: i64| classes.binary_search(&code).unwrap_or(0);

        let n = classes.len();
        let mut confusion = vec![vec![0u64; n]; n];
        for (&t, &p) in truth.iter().zip(predicted) {
            confusion[index(t)][index(p)] += 1;
        }

        let correct: u64 = (0..n).map(|i| confusion[i][i]).sum();
        let total = truth.len() as u64;

        let per_class: Vec<ClassMetrics> = (0..n)
            .map(|i| {
                let tp = confusion[i][i];
                let support: u64 = confusion[i].iter().sum();
                let predicted_count: u64 = confusion.iter().map(|row| row[i]).sum();
                let precision = ratio(tp, predicted_count);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    label: classes[i].to_string(),
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        let macro_avg = average(&per_class, "macro avg", total, |_| 1.0);
        let weighted_avg = average(&per_class, "weighted avg", total, |m| m.support as f64);

        Self {
            accuracy: ratio(correct, total),
            classes,
            per_class,
            macro_avg,
            weighted_avg,
            confusion,
        }
    }
}

fn average<W>(per_class: &[ClassMetrics], label: &str, support: u64, weight: W) -> ClassMetrics
where
    W: Fn(&ClassMetrics) -> f64,
{
    let total_weight: f64 = per_class.iter().map(&weight).sum();
    let mean = |field: fn(&ClassMetrics) -> f64| {
        if total_weight == 0.0 {
            0.0
        } else {
            per_class.iter().map(|m| field(m) * weight(m)).sum::<f64>() / total_weight
        }
    };
    ClassMetrics {
        label: label.to_string(),
        precision: mean(|m| m.precision),
        recall: mean(|m| m.recall),
        f1: mean(|m| m.f1),
        support,
    }
}
