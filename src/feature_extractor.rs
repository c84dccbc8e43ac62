//! Form coercion and categorical encoding for model inference.
//!
//! Features are assembled in the exact order each model was trained on.

use crate::types::request::{CourseQuery, KnnQuery, PriceQuery};
use std::collections::HashMap;
use thiserror::Error;

/// Raw form submission, field name to value
pub type FormFields = HashMap<String, String>;

/// A form field that is missing or does not parse as the expected type
#[derive(Debug, Error, PartialEq)]
pub enum CoercionError {
    #[error("missing form field '{0}'")]
    Missing(String),

    #[error("invalid integer for '{field}': {value:?}")]
    InvalidInt { field: String, value: String },

    #[error("invalid number for '{field}': {value:?}")]
    InvalidFloat { field: String, value: String },
}

/// Code used for education levels outside the known table
pub const UNKNOWN_EDUCATION_CODE: i64 = 0;

/// Education levels the approval model was trained with
const EDUCATION_LEVELS: [(&str, i64); 3] = [("Secundaria", 0), ("Tecnico", 1), ("Universitario", 2)];

/// Encode an education level; unrecognized values fall back to code 0.
pub fn encode_education(level: &str) -> i64 {
    EDUCATION_LEVELS
        .iter()
        .find(|(name, _)| *name == level)
        .map(|(_, code)| *code)
        .unwrap_or(UNKNOWN_EDUCATION_CODE)
}

/// Encode gender: `F` is 1, anything else 0.
pub fn encode_gender(gender: &str) -> i64 {
    if gender == "F" {
        1
    } else {
        0
    }
}

/// Raw string value of a required field
pub fn field_str<'a>(form: &'a FormFields, field: &str) -> Result<&'a str, CoercionError> {
    form.get(field)
        .map(String::as_str)
        .ok_or_else(|| CoercionError::Missing(field.to_string()))
}

/// Required integer field; fractional input is rejected.
pub fn field_i64(form: &FormFields, field: &str) -> Result<i64, CoercionError> {
    let raw = field_str(form, field)?;
    raw.trim()
        .parse::<i64>()
        .map_err(|_| CoercionError::InvalidInt {
            field: field.to_string(),
            value: raw.to_string(),
        })
}

/// Required floating point field
pub fn field_f64(form: &FormFields, field: &str) -> Result<f64, CoercionError> {
    let raw = field_str(form, field)?;
    raw.trim()
        .parse::<f64>()
        .map_err(|_| CoercionError::InvalidFloat {
            field: field.to_string(),
            value: raw.to_string(),
        })
}

/// Feature extractor that turns coerced requests into model input vectors.
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// `[rainfall, temperature]`
    pub fn price(&self, query: &PriceQuery) -> Vec<f64> {
        vec![query.rainfall, query.temperature]
    }

    /// `[horas, foros, nivel]` with the education level encoded
    pub fn course(&self, query: &CourseQuery) -> Vec<f64> {
        vec![
            query.horas,
            query.foros as f64,
            encode_education(&query.nivel) as f64,
        ]
    }

    /// `[edad, genero, historial, tiempo, categorias]` with gender encoded
    pub fn knn(&self, query: &KnnQuery) -> Vec<f64> {
        vec![
            query.edad as f64,
            encode_gender(&query.genero) as f64,
            query.historial as f64,
            query.tiempo,
            query.categorias as f64,
        ]
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn form(pairs: &[(&str, &str)]) -> FormFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_education_table() {
        assert_eq!(encode_education("Secundaria"), 0);
        assert_eq!(encode_education("Tecnico"), 1);
        assert_eq!(encode_education("Universitario"), 2);
        assert_eq!(encode_education("Doctorado"), 0);
        assert_eq!(encode_education("tecnico"), 0);
    }

    #[test]
    fn test_gender_encoding() {
        assert_eq!(encode_gender("F"), 1);
        assert_eq!(encode_gender("M"), 0);
        assert_eq!(encode_gender("f"), 0);
    }

    #[test]
    fn test_field_coercion() {
        let form = form(&[("foros", " 7 "), ("horas", "3"), ("bad", "3.5")]);
        assert_eq!(field_i64(&form, "foros").unwrap(), 7);
        assert_eq!(field_f64(&form, "horas").unwrap(), 3.0);
        assert!(matches!(
            field_i64(&form, "bad"),
            Err(CoercionError::InvalidInt { .. })
        ));
        assert_eq!(
            field_f64(&form, "absent"),
            Err(CoercionError::Missing("absent".into()))
        );
    }

    #[test]
    fn test_course_features_order() {
        let query = CourseQuery {
            horas: 12.5,
            foros: 4,
            nivel: "Universitario".into(),
        };
        assert_eq!(FeatureExtractor::new().course(&query), vec![12.5, 4.0, 2.0]);
    }

    #[test]
    fn test_knn_features_order() {
        let query = KnnQuery {
            edad: 30,
            genero: "F".into(),
            historial: 12,
            tiempo: 25.5,
            categorias: 3,
        };
        assert_eq!(
            FeatureExtractor::new().knn(&query),
            vec![30.0, 1.0, 12.0, 25.5, 3.0]
        );
    }

    proptest! {
        #[test]
        fn prop_unknown_levels_map_to_zero(level in "[a-zA-Z]{0,16}") {
            prop_assume!(!EDUCATION_LEVELS.iter().any(|(name, _)| *name == level));
            prop_assert_eq!(encode_education(&level), UNKNOWN_EDUCATION_CODE);
        }

        #[test]
        fn prop_known_levels_are_stable(index in 0usize..3) {
            let (name, code) = EDUCATION_LEVELS[index];
            prop_assert_eq!(encode_education(name), code);
            prop_assert_eq!(encode_education(name), encode_education(name));
        }
    }
}
