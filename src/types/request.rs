//! Per-request inputs, coerced from raw form or JSON bodies

use crate::feature_extractor::{field_f64, field_i64, field_str, CoercionError, FormFields};
use serde::{Deserialize, Serialize};

/// Coffee price query from `/prediccion`
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuery {
    pub rainfall: f64,
    pub temperature: f64,
}

impl PriceQuery {
    pub fn from_form(form: &FormFields) -> Result<Self, CoercionError> {
        Ok(Self {
            rainfall: field_f64(form, "rainfall")?,
            temperature: field_f64(form, "temperature")?,
        })
    }
}

/// Course approval query from `/Cursos`
#[derive(Debug, Clone, PartialEq)]
pub struct CourseQuery {
    /// Hours studied
    pub horas: f64,
    /// Forum posts
    pub foros: i64,
    /// Education level name
    pub nivel: String,
}

impl CourseQuery {
    pub fn from_form(form: &FormFields) -> Result<Self, CoercionError> {
        Ok(Self {
            horas: field_f64(form, "horas")?,
            foros: field_i64(form, "foros")?,
            nivel: field_str(form, "nivel")?.to_string(),
        })
    }
}

/// Category recommendation query from `/KNN`
#[derive(Debug, Clone, PartialEq)]
pub struct KnnQuery {
    pub edad: i64,
    pub genero: String,
    /// Purchase history count
    pub historial: i64,
    /// Time on site
    pub tiempo: f64,
    /// Categories browsed
    pub categorias: i64,
}

impl KnnQuery {
    pub fn from_form(form: &FormFields) -> Result<Self, CoercionError> {
        Ok(Self {
            edad: field_i64(form, "edad")?,
            genero: field_str(form, "genero")?.to_string(),
            historial: field_i64(form, "historial")?,
            tiempo: field_f64(form, "tiempo")?,
            categorias: field_i64(form, "categorias")?,
        })
    }
}

/// Login and registration form
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// New entry form
#[derive(Debug, Clone, Deserialize)]
pub struct EntryForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Body of `POST /alerta`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AlertRequest {
    pub lat: f64,
    pub lon: f64,
}

/// Optional map center from `/mapa?lat=..&lon=..`
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MapQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}
