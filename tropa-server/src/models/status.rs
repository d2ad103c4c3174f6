//! Activity lifecycle status
//!
//! Mirrors the CHECK constraint on `actividades.estado`.

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Status of a calendar activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Planificada,
    Confirmada,
    Cancelada,
    Finalizada,
}

impl ActivityStatus {
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "planificada" => Ok(Self::Planificada),
            "confirmada" => Ok(Self::Confirmada),
            "cancelada" => Ok(Self::Cancelada),
            "finalizada" => Ok(Self::Finalizada),
            _ => Err(ValidationError::InvalidVariant {
                field: "estado",
                value: s.to_owned(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planificada => "planificada",
            Self::Confirmada => "confirmada",
            Self::Cancelada => "cancelada",
            Self::Finalizada => "finalizada",
        }
    }
}
