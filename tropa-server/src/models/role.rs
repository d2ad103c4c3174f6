//! User roles
//!
//! Mirrors the CHECK constraint on `usuarios.rol`. Permission helpers
//! live here so route handlers stay declarative.

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Role of a portal user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Site administrator
    Admin,
    /// Group committee member
    Comite,
    /// Section leader (staff)
    Scouter,
    /// Family account
    Familia,
    /// Youth member
    Educando,
}

impl Role {
    /// Parse from the database/API string form.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "admin" => Ok(Self::Admin),
            "comite" => Ok(Self::Comite),
            "scouter" => Ok(Self::Scouter),
            "familia" => Ok(Self::Familia),
            "educando" => Ok(Self::Educando),
            _ => Err(ValidationError::InvalidVariant {
                field: "rol",
                value: s.to_owned(),
            }),
        }
    }

    /// Database/API string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Comite => "comite",
            Self::Scouter => "scouter",
            Self::Familia => "familia",
            Self::Educando => "educando",
        }
    }

    /// May manage users and sections (committee dashboard).
    pub fn can_manage_users(&self) -> bool {
        matches!(self, Self::Admin | Self::Comite)
    }

    /// May create and edit activities and CMS pages.
    pub fn can_edit_content(&self) -> bool {
        matches!(self, Self::Admin | Self::Comite | Self::Scouter)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}
