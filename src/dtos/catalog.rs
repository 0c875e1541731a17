use serde::Deserialize;

use crate::error::AppError;
use crate::models::catalog::CatalogKind;

#[derive(Debug, Default, Deserialize)]
pub struct CreateCatalogEntryRequest {
    #[serde(default)]
    pub name: Option<String>,
}

impl CreateCatalogEntryRequest {
    pub fn validate(self, kind: CatalogKind) -> Result<String, AppError> {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(name.to_string()),
            _ => Err(AppError::validation(format!("{} name is required", kind.label()))),
        }
    }
}
