use serde::Deserialize;

use crate::error::AppError;
use crate::models::seller::NewSeller;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSellerRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub contact_no: Option<String>,
}

impl CreateSellerRequest {
    pub fn validate(self, user_id: i64) -> Result<NewSeller, AppError> {
        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return Err(AppError::validation("Seller name is required"));
        }
        Ok(NewSeller {
            user_id,
            name: name.to_string(),
            email: self.email,
            contact_no: self.contact_no,
        })
    }
}
