use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::error_responses::AppError;

pub const MERCHANT_ID_HEADER: &str = "x-merchant-id";

/// Tenant the request acts for, taken from the `X-Merchant-Id` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerchantContext {
    pub merchant_id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for MerchantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(MERCHANT_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Missing X-Merchant-Id header".to_string()))?;

        let merchant_id = header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid X-Merchant-Id header".to_string()))?
            .trim();

        if merchant_id.is_empty() {
            return Err(AppError::Unauthorized(
                "Invalid X-Merchant-Id header".to_string(),
            ));
        }

        Ok(MerchantContext {
            merchant_id: merchant_id.to_string(),
        })
    }
}
