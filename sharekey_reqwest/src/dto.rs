//! DTOs for requests to the recipients API

use serde::{Deserialize, Serialize};
use sharekey::{catalog::AuthenticationType, RecipientNameRef, TokenRecord};

#[derive(Debug, Serialize)]
pub(crate) struct CreateRecipientRequest<'a> {
    pub name: &'a RecipientNameRef,
    pub authentication_type: AuthenticationType,
    pub token_expiration_time: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct RotateTokenRequest {
    pub existing_token_expire_in_seconds: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RotateTokenResponse {
    #[serde(default)]
    pub tokens: Vec<TokenRecord>,
}
