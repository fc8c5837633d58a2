//! Common errors

use std::error::Error as StdError;

use thiserror::Error;

/// An identity token was rejected
#[derive(Debug, Error)]
pub enum ClaimsError {
    /// The token does not have a header, payload, and signature, or its
    /// payload is not base64url-encoded JSON
    #[error("malformed token")]
    MalformedToken {
        /// Why the token could not be decomposed
        #[source]
        source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    },

    /// The token was issued by an issuer other than the configured one
    #[error("token issuer is invalid")]
    IssuerMismatch,

    /// A required claim is absent or not a string
    #[error("{0} not found in token")]
    MissingClaim(&'static str),

    /// The email claim cannot be turned into a recipient name
    #[error("email claim has no local part")]
    UnusableEmail,
}

impl ClaimsError {
    /// Whether the token was rejected for its structure
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedToken { .. })
    }

    /// Whether the token was rejected for its issuer
    #[must_use]
    pub fn is_issuer_mismatch(&self) -> bool {
        matches!(self, Self::IssuerMismatch)
    }

    /// Whether the token was rejected for a missing claim
    #[must_use]
    pub fn is_missing_claim(&self) -> bool {
        matches!(self, Self::MissingClaim(_))
    }
}

pub(crate) fn malformed_token() -> ClaimsError {
    ClaimsError::MalformedToken { source: None }
}

pub(crate) fn malformed_payload(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> ClaimsError {
    ClaimsError::MalformedToken {
        source: Some(source.into()),
    }
}

/// An error while talking to the recipient catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The request could not be sent, or the response could not be read
    #[error("error sending request to catalog")]
    Transport {
        /// The underlying transport error
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    /// The response body was not the expected JSON
    #[error("error decoding catalog response")]
    Decode(#[from] serde_json::Error),

    /// The catalog answered with a status that is not expected for this call
    #[error("unexpected catalog response: {status} - {body}")]
    UnexpectedResponse {
        /// The HTTP status code
        status: u16,
        /// The body of the response
        body: String,
    },

    /// The catalog reported success but returned no tokens
    #[error("catalog returned an empty token list")]
    EmptyTokenList,
}

impl CatalogError {
    /// Wraps a transport error
    pub fn transport(source: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        Self::Transport {
            source: source.into(),
        }
    }

    /// The HTTP status of an unexpected response, if that is what this is
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedResponse { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Provisioning a recipient failed
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The identity presented cannot be used to name a recipient
    #[error("invalid token")]
    InvalidIdentity(#[from] ClaimsError),

    /// Looking up the recipient failed
    #[error("error querying catalog")]
    Query(#[source] CatalogError),

    /// Creating the recipient failed
    #[error("error creating recipient")]
    Create(#[source] CatalogError),

    /// Rotating the recipient's token failed
    #[error("error rotating token")]
    Rotate(#[source] CatalogError),
}

impl ProvisionError {
    /// Whether the error is the caller's fault rather than the catalog's
    #[must_use]
    pub fn is_identity_error(&self) -> bool {
        matches!(self, Self::InvalidIdentity(_))
    }

    /// The catalog error behind this failure, if any
    #[must_use]
    pub fn catalog_error(&self) -> Option<&CatalogError> {
        match self {
            Self::InvalidIdentity(_) => None,
            Self::Query(e) | Self::Create(e) | Self::Rotate(e) => Some(e),
        }
    }
}
