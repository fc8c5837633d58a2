use std::{error::Error, fmt};

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sharekey::error::{ClaimsError, ProvisionError};

/// An error indicating that a verification request could not be fulfilled
#[derive(Debug)]
#[non_exhaustive]
pub enum VerifyFailed {
    /// The request body was not a JSON object with a `token` string
    MalformedRequest(JsonRejection),

    /// The presented token was not acceptable
    InvalidToken(ClaimsError),

    /// The recipient could not be provisioned
    Provisioning(ProvisionError),
}

impl VerifyFailed {
    /// The HTTP status code reported to the caller
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            Self::Provisioning(err) if err.is_identity_error() => StatusCode::UNAUTHORIZED,
            Self::Provisioning(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Writes an error followed by each of its sources, separated by `: `
fn write_chain(f: &mut fmt::Formatter<'_>, err: &dyn Error) -> fmt::Result {
    write!(f, "{err}")?;
    let mut next = err.source();
    while let Some(source) = next {
        write!(f, ": {source}")?;
        next = source.source();
    }
    Ok(())
}

impl fmt::Display for VerifyFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (prefix, cause) = match self {
            Self::MalformedRequest(_) => return f.write_str("Invalid request body"),
            Self::InvalidToken(err) | Self::Provisioning(ProvisionError::InvalidIdentity(err)) => {
                ("Invalid token", err as &dyn Error)
            }
            Self::Provisioning(ProvisionError::Query(err)) => {
                ("Error querying catalog", err as &dyn Error)
            }
            Self::Provisioning(ProvisionError::Create(err)) => {
                ("Error creating recipient", err as &dyn Error)
            }
            Self::Provisioning(ProvisionError::Rotate(err)) => {
                ("Error rotating token", err as &dyn Error)
            }
        };

        write!(f, "{prefix}: ")?;
        write_chain(f, cause)
    }
}

impl Error for VerifyFailed {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MalformedRequest(err) => Some(err),
            Self::InvalidToken(err) => Some(err),
            Self::Provisioning(err) => Some(err),
        }
    }
}

impl From<JsonRejection> for VerifyFailed {
    fn from(err: JsonRejection) -> Self {
        Self::MalformedRequest(err)
    }
}

impl From<ClaimsError> for VerifyFailed {
    fn from(err: ClaimsError) -> Self {
        Self::InvalidToken(err)
    }
}

impl From<ProvisionError> for VerifyFailed {
    fn from(err: ProvisionError) -> Self {
        Self::Provisioning(err)
    }
}

/// The body of every error response
#[derive(Debug, serde::Serialize)]
pub struct ErrorBody {
    /// A description of what went wrong
    pub error: String,
}

impl IntoResponse for VerifyFailed {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.to_string();

        if status.is_server_error() {
            tracing::error!(%status, %error, "verification failed");
        } else {
            tracing::info!(%status, %error, "verification rejected");
        }

        (status, Json(ErrorBody { error })).into_response()
    }
}
