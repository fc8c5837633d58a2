//! The recipient catalog and the recipients it holds
//!
//! Recipients and their tokens are owned by the remote catalog. The types
//! here mirror what the catalog reports and are only held for the duration
//! of a single request.

use std::cmp::Ordering;

use aliri_clock::UnixTime;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{error::CatalogError, RecipientName, RecipientNameRef};

/// The manner in which a recipient authenticates to the catalog
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthenticationType {
    /// Bearer tokens obtained through an activation link
    Token,
    /// Catalog-to-catalog sharing
    Databricks,
    /// Any other authentication type, or none reported
    #[default]
    #[serde(other)]
    Unknown,
}

/// A recipient as reported by the catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// The recipient's name
    pub name: RecipientName,

    /// How the recipient authenticates
    #[serde(default)]
    pub authentication_type: AuthenticationType,

    /// The owner of the recipient
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// The catalog's identifier for the recipient
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// When the recipient was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,

    /// When the recipient was last updated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,

    /// The recipient's tokens, in the order the catalog reported them
    #[serde(default)]
    pub tokens: Vec<TokenRecord>,
}

impl Recipient {
    /// The recipient's current token, if it has any
    ///
    /// See [`current_token()`].
    pub fn current_token(&self) -> Option<&TokenRecord> {
        current_token(&self.tokens)
    }
}

/// A bearer token issued to a recipient
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// The catalog's identifier for the token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The link the recipient follows to download the token
    #[serde(default)]
    pub activation_url: String,

    /// When the token expires, in seconds since the Unix epoch
    ///
    /// A token without an expiration time never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<i64>,

    /// When the token was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,

    /// Who created the token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    /// When the token was last updated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,

    /// Who last updated the token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl TokenRecord {
    /// Whether the token has expired as of the provided time
    ///
    /// A token expiring exactly at `now` is still valid.
    #[must_use]
    pub fn is_expired_at(&self, now: UnixTime) -> bool {
        let now = i64::try_from(now.0).unwrap_or(i64::MAX);
        matches!(self.expiration_time, Some(exp) if exp < now)
    }

    fn cmp_expiration(&self, other: &Self) -> Ordering {
        match (self.expiration_time, other.expiration_time) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(&b),
        }
    }
}

/// Selects the current token from a list of tokens
///
/// The current token is the one that expires last, regardless of the order
/// in which the catalog listed them. Tokens without an expiration time sort
/// after all others. When several tokens tie, the last one listed wins.
pub fn current_token(tokens: &[TokenRecord]) -> Option<&TokenRecord> {
    tokens.iter().max_by(|a, b| a.cmp_expiration(b))
}

/// A catalog of data-sharing recipients
///
/// Implementations perform exactly one remote call per method and never
/// retry.
#[async_trait]
pub trait RecipientCatalog: Send + Sync {
    /// Looks up a recipient by name
    ///
    /// Returns `Ok(None)` when the catalog has no such recipient.
    async fn get_recipient(
        &self,
        name: &RecipientNameRef,
    ) -> Result<Option<Recipient>, CatalogError>;

    /// Creates a token-authenticated recipient whose first token is valid
    /// for `token_lifetime_secs`
    ///
    /// The returned recipient has at least one token.
    async fn create_recipient(
        &self,
        name: &RecipientNameRef,
        token_lifetime_secs: u64,
    ) -> Result<Recipient, CatalogError>;

    /// Issues a new token for a recipient, letting its existing token live
    /// for another `existing_token_grace_secs`
    ///
    /// The returned list is never empty.
    async fn rotate_token(
        &self,
        name: &RecipientNameRef,
        existing_token_grace_secs: u64,
    ) -> Result<Vec<TokenRecord>, CatalogError>;
}

#[async_trait]
impl<T: RecipientCatalog + ?Sized> RecipientCatalog for std::sync::Arc<T> {
    async fn get_recipient(
        &self,
        name: &RecipientNameRef,
    ) -> Result<Option<Recipient>, CatalogError> {
        (**self).get_recipient(name).await
    }

    async fn create_recipient(
        &self,
        name: &RecipientNameRef,
        token_lifetime_secs: u64,
    ) -> Result<Recipient, CatalogError> {
        (**self).create_recipient(name, token_lifetime_secs).await
    }

    async fn rotate_token(
        &self,
        name: &RecipientNameRef,
        existing_token_grace_secs: u64,
    ) -> Result<Vec<TokenRecord>, CatalogError> {
        (**self).rotate_token(name, existing_token_grace_secs).await
    }
}
