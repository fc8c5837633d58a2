//! Provisioning of recipients for verified identities
//!
//! Each call to [`Provisioner::provision()`] looks the recipient up exactly
//! once, then makes at most one mutating call:
//!
//! | Catalog reports                          | Call            | Outcome        |
//! |------------------------------------------|-----------------|----------------|
//! | no such recipient                        | create          | `Created`      |
//! | recipient without tokens                 | rotate          | `Rotated`      |
//! | recipient whose current token expired    | rotate          | `Rotated`      |
//! | recipient whose current token is valid   | none            | `StillValid`   |
//!
//! Nothing is retried. Two concurrent requests for a new recipient may both
//! attempt creation; the catalog decides which one wins, and the loser
//! reports the catalog's response as a [`ProvisionError::Create`].

use aliri::{jwt, JwtRef};
use aliri_clock::{Clock, System};

use crate::{
    catalog::{current_token, RecipientCatalog, TokenRecord},
    claims::{self, IdentityClaims},
    error::{CatalogError, ClaimsError, ProvisionError},
    RecipientName, RecipientNameRef,
};

/// Seven days
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 7 * 24 * 60 * 60;

/// Configuration for provisioning recipients
#[derive(Clone, Debug)]
pub struct ProvisioningConfig {
    issuer: jwt::Issuer,
    token_lifetime_secs: u64,
    rotation_grace_secs: u64,
}

impl ProvisioningConfig {
    /// Constructs a configuration accepting identities from `issuer`
    ///
    /// New tokens live for [`DEFAULT_TOKEN_LIFETIME_SECS`], and on rotation
    /// the previous token is given the same period before it expires.
    pub fn new(issuer: jwt::Issuer) -> Self {
        Self {
            issuer,
            token_lifetime_secs: DEFAULT_TOKEN_LIFETIME_SECS,
            rotation_grace_secs: DEFAULT_TOKEN_LIFETIME_SECS,
        }
    }

    /// Sets the lifetime of tokens issued to newly created recipients
    pub fn with_token_lifetime(mut self, secs: u64) -> Self {
        self.token_lifetime_secs = secs;
        self
    }

    /// Sets how long a superseded token remains valid after rotation
    pub fn with_rotation_grace(mut self, secs: u64) -> Self {
        self.rotation_grace_secs = secs;
        self
    }

    /// The issuer that identity tokens must come from
    pub fn issuer(&self) -> &jwt::IssuerRef {
        &self.issuer
    }

    /// The lifetime of tokens issued to newly created recipients
    pub fn token_lifetime_secs(&self) -> u64 {
        self.token_lifetime_secs
    }

    /// How long a superseded token remains valid after rotation
    pub fn rotation_grace_secs(&self) -> u64 {
        self.rotation_grace_secs
    }
}

/// The result of provisioning a recipient
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProvisioningOutcome {
    /// A new recipient was created
    Created {
        /// The recipient
        recipient: RecipientName,
        /// The activation link of the recipient's first token
        activation_link: String,
    },
    /// The recipient was given a new token
    Rotated {
        /// The recipient
        recipient: RecipientName,
        /// The activation link of the new token
        activation_link: String,
    },
    /// The recipient already had a valid token
    StillValid {
        /// The recipient
        recipient: RecipientName,
        /// The activation link of the current token
        activation_link: String,
    },
}

impl ProvisioningOutcome {
    /// The recipient that was provisioned
    pub fn recipient(&self) -> &RecipientNameRef {
        match self {
            Self::Created { recipient, .. }
            | Self::Rotated { recipient, .. }
            | Self::StillValid { recipient, .. } => recipient,
        }
    }

    /// The activation link to hand to the caller
    pub fn activation_link(&self) -> &str {
        match self {
            Self::Created {
                activation_link, ..
            }
            | Self::Rotated {
                activation_link, ..
            }
            | Self::StillValid {
                activation_link, ..
            } => activation_link,
        }
    }

    /// Whether the catalog was changed to produce this outcome
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::StillValid { .. })
    }
}

/// Ensures that verified identities have a recipient with a usable token
#[derive(Debug)]
pub struct Provisioner<C, K = System> {
    catalog: C,
    config: ProvisioningConfig,
    clock: K,
}

impl<C> Provisioner<C> {
    /// Constructs a provisioner backed by `catalog`, using the system clock
    pub fn new(catalog: C, config: ProvisioningConfig) -> Self {
        Self {
            catalog,
            config,
            clock: System,
        }
    }
}

impl<C, K> Provisioner<C, K> {
    /// Replaces the clock used to decide whether tokens have expired
    pub fn with_clock<K2: Clock>(self, clock: K2) -> Provisioner<C, K2> {
        Provisioner {
            catalog: self.catalog,
            config: self.config,
            clock,
        }
    }

    /// The provisioning configuration
    pub fn config(&self) -> &ProvisioningConfig {
        &self.config
    }

    /// The underlying catalog
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Extracts the caller's identity from a token issued by the configured
    /// issuer
    ///
    /// # Errors
    ///
    /// See [`claims::extract_claims()`].
    pub fn verify_identity(&self, token: &JwtRef) -> Result<IdentityClaims, ClaimsError> {
        claims::extract_claims(token, &self.config.issuer)
    }
}

impl<C, K> Provisioner<C, K>
where
    C: RecipientCatalog,
    K: Clock + Send + Sync,
{
    /// Ensures that the recipient for `identity` exists and holds a token
    /// that has not expired
    ///
    /// # Errors
    ///
    /// Returns an error if the identity's email cannot name a recipient, or
    /// if any catalog call fails.
    #[tracing::instrument(
        err,
        skip(self, identity),
        fields(email = %identity.email(), recipient = tracing::field::Empty),
    )]
    pub async fn provision(
        &self,
        identity: &IdentityClaims,
    ) -> Result<ProvisioningOutcome, ProvisionError> {
        let name = identity.recipient_name();
        if name.as_str().is_empty() {
            return Err(ClaimsError::UnusableEmail.into());
        }
        tracing::Span::current().record("recipient", name.as_str());

        let existing = self
            .catalog
            .get_recipient(&name)
            .await
            .map_err(ProvisionError::Query)?;

        let Some(recipient) = existing else {
            tracing::info!("recipient does not exist, creating");
            return self.create(name).await;
        };

        match recipient.current_token() {
            None => {
                tracing::info!("recipient has no tokens, rotating");
                self.rotate(name).await
            }
            Some(token) if token.is_expired_at(self.clock.now()) => {
                tracing::info!(
                    expiration_time = token.expiration_time,
                    "recipient token has expired, rotating"
                );
                self.rotate(name).await
            }
            Some(token) => {
                tracing::debug!(
                    expiration_time = token.expiration_time,
                    "recipient token is still valid"
                );
                Ok(ProvisioningOutcome::StillValid {
                    activation_link: token.activation_url.clone(),
                    recipient: name,
                })
            }
        }
    }

    async fn create(&self, name: RecipientName) -> Result<ProvisioningOutcome, ProvisionError> {
        let recipient = self
            .catalog
            .create_recipient(&name, self.config.token_lifetime_secs)
            .await
            .map_err(ProvisionError::Create)?;

        let first = recipient
            .tokens
            .first()
            .ok_or(ProvisionError::Create(CatalogError::EmptyTokenList))?;

        tracing::info!("recipient created");

        Ok(ProvisioningOutcome::Created {
            activation_link: first.activation_url.clone(),
            recipient: name,
        })
    }

    async fn rotate(&self, name: RecipientName) -> Result<ProvisioningOutcome, ProvisionError> {
        let tokens = self
            .catalog
            .rotate_token(&name, self.config.rotation_grace_secs)
            .await
            .map_err(ProvisionError::Rotate)?;

        let latest: &TokenRecord = current_token(&tokens)
            .ok_or(ProvisionError::Rotate(CatalogError::EmptyTokenList))?;

        tracing::info!(
            expiration_time = latest.expiration_time,
            "recipient token rotated"
        );

        Ok(ProvisioningOutcome::Rotated {
            activation_link: latest.activation_url.clone(),
            recipient: name,
        })
    }
}
