//! Provisioning of data-sharing recipients from identity tokens
//!
//! A caller presents an identity token issued by a trusted OIDC provider. This
//! crate pulls the caller's email out of that token, derives a recipient name
//! from it, and makes sure that a recipient with a usable bearer token exists
//! in the remote recipient catalog.
//!
//! The pieces, from the leaves up:
//!
//! * [`claims`]: extracts the [`IdentityClaims`] from a compact token and
//!   checks the issuer.
//! * [`RecipientName`]: the catalog-safe name derived from the email.
//! * [`catalog`]: the [`RecipientCatalog`] seam and the recipient model as
//!   reported by the catalog.
//! * [`provision`]: the [`Provisioner`], which decides whether a recipient
//!   must be created, have its token rotated, or can be left alone.
//!
//! **WARNING:** *The token's signature is not verified.* Claims are trusted
//! once the issuer matches the configured issuer. Deploy behind something
//! that has already authenticated the token, or not at all.
//!
//! ```
//! use aliri::{jwt, JwtRef};
//! use sharekey::claims;
//!
//! let token = JwtRef::from_str(concat!(
//!     "eyJhbGciOiJIUzI1NiJ9.",
//!     "eyJpc3MiOiJodHRwczovL2lzc3Vlci5leGFtcGxlLmNvbSIsImVtYWlsIjoiYWxpY2VAZXhhbXBsZS5jb20ifQ.",
//!     "c2lnbmF0dXJl"
//! ));
//!
//! let issuer = jwt::Issuer::from_static("https://issuer.example.com");
//! let identity = claims::extract_claims(token, &issuer).unwrap();
//!
//! assert_eq!(identity.email().as_str(), "alice@example.com");
//! assert_eq!(identity.recipient_name().as_str(), "alice");
//! ```

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod braids;
pub mod catalog;
pub mod claims;
pub mod error;
pub mod provision;

pub use braids::*;
#[doc(inline)]
pub use catalog::{Recipient, RecipientCatalog, TokenRecord};
#[doc(inline)]
pub use claims::IdentityClaims;
#[doc(inline)]
pub use provision::{ProvisioningConfig, ProvisioningOutcome, Provisioner};
