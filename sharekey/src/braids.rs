use aliri_braid::braid;

/// An email address as asserted by an identity token
#[braid(serde, ref_doc = "A borrowed reference to an [`Email`]")]
pub struct Email;

impl EmailRef {
    /// The part of the address before the first `@`
    ///
    /// Returns the whole value when there is no `@`.
    #[must_use]
    pub fn local_part(&self) -> &str {
        let email = self.as_str();
        email.split_once('@').map_or(email, |(local, _)| local)
    }
}

/// The name of a recipient in the recipient catalog
#[braid(serde, ref_doc = "A borrowed reference to a [`RecipientName`]")]
pub struct RecipientName;

impl RecipientName {
    /// Derives the recipient name for the holder of an email address
    ///
    /// The name is the local part of the address, so `alice@example.com`
    /// becomes `alice`. An address without an `@` is used whole.
    pub fn from_email(email: &EmailRef) -> Self {
        Self::new(email.local_part().to_owned())
    }
}
