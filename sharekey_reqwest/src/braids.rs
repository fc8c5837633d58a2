use aliri_braid::braid;
use std::fmt;

fn limited_reveal(unprotected: &str, f: &mut fmt::Formatter, default_len: usize) -> fmt::Result {
    let max_len = f.width().unwrap_or(default_len);
    if max_len <= 1 {
        f.write_str("…")
    } else if max_len > unprotected.len() {
        f.write_str(unprotected)
    } else {
        match unprotected.char_indices().nth(max_len - 2) {
            Some((idx, c)) if idx + c.len_utf8() < unprotected.len() => {
                f.write_str(&unprotected[0..idx + c.len_utf8()])?;
                f.write_str("…")
            }
            _ => f.write_str(unprotected),
        }
    }
}

/// A personal access token used to authenticate to the catalog
///
/// The token is not revealed by [`Debug`][fmt::Debug] or
/// [`Display`][fmt::Display]. Use the alternate form (`{:#}`) to reveal a
/// prefix, or [`as_str()`][PersonalAccessTokenRef::as_str] to get at the
/// whole value.
#[braid(serde, debug = "owned", display = "owned")]
pub struct PersonalAccessToken;

impl fmt::Debug for PersonalAccessTokenRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            f.write_str("\"")?;
            limited_reveal(self.as_str(), &mut *f, 8)?;
            f.write_str("\"")
        } else {
            f.write_str("***PERSONAL ACCESS TOKEN***")
        }
    }
}

impl fmt::Display for PersonalAccessTokenRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            limited_reveal(self.as_str(), &mut *f, 8)
        } else {
            f.write_str("***PERSONAL ACCESS TOKEN***")
        }
    }
}
