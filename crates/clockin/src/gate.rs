//! Gallery passcode.
//!
//! A plain equality check that keeps casual users out of the gallery. It is
//! not a credential system: the code is stored in the configuration as-is.

use crate::error::{Error, Result};

/// The numeric code guarding the gallery.
#[derive(Clone, PartialEq, Eq)]
pub struct Passcode(String);

impl Passcode {
    /// Wrap a configured code.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Check an attempt against the code.
    ///
    /// Surrounding whitespace in the attempt is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PasscodeRejected`] on mismatch.
    pub fn verify(&self, attempt: &str) -> Result<()> {
        if attempt.trim() == self.0 {
            Ok(())
        } else {
            Err(Error::PasscodeRejected)
        }
    }
}

impl std::fmt::Debug for Passcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Passcode(****)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_accepts_match() {
        assert!(Passcode::new("1234").verify("1234").is_ok());
        assert!(Passcode::new("1234").verify(" 1234\n").is_ok());
    }

    #[test]
    fn test_verify_rejects_mismatch() {
        let code = Passcode::new("1234");
        assert!(matches!(code.verify("4321"), Err(Error::PasscodeRejected)));
        assert!(code.verify("").is_err());
        assert!(code.verify("12345").is_err());
    }

    #[test]
    fn test_debug_hides_code() {
        let debug = format!("{:?}", Passcode::new("9876"));
        assert!(!debug.contains("9876"));
    }
}
