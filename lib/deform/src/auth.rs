//! Authorization schemes.

use std::fmt;

/// Credentials sent in the `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// User session, obtained by logging in.
    Session(String),
    /// Project token. Only valid on project-scoped URLs.
    Token(String),
}

impl Auth {
    /// Header value for these credentials.
    ///
    /// ```
    /// use deform::Auth;
    ///
    /// assert_eq!(Auth::Session("abc".into()).header_value(), "SessionId abc");
    /// assert_eq!(Auth::Token("xyz".into()).header_value(), "Token xyz");
    /// ```
    #[must_use]
    pub fn header_value(&self) -> String {
        match self {
            Self::Session(id) => format!("SessionId {id}"),
            Self::Token(token) => format!("Token {token}"),
        }
    }
}

// Credentials stay out of logs.
impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session(_) => f.write_str("Session(..)"),
            Self::Token(_) => f.write_str("Token(..)"),
        }
    }
}
