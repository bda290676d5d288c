//! Identity records, login requests and verified claims.

use serde::{Deserialize, Serialize};

/// A user record as held by the credential store.
///
/// The on-disk format uses PascalCase keys (`Username`, `Password`,
/// `Name`, `Code`); lower-case keys are accepted too.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Identity {
    #[serde(alias = "username")]
    pub username: String,
    #[serde(alias = "password")]
    password: String,
    #[serde(alias = "name")]
    pub display_name: String,
    #[serde(alias = "code")]
    pub code: String,
}

impl Identity {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        display_name: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            display_name: display_name.into(),
            code: code.into(),
        }
    }

    /// Exact username and password match.
    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password_matches(password)
    }

    /// Exact, case-sensitive comparison against the stored secret.
    pub fn password_matches(&self, candidate: &str) -> bool {
        constant_time_eq(self.password.as_bytes(), candidate.as_bytes())
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("username", &self.username)
            .field("display_name", &self.display_name)
            .field("code", &self.code)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default, alias = "Username")]
    pub username: String,
    #[serde(default, alias = "Password")]
    pub password: String,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both fields must contain something other than whitespace.
    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.trim().is_empty()
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Claims extracted from a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claims {
    pub name: String,
    pub code: String,
}

impl From<&Identity> for Claims {
    fn from(identity: &Identity) -> Self {
        Self {
            name: identity.display_name.clone(),
            code: identity.code.clone(),
        }
    }
}

/// Constant-time byte comparison so a mismatch position is not observable
/// through response timing. Lengths still leak.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
