//! In-memory session credentials

use parking_lot::RwLock;

/// Access and refresh token of the signed-in player
#[derive(Clone, Default, PartialEq)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Shared holder of the current [`Credentials`]
#[derive(Debug, Default)]
pub struct CredentialStore {
    inner: RwLock<Credentials>,
}

impl CredentialStore {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            inner: RwLock::new(credentials),
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.inner.read().refresh_token.clone()
    }

    pub fn snapshot(&self) -> Credentials {
        self.inner.read().clone()
    }

    pub fn set(&self, credentials: Credentials) {
        *self.inner.write() = credentials;
    }

    pub fn clear_refresh_token(&self) {
        self.inner.write().refresh_token = None;
    }

    pub fn clear(&self) {
        *self.inner.write() = Credentials::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_tokens() {
        let credentials = Credentials::new("secret-access", Some("secret-refresh".into()));
        let printed = format!("{:?}", credentials);
        assert!(!printed.contains("secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_clear_refresh_token_keeps_access_token() {
        let store = CredentialStore::new(Credentials::new("a", Some("r".into())));
        store.clear_refresh_token();
        assert_eq!(store.access_token().as_deref(), Some("a"));
        assert_eq!(store.refresh_token(), None);
        store.clear();
        assert_eq!(store.snapshot(), Credentials::default());
    }
}
