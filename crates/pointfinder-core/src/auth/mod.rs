//! Session credentials and token refresh

mod credentials;
mod refresh;

#[cfg(test)]
mod tests;

pub use credentials::{CredentialStore, Credentials};
pub use refresh::{AuthEvent, RefreshedTokens, TokenRefreshCoordinator, TokenRefresher};

#[cfg(test)]
pub use refresh::MockTokenRefresher;
