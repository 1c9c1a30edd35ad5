//! Privileged access to destructive cache maintenance.

use std::fmt;
use subtle::ConstantTimeEq;

/// The configured administrator token.
#[derive(Clone)]
pub struct AdminToken(String);

impl AdminToken {
    /// Wraps a configured token. Empty tokens are rejected so that an empty header can
    /// never authorize anything.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    /// Compares `presented` against the configured token in constant time.
    #[must_use]
    pub fn verify(&self, presented: &str) -> bool {
        presented.as_bytes().ct_eq(self.0.as_bytes()).into()
    }

    /// Mints a [`MaintenanceGrant`] when `presented` matches.
    #[must_use]
    pub fn authorize(&self, presented: &str) -> Option<MaintenanceGrant> {
        self.verify(presented).then_some(MaintenanceGrant { _private: () })
    }
}

impl fmt::Debug for AdminToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdminToken(<redacted>)")
    }
}

/// Proof that the caller presented a valid administrator token.
///
/// Only [`AdminToken::authorize`] can construct one, so operations that take a
/// `&MaintenanceGrant` are unreachable from unauthenticated paths.
#[derive(Debug, Clone)]
pub struct MaintenanceGrant {
    _private: (),
}
