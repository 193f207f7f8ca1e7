//! Admin sessions: one shared password, opaque bearer tokens held in memory.
//! Tokens do not expire and are lost on restart.

use parking_lot::RwLock;
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Default)]
pub struct TokenStore {
    tokens: RwLock<HashSet<String>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check `password` against the configured admin password and mint a
    /// token on success. No configured password means nobody can log in.
    pub fn login(&self, configured: Option<&str>, password: &str) -> Option<String> {
        match configured {
            Some(expected) if !expected.is_empty() && expected == password => {
                let token = Uuid::new_v4().to_string();
                self.tokens.write().insert(token.clone());
                log::info!("[AUTH] Admin session issued");
                Some(token)
            }
            Some(_) => {
                log::warn!("[AUTH] Rejected login with wrong password");
                None
            }
            None => {
                log::warn!("[AUTH] Login attempted but ADMIN_PASSWORD is not set");
                None
            }
        }
    }

    pub fn is_valid(&self, token: &str) -> bool {
        self.tokens.read().contains(token)
    }
}

/// `Authorization: Bearer <token>` value, if present
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
