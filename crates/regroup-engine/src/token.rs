// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential lifecycle: guarantee a usable access token per principal.
//!
//! A token well outside the refresh buffer is decrypted and returned with no
//! network call. One inside the buffer goes through the refresh exchange;
//! the rotated pair is persisted before the new token is handed out, so a
//! crash between refresh and join never strands an unstored credential.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use regroup_core::{PrincipalStore, RefreshApi, RefreshApiError, types::Principal};
use regroup_vault::CredentialCipher;
use secrecy::SecretString;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a principal could not produce a usable access token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The refresh grant is permanently unusable; revocation was persisted.
    #[error("authorization revoked by the member")]
    Revoked,

    /// Transient refresh failure; stored state untouched, a future run may
    /// succeed.
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
}

/// Guarantees a principal's access credential is valid before use.
pub struct TokenManager {
    cipher: Arc<CredentialCipher>,
    refresh_api: Arc<dyn RefreshApi>,
    store: Arc<dyn PrincipalStore>,
    refresh_buffer: chrono::Duration,
}

impl TokenManager {
    pub fn new(
        cipher: Arc<CredentialCipher>,
        refresh_api: Arc<dyn RefreshApi>,
        store: Arc<dyn PrincipalStore>,
        refresh_buffer: Duration,
    ) -> Self {
        Self {
            cipher,
            refresh_api,
            store,
            refresh_buffer: chrono::Duration::from_std(refresh_buffer)
                .unwrap_or_else(|_| chrono::Duration::hours(1)),
        }
    }

    /// Returns a decrypted, non-expiring-soon access token for the principal,
    /// refreshing and re-persisting the stored pair when needed.
    pub async fn ensure_fresh(&self, principal: &Principal) -> Result<SecretString, TokenError> {
        let (Some(enc_access), Some(enc_refresh)) = (
            principal.enc_access_token.as_deref(),
            principal.enc_refresh_token.as_deref(),
        ) else {
            return Err(TokenError::RefreshFailed(
                "no stored credential pair".to_string(),
            ));
        };

        if let Some(expires_at) = principal.token_expires_at {
            if expires_at - Utc::now() > self.refresh_buffer {
                debug!(principal_id = %principal.id, "stored token still fresh");
                return self
                    .cipher
                    .decrypt_token(enc_access)
                    .map_err(|e| TokenError::RefreshFailed(e.to_string()));
            }
        }

        let refresh_token = self
            .cipher
            .decrypt_token(enc_refresh)
            .map_err(|e| TokenError::RefreshFailed(e.to_string()))?;

        debug!(principal_id = %principal.id, "token inside refresh buffer; refreshing");
        match self.refresh_api.refresh(&refresh_token).await {
            Ok(grant) => {
                let access = SecretString::from(grant.access_token);
                let refresh = SecretString::from(grant.refresh_token);
                let enc_access = self
                    .cipher
                    .encrypt_token(&access)
                    .map_err(|e| TokenError::RefreshFailed(e.to_string()))?;
                let enc_refresh = self
                    .cipher
                    .encrypt_token(&refresh)
                    .map_err(|e| TokenError::RefreshFailed(e.to_string()))?;
                let expires_at = Utc::now()
                    + chrono::Duration::from_std(grant.expires_in)
                        .unwrap_or_else(|_| chrono::Duration::days(7));

                self.store
                    .store_credentials(&principal.id, enc_access, enc_refresh, expires_at)
                    .await
                    .map_err(|e| TokenError::RefreshFailed(e.to_string()))?;

                info!(principal_id = %principal.id, "credential pair rotated");
                Ok(access)
            }
            Err(RefreshApiError::InvalidGrant) => {
                warn!(principal_id = %principal.id, "refresh grant invalid; marking revoked");
                self.store
                    .mark_revoked(&principal.id)
                    .await
                    .map_err(|e| TokenError::RefreshFailed(e.to_string()))?;
                Err(TokenError::Revoked)
            }
            Err(RefreshApiError::Transient(message)) => {
                Err(TokenError::RefreshFailed(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use regroup_core::{RegroupError, TokenGrant};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct MockRefresh {
        calls: AtomicU32,
        response: Mutex<Option<Result<TokenGrant, RefreshApiError>>>,
    }

    impl MockRefresh {
        fn never_called() -> Self {
            Self {
                calls: AtomicU32::new(0),
                response: Mutex::new(None),
            }
        }

        fn with(response: Result<TokenGrant, RefreshApiError>) -> Self {
            Self {
                calls: AtomicU32::new(0),
                response: Mutex::new(Some(response)),
            }
        }
    }

    #[async_trait]
    impl RefreshApi for MockRefresh {
        async fn refresh(
            &self,
            _refresh_token: &SecretString,
        ) -> Result<TokenGrant, RefreshApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response
                .lock()
                .unwrap()
                .take()
                .expect("unexpected refresh call")
        }
    }

    #[derive(Default)]
    struct MockStore {
        stored: Mutex<Vec<(String, DateTime<Utc>)>>,
        revoked: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PrincipalStore for MockStore {
        async fn store_credentials(
            &self,
            principal_id: &str,
            _enc_access_token: Vec<u8>,
            _enc_refresh_token: Vec<u8>,
            expires_at: DateTime<Utc>,
        ) -> Result<(), RegroupError> {
            self.stored
                .lock()
                .unwrap()
                .push((principal_id.to_string(), expires_at));
            Ok(())
        }

        async fn mark_revoked(&self, principal_id: &str) -> Result<(), RegroupError> {
            self.revoked.lock().unwrap().push(principal_id.to_string());
            Ok(())
        }
    }

    fn cipher() -> Arc<CredentialCipher> {
        Arc::new(CredentialCipher::generate().unwrap())
    }

    fn principal(cipher: &CredentialCipher, expires_in_secs: i64) -> Principal {
        Principal {
            id: "u1".to_string(),
            enc_access_token: Some(
                cipher
                    .encrypt_token(&SecretString::from("stored-access".to_string()))
                    .unwrap(),
            ),
            enc_refresh_token: Some(
                cipher
                    .encrypt_token(&SecretString::from("stored-refresh".to_string()))
                    .unwrap(),
            ),
            token_expires_at: Some(Utc::now() + chrono::Duration::seconds(expires_in_secs)),
            manually_authorized: false,
            revoked: false,
        }
    }

    fn manager(
        cipher: Arc<CredentialCipher>,
        refresh: Arc<MockRefresh>,
        store: Arc<MockStore>,
    ) -> TokenManager {
        TokenManager::new(cipher, refresh, store, Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn fresh_token_is_returned_without_refresh_call() {
        let cipher = cipher();
        let refresh = Arc::new(MockRefresh::never_called());
        let store = Arc::new(MockStore::default());
        let p = principal(&cipher, 7200); // 2h out, buffer is 1h

        let token = manager(cipher, refresh.clone(), store)
            .ensure_fresh(&p)
            .await
            .unwrap();

        use secrecy::ExposeSecret;
        assert_eq!(token.expose_secret(), "stored-access");
        assert_eq!(refresh.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn token_inside_buffer_triggers_exactly_one_refresh() {
        let cipher = cipher();
        let refresh = Arc::new(MockRefresh::with(Ok(TokenGrant {
            access_token: "new-access".to_string(),
            refresh_token: "new-refresh".to_string(),
            expires_in: Duration::from_secs(604800),
        })));
        let store = Arc::new(MockStore::default());
        let p = principal(&cipher, 60); // expires in 1 minute

        let token = manager(cipher, refresh.clone(), store.clone())
            .ensure_fresh(&p)
            .await
            .unwrap();

        use secrecy::ExposeSecret;
        assert_eq!(token.expose_secret(), "new-access");
        assert_eq!(refresh.calls.load(Ordering::SeqCst), 1);

        // The rotated pair was persisted, with expiry about a week out.
        let stored = store.stored.lock().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].0, "u1");
        assert!(stored[0].1 > Utc::now() + chrono::Duration::days(6));
    }

    #[tokio::test]
    async fn invalid_grant_marks_revoked() {
        let cipher = cipher();
        let refresh = Arc::new(MockRefresh::with(Err(RefreshApiError::InvalidGrant)));
        let store = Arc::new(MockStore::default());
        let p = principal(&cipher, 60);

        let err = manager(cipher, refresh, store.clone())
            .ensure_fresh(&p)
            .await
            .unwrap_err();

        assert!(matches!(err, TokenError::Revoked));
        assert_eq!(store.revoked.lock().unwrap().as_slice(), ["u1"]);
        assert!(store.stored.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transient_refresh_failure_leaves_state_untouched() {
        let cipher = cipher();
        let refresh = Arc::new(MockRefresh::with(Err(RefreshApiError::Transient(
            "HTTP 503".to_string(),
        ))));
        let store = Arc::new(MockStore::default());
        let p = principal(&cipher, 60);

        let err = manager(cipher, refresh, store.clone())
            .ensure_fresh(&p)
            .await
            .unwrap_err();

        assert!(matches!(err, TokenError::RefreshFailed(msg) if msg.contains("503")));
        assert!(store.stored.lock().unwrap().is_empty());
        assert!(store.revoked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_credentials_fail_without_network() {
        let cipher = cipher();
        let refresh = Arc::new(MockRefresh::never_called());
        let store = Arc::new(MockStore::default());
        let p = Principal {
            id: "u1".to_string(),
            enc_access_token: None,
            enc_refresh_token: None,
            token_expires_at: None,
            manually_authorized: false,
            revoked: false,
        };

        let err = manager(cipher, refresh.clone(), store)
            .ensure_fresh(&p)
            .await
            .unwrap_err();

        assert!(matches!(err, TokenError::RefreshFailed(_)));
        assert_eq!(refresh.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_expiry_forces_refresh() {
        let cipher = cipher();
        let refresh = Arc::new(MockRefresh::with(Ok(TokenGrant {
            access_token: "new-access".to_string(),
            refresh_token: "new-refresh".to_string(),
            expires_in: Duration::from_secs(3600),
        })));
        let store = Arc::new(MockStore::default());
        let mut p = principal(&cipher, 7200);
        p.token_expires_at = None;

        manager(cipher, refresh.clone(), store)
            .ensure_fresh(&p)
            .await
            .unwrap();
        assert_eq!(refresh.calls.load(Ordering::SeqCst), 1);
    }
}
