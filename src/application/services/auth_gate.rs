//! Verification gate in front of live-data intents.
//!
//! A conversation is verified either because the channel vouches for the user
//! (an authenticated session) or because the user supplied an identifier the
//! identity verifier confirmed. Verification state lives in the cache under
//! the user-context TTL class, so it expires on its own.

use crate::application::services::cache_service::CacheService;
use crate::application::services::upstream::{call_with_retry, CallBudget};
use crate::domain::entities::{
    AuthMethod, AuthenticationState, CacheKey, CacheType, PendingChallenge, UserContext,
};
use crate::domain::errors::UpstreamError;
use crate::domain::ports::identity_verifier::IdentityVerifier;
use crate::domain::ports::time_service::TimeService;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

const COLLABORATOR: &str = "identity_verifier";
const AUTH_SCOPE: &str = "auth_state";
const CHALLENGE_SCOPE: &str = "auth_challenge";

fn identifier_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    // Member id (AB123456) or an email address
    PATTERN
        .get_or_init(|| {
            Regex::new(r"(?i)\b([a-z]{2}\d{6}|[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,})\b").ok()
        })
        .as_ref()
}

/// First thing in `text` that looks like a customer identifier.
pub fn extract_identifier(text: &str) -> Option<String> {
    identifier_pattern()?
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub struct AuthGate {
    cache: Arc<CacheService>,
    verifier: Arc<dyn IdentityVerifier>,
    clock: Arc<dyn TimeService>,
    budget: CallBudget,
}

impl AuthGate {
    pub fn new(
        cache: Arc<CacheService>,
        verifier: Arc<dyn IdentityVerifier>,
        clock: Arc<dyn TimeService>,
        deadline: Duration,
        retry_factor: f64,
    ) -> Self {
        Self {
            cache,
            verifier,
            clock,
            budget: CallBudget::new(COLLABORATOR, deadline, retry_factor),
        }
    }

    /// Current verification state for this caller. An authenticated channel
    /// session verifies the conversation on first sight and replaces any
    /// state left by a different user.
    pub fn state(&self, conversation_id: &str, user_context: &UserContext) -> AuthenticationState {
        let now = self.clock.now();
        if let Some(state) = self.cached_state(conversation_id) {
            if state.is_valid_at(now) && state.belongs_to(user_context) {
                return state;
            }
        }

        match (&user_context.user_id, user_context.authenticated) {
            (Some(user_id), true) => {
                let state = self.verified_state(conversation_id, user_id, AuthMethod::ChannelSession);
                self.store_state(&state);
                state
            }
            _ => AuthenticationState::unverified(conversation_id),
        }
    }

    pub fn is_authenticated(&self, conversation_id: &str, user_context: &UserContext) -> bool {
        self.state(conversation_id, user_context).verified
    }

    /// Verify a customer-supplied identifier for this conversation.
    ///
    /// `Ok` with an unverified state means the verifier did not recognize the
    /// identifier; `Err` means the verifier itself failed.
    #[tracing::instrument(skip(self, identifier))]
    pub async fn verify(
        &self,
        identifier: &str,
        conversation_id: &str,
    ) -> Result<AuthenticationState, UpstreamError> {
        let verifier = &self.verifier;
        let subject = call_with_retry(self.budget, move || verifier.verify(identifier)).await?;

        match subject {
            Some(subject) => {
                tracing::info!("Conversation {} verified as {}", conversation_id, subject);
                let state = self.verified_state(conversation_id, &subject, AuthMethod::IdentifierLookup);
                self.store_state(&state);
                Ok(state)
            }
            None => {
                tracing::info!("Identifier for conversation {} was not recognized", conversation_id);
                Ok(AuthenticationState::unverified(conversation_id))
            }
        }
    }

    /// Subject of the stored verification, whoever it was verified for.
    pub fn verified_subject(&self, conversation_id: &str) -> Option<String> {
        self.cached_state(conversation_id)
            .filter(|state| state.verified)
            .and_then(|state| state.subject)
    }

    /// Drop verification state and any pending challenge.
    pub fn logout(&self, conversation_id: &str) {
        self.cache.remove(&state_key(conversation_id));
        self.cache.remove(&challenge_key(conversation_id));
        tracing::info!("Cleared verification state for conversation {}", conversation_id);
    }

    /// Remember which live-data request is waiting on verification.
    pub fn record_challenge(&self, conversation_id: &str, challenge: PendingChallenge) {
        match serde_json::to_value(&challenge) {
            Ok(payload) => self
                .cache
                .set(&challenge_key(conversation_id), payload, CacheType::UserContext),
            Err(e) => tracing::warn!("Failed to store verification challenge: {}", e),
        }
    }

    pub fn pending_challenge(&self, conversation_id: &str) -> Option<PendingChallenge> {
        self.cache
            .get(&challenge_key(conversation_id), CacheType::UserContext)
            .and_then(|payload| serde_json::from_value(payload).ok())
    }

    pub fn clear_challenge(&self, conversation_id: &str) {
        self.cache.remove(&challenge_key(conversation_id));
    }

    fn verified_state(&self, conversation_id: &str, subject: &str, method: AuthMethod) -> AuthenticationState {
        AuthenticationState {
            conversation_id: conversation_id.to_string(),
            verified: true,
            method: Some(method),
            subject: Some(subject.to_string()),
            expires_at: self
                .clock
                .now()
                .checked_add_signed(self.cache.ttl_for(CacheType::UserContext))
                .or(Some(DateTime::<Utc>::MAX_UTC)),
        }
    }

    fn cached_state(&self, conversation_id: &str) -> Option<AuthenticationState> {
        self.cache
            .get(&state_key(conversation_id), CacheType::UserContext)
            .and_then(|payload| serde_json::from_value(payload).ok())
    }

    fn store_state(&self, state: &AuthenticationState) {
        match serde_json::to_value(state) {
            Ok(payload) => self
                .cache
                .set(&state_key(&state.conversation_id), payload, CacheType::UserContext),
            Err(e) => tracing::warn!("Failed to store verification state: {}", e),
        }
    }
}

fn state_key(conversation_id: &str) -> CacheKey {
    CacheService::key(CacheType::UserContext, AUTH_SCOPE, Some(conversation_id), None, "")
}

fn challenge_key(conversation_id: &str) -> CacheKey {
    CacheService::key(CacheType::UserContext, CHALLENGE_SCOPE, Some(conversation_id), None, "")
}
