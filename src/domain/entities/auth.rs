use super::UserContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// The channel vouched for the user (logged-in portal session).
    ChannelSession,
    /// The user supplied an identifier that the verifier confirmed.
    IdentifierLookup,
}

/// Verification state of one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticationState {
    pub conversation_id: String,
    pub verified: bool,
    pub method: Option<AuthMethod>,
    /// Identity that was verified, used to key live-data lookups.
    pub subject: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthenticationState {
    pub fn unverified(conversation_id: &str) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            verified: false,
            method: None,
            subject: None,
            expires_at: None,
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.verified && self.expires_at.map(|exp| now < exp).unwrap_or(false)
    }

    /// Whether a request from `user_context` may act on this state.
    ///
    /// A caller with its own authenticated session only matches its own
    /// subject. A channel-session state never carries over to anyone else.
    pub fn belongs_to(&self, user_context: &UserContext) -> bool {
        match (&user_context.user_id, user_context.authenticated) {
            (Some(user_id), true) => self.subject.as_deref() == Some(user_id.as_str()),
            _ => self.method != Some(AuthMethod::ChannelSession),
        }
    }
}

/// Live-data intent waiting on a credential prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingChallenge {
    pub intent: String,
    pub message: String,
}
