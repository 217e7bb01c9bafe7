pub mod canned_data_source;
pub mod directory_verifier;
pub mod http_data_source;
pub mod http_responder;
pub mod keyword_sentiment;
pub mod local_ticketing;
pub mod static_agent_roster;
pub mod template_responder;

pub use canned_data_source::*;
pub use directory_verifier::*;
pub use http_data_source::*;
pub use http_responder::*;
pub use keyword_sentiment::*;
pub use local_ticketing::*;
pub use static_agent_roster::*;
pub use template_responder::*;

use crate::domain::errors::UpstreamError;

pub(crate) fn map_reqwest_error(collaborator: &'static str, err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout {
            collaborator,
            timeout_ms: 0,
        }
    } else {
        UpstreamError::Unavailable {
            collaborator,
            reason: err.to_string(),
        }
    }
}
