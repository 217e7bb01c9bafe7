use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Entity not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DomainError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                DomainError::Internal(format!("Database error: {}", db_err.message()))
            }
            other => DomainError::Internal(format!("Database error: {}", other)),
        }
    }
}

/// Failure of an external collaborator (AI responder, data source, verifier).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("{collaborator} timed out after {timeout_ms}ms")]
    Timeout {
        collaborator: &'static str,
        timeout_ms: u64,
    },
    #[error("{collaborator} unavailable: {reason}")]
    Unavailable {
        collaborator: &'static str,
        reason: String,
    },
    #[error("{collaborator} returned a malformed payload: {reason}")]
    Malformed {
        collaborator: &'static str,
        reason: String,
    },
}

impl UpstreamError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, UpstreamError::Timeout { .. })
    }
}

/// Errors composed by the routing engine. Cache misses and low confidence are
/// not errors and never show up here.
#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Upstream timeout: {0}")]
    UpstreamTimeout(UpstreamError),
    #[error("Upstream error: {0}")]
    Upstream(UpstreamError),
    #[error("Internal fault: {0}")]
    InternalFault(String),
}

impl From<UpstreamError> for RoutingError {
    fn from(err: UpstreamError) -> Self {
        if err.is_timeout() {
            RoutingError::UpstreamTimeout(err)
        } else {
            RoutingError::Upstream(err)
        }
    }
}

impl From<DomainError> for RoutingError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::ValidationError(msg) => RoutingError::Validation(msg),
            other => RoutingError::InternalFault(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_maps_to_upstream_timeout() {
        let err = UpstreamError::Timeout {
            collaborator: "ai_responder",
            timeout_ms: 100,
        };
        assert!(matches!(
            RoutingError::from(err),
            RoutingError::UpstreamTimeout(_)
        ));
    }

    #[test]
    fn test_malformed_maps_to_upstream_error() {
        let err = UpstreamError::Malformed {
            collaborator: "data_source",
            reason: "missing field".to_string(),
        };
        assert!(matches!(RoutingError::from(err), RoutingError::Upstream(_)));
    }

    #[test]
    fn test_validation_domain_error_stays_validation() {
        let err = DomainError::ValidationError("empty".to_string());
        assert!(matches!(RoutingError::from(err), RoutingError::Validation(_)));
    }
}
