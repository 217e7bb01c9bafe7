use crate::domain::entities::Priority;

pub const DEFAULT_DEPARTMENT: &str = "support";

/// Well-known escalation reasons.
pub mod reasons {
    pub const INACTIVITY: &str = "inactivity";
    pub const REPEATED_FALLBACK: &str = "repeated_fallback";
    pub const NEGATIVE_SENTIMENT: &str = "negative_sentiment";
    pub const URGENT: &str = "urgent";
    pub const CUSTOMER_REQUEST: &str = "customer_request";
    pub const AUTOMATION_FAILURE: &str = "automation_failure";
    pub const MANUAL: &str = "manual";
}

/// reason -> (department, implied priority)
const ROUTING_TABLE: &[(&str, &str, Priority)] = &[
    (reasons::INACTIVITY, "support", Priority::Medium),
    (reasons::REPEATED_FALLBACK, "support", Priority::Medium),
    (reasons::CUSTOMER_REQUEST, "support", Priority::Medium),
    (reasons::NEGATIVE_SENTIMENT, "customer_care", Priority::High),
    (reasons::URGENT, "customer_care", Priority::Urgent),
    (reasons::AUTOMATION_FAILURE, "technical", Priority::High),
    ("billing_dispute", "billing", Priority::High),
    ("claim_dispute", "claims", Priority::High),
    ("fraud", "claims", Priority::Urgent),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationTarget {
    pub department: String,
    pub priority: Priority,
}

/// Department and priority for escalating with `reason`.
///
/// Priority is the max of the current priority, the reason's implied priority
/// (one level higher after hours) and any explicitly requested priority, so an
/// escalation never downgrades a conversation.
pub fn resolve_escalation(
    reason: &str,
    current: Priority,
    requested: Option<Priority>,
    is_after_hours: bool,
) -> EscalationTarget {
    let (department, implied) = ROUTING_TABLE
        .iter()
        .find(|(r, _, _)| *r == reason)
        .map(|(_, dept, prio)| (*dept, *prio))
        .unwrap_or((DEFAULT_DEPARTMENT, Priority::Low));

    let implied = if is_after_hours { implied.bumped() } else { implied };
    let priority = [Some(current), Some(implied), requested]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(current);

    EscalationTarget {
        department: department.to_string(),
        priority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_reason_maps_to_department() {
        let target = resolve_escalation(reasons::NEGATIVE_SENTIMENT, Priority::Low, None, false);
        assert_eq!(target.department, "customer_care");
        assert_eq!(target.priority, Priority::High);
    }

    #[test]
    fn test_unknown_reason_uses_default_department() {
        let target = resolve_escalation("something_else", Priority::Low, None, false);
        assert_eq!(target.department, DEFAULT_DEPARTMENT);
        assert_eq!(target.priority, Priority::Low);
    }

    #[test]
    fn test_priority_never_downgraded() {
        let target = resolve_escalation(reasons::INACTIVITY, Priority::Urgent, Some(Priority::Low), false);
        assert_eq!(target.priority, Priority::Urgent);
    }

    #[test]
    fn test_requested_priority_can_raise() {
        let target = resolve_escalation(reasons::INACTIVITY, Priority::Low, Some(Priority::High), false);
        assert_eq!(target.priority, Priority::High);
    }

    #[test]
    fn test_after_hours_bumps_implied_priority() {
        let target = resolve_escalation(reasons::INACTIVITY, Priority::Low, None, true);
        assert_eq!(target.priority, Priority::High);
    }
}
