pub mod business_hours;
pub mod escalation_policy;
pub mod intent_classifier;
pub mod state_machine;

pub use business_hours::*;
pub use escalation_policy::*;
pub use intent_classifier::*;
pub use state_machine::*;
