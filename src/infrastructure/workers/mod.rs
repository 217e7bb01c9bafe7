pub mod escalation_notifier;
pub mod inactivity_sweeper;

pub use escalation_notifier::*;
pub use inactivity_sweeper::*;
