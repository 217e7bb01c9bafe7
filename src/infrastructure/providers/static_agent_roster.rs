use crate::domain::ports::agent_directory::AgentDirectory;
use crate::domain::services::escalation_policy::DEFAULT_DEPARTMENT;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Agent directory from a configured department -> agents roster.
///
/// Agents are handed out round-robin per department. Departments without
/// agents fall back to the default department's agents.
pub struct StaticAgentRoster {
    roster: BTreeMap<String, Vec<String>>,
    cursors: BTreeMap<String, AtomicUsize>,
}

impl StaticAgentRoster {
    pub fn new(roster: BTreeMap<String, Vec<String>>) -> Self {
        let roster: BTreeMap<String, Vec<String>> = roster
            .into_iter()
            .filter(|(_, agents)| !agents.is_empty())
            .collect();
        let cursors = roster
            .keys()
            .map(|department| (department.clone(), AtomicUsize::new(0)))
            .collect();
        Self { roster, cursors }
    }

    fn next_in(&self, department: &str) -> Option<String> {
        let agents = self.roster.get(department)?;
        let cursor = self.cursors.get(department)?;
        let index = cursor.fetch_add(1, Ordering::Relaxed) % agents.len();
        agents.get(index).cloned()
    }
}

#[async_trait]
impl AgentDirectory for StaticAgentRoster {
    async fn find_available_agent(&self, department: &str) -> Option<String> {
        self.next_in(department)
            .or_else(|| self.next_in(DEFAULT_DEPARTMENT))
    }
}
