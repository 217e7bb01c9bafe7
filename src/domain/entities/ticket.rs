use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::conversation::{ConversationStatus, Priority};

/// Ticket mirroring a conversation in the ticketing system.
///
/// The mirror is best-effort: the conversation record is authoritative and a
/// ticket may lag behind it when a sync fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub conversation_id: String,
    pub status: ConversationStatus,
    pub priority: Priority,
    pub assignee: Option<String>,
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
