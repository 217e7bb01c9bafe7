use super::{nullable, parse_column, parse_ts, Database};
use crate::domain::entities::{format_timestamp, Conversation, ConversationFilter};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::conversation_repository::ConversationRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::any::AnyRow;
use sqlx::Row;

const CONVERSATION_COLUMNS: &str = "id, channel, customer_id, customer_role, status, assigned_agent, \
     ai_mode, priority, department, escalation_reason, escalated_at, handoff_pending, ticket_id, \
     is_after_hours, created_at, last_activity_at, closed_at, version";

fn conversation_from_row(row: &AnyRow) -> DomainResult<Conversation> {
    let status: String = row.try_get("status")?;
    let ai_mode: String = row.try_get("ai_mode")?;
    let priority: String = row.try_get("priority")?;
    let escalated_at: Option<String> = nullable(row, "escalated_at");
    let closed_at: Option<String> = nullable(row, "closed_at");
    let created_at: String = row.try_get("created_at")?;
    let last_activity_at: String = row.try_get("last_activity_at")?;

    Ok(Conversation {
        id: row.try_get("id")?,
        channel: row.try_get("channel")?,
        customer_id: nullable(row, "customer_id"),
        customer_role: nullable(row, "customer_role"),
        status: parse_column(&status)?,
        assigned_agent: nullable(row, "assigned_agent"),
        ai_mode: parse_column(&ai_mode)?,
        priority: parse_column(&priority)?,
        department: nullable(row, "department"),
        escalation_reason: nullable(row, "escalation_reason"),
        escalated_at: escalated_at.as_deref().map(parse_ts).transpose()?,
        handoff_pending: row.try_get::<i64, _>("handoff_pending")? != 0,
        ticket_id: nullable(row, "ticket_id"),
        is_after_hours: row.try_get::<i64, _>("is_after_hours")? != 0,
        created_at: parse_ts(&created_at)?,
        last_activity_at: parse_ts(&last_activity_at)?,
        closed_at: closed_at.as_deref().map(parse_ts).transpose()?,
        version: row.try_get("version")?,
    })
}

/// WHERE clause and string binds for a conversation filter.
fn filter_clause(filter: &ConversationFilter) -> (String, Vec<String>) {
    let mut conditions = Vec::new();
    let mut binds = Vec::new();

    if let Some(status) = filter.status {
        conditions.push("status = ?");
        binds.push(status.as_str().to_string());
    }
    if let Some(channel) = &filter.channel {
        conditions.push("channel = ?");
        binds.push(channel.clone());
    }
    if let Some(agent) = &filter.assigned_agent {
        conditions.push("assigned_agent = ?");
        binds.push(agent.clone());
    }
    if let Some(mode) = filter.ai_mode {
        conditions.push("ai_mode = ?");
        binds.push(mode.as_str().to_string());
    }
    if let Some(priority) = filter.priority {
        conditions.push("priority = ?");
        binds.push(priority.as_str().to_string());
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };
    (clause, binds)
}

#[async_trait]
impl ConversationRepository for Database {
    async fn create_conversation(&self, conversation: &Conversation) -> DomainResult<()> {
        tracing::debug!(
            "Creating conversation id={}, channel={}",
            conversation.id,
            conversation.channel
        );

        sqlx::query(
            "INSERT INTO conversations (id, channel, customer_id, customer_role, status, assigned_agent,
                 ai_mode, priority, department, escalation_reason, escalated_at, handoff_pending, ticket_id,
                 is_after_hours, created_at, last_activity_at, closed_at, version)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&conversation.id)
        .bind(&conversation.channel)
        .bind(conversation.customer_id.as_deref())
        .bind(conversation.customer_role.as_deref())
        .bind(conversation.status.as_str())
        .bind(conversation.assigned_agent.as_deref())
        .bind(conversation.ai_mode.as_str())
        .bind(conversation.priority.as_str())
        .bind(conversation.department.as_deref())
        .bind(conversation.escalation_reason.as_deref())
        .bind(conversation.escalated_at.as_ref().map(format_timestamp))
        .bind(conversation.handoff_pending as i64)
        .bind(conversation.ticket_id.as_deref())
        .bind(conversation.is_after_hours as i64)
        .bind(format_timestamp(&conversation.created_at))
        .bind(format_timestamp(&conversation.last_activity_at))
        .bind(conversation.closed_at.as_ref().map(format_timestamp))
        .bind(conversation.version)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.message().contains("UNIQUE") => {
                DomainError::Conflict(format!("Conversation {} already exists", conversation.id))
            }
            other => DomainError::from(other),
        })?;

        tracing::info!(
            "Conversation created: id={}, after_hours={}",
            conversation.id,
            conversation.is_after_hours
        );

        Ok(())
    }

    async fn get_conversation_by_id(&self, id: &str) -> DomainResult<Option<Conversation>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM conversations WHERE id = ?",
            CONVERSATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(conversation_from_row).transpose()
    }

    async fn update_conversation(&self, conversation: &Conversation) -> DomainResult<Conversation> {
        let result = sqlx::query(
            "UPDATE conversations
             SET status = ?, assigned_agent = ?, ai_mode = ?, priority = ?, department = ?,
                 escalation_reason = ?, escalated_at = ?, handoff_pending = ?, ticket_id = ?,
                 last_activity_at = ?, closed_at = ?, version = version + 1
             WHERE id = ? AND version = ?",
        )
        .bind(conversation.status.as_str())
        .bind(conversation.assigned_agent.as_deref())
        .bind(conversation.ai_mode.as_str())
        .bind(conversation.priority.as_str())
        .bind(conversation.department.as_deref())
        .bind(conversation.escalation_reason.as_deref())
        .bind(conversation.escalated_at.as_ref().map(format_timestamp))
        .bind(conversation.handoff_pending as i64)
        .bind(conversation.ticket_id.as_deref())
        .bind(format_timestamp(&conversation.last_activity_at))
        .bind(conversation.closed_at.as_ref().map(format_timestamp))
        .bind(&conversation.id)
        .bind(conversation.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_conversation_by_id(&conversation.id).await? {
                Some(current) => Err(DomainError::Conflict(format!(
                    "Conversation {} was modified concurrently (expected version {}, found {})",
                    conversation.id, conversation.version, current.version
                ))),
                None => Err(DomainError::NotFound(format!(
                    "Conversation {} not found",
                    conversation.id
                ))),
            };
        }

        let mut updated = conversation.clone();
        updated.version += 1;
        Ok(updated)
    }

    async fn list_conversations(&self, filter: &ConversationFilter) -> DomainResult<Vec<Conversation>> {
        let (clause, binds) = filter_clause(filter);
        let sql = format!(
            "SELECT {} FROM conversations{} ORDER BY last_activity_at DESC, id ASC LIMIT ? OFFSET ?",
            CONVERSATION_COLUMNS, clause
        );

        let mut query = sqlx::query(&sql);
        for value in binds {
            query = query.bind(value);
        }
        let rows = query
            .bind(filter.limit.unwrap_or(50).clamp(1, 500))
            .bind(filter.offset.unwrap_or(0).max(0))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(conversation_from_row).collect()
    }

    async fn count_conversations(&self, filter: &ConversationFilter) -> DomainResult<i64> {
        let (clause, binds) = filter_clause(filter);
        let sql = format!("SELECT COUNT(*) AS count FROM conversations{}", clause);

        let mut query = sqlx::query(&sql);
        for value in binds {
            query = query.bind(value);
        }
        let row = query.fetch_one(&self.pool).await?;
        Ok(row.try_get("count")?)
    }

    async fn find_inactive_conversations(
        &self,
        cutoff: DateTime<Utc>,
    ) -> DomainResult<Vec<Conversation>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM conversations
             WHERE status IN ('new', 'ai_responded', 'agent_assigned') AND last_activity_at < ?
             ORDER BY last_activity_at ASC",
            CONVERSATION_COLUMNS
        ))
        .bind(format_timestamp(&cutoff))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(conversation_from_row).collect()
    }

    async fn find_pending_handoffs(&self) -> DomainResult<Vec<Conversation>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM conversations
             WHERE status = 'escalated' AND handoff_pending = 1
             ORDER BY escalated_at ASC",
            CONVERSATION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(conversation_from_row).collect()
    }
}
