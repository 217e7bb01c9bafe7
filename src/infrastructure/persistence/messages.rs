use super::{nullable, parse_ts, Database};
use crate::domain::entities::{format_timestamp, Message, MessageDirection};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::message_repository::MessageRepository;
use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::Row;

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, direction, sender, content, created_at, sequence, intent, confidence";

/// Display order: timestamp, then inbound before outbound, then append order.
const ORDER_ASC: &str = "created_at ASC, direction_rank ASC, sequence ASC";
const ORDER_DESC: &str = "created_at DESC, direction_rank DESC, sequence DESC";

fn message_from_row(row: &AnyRow) -> DomainResult<Message> {
    let direction: String = row.try_get("direction")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Message {
        id: row.try_get("id")?,
        conversation_id: row.try_get("conversation_id")?,
        direction: MessageDirection::from(direction),
        sender: row.try_get("sender")?,
        content: row.try_get("content")?,
        timestamp: parse_ts(&created_at)?,
        sequence: row.try_get("sequence")?,
        intent: nullable(row, "intent"),
        confidence: nullable(row, "confidence"),
    })
}

#[async_trait]
impl MessageRepository for Database {
    async fn append_message(&self, message: &Message) -> DomainResult<Message> {
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, direction, direction_rank, sender, content,
                 created_at, sequence, intent, confidence)
             SELECT ?, ?, ?, ?, ?, ?, ?, COALESCE(MAX(sequence), 0) + 1, ?, ?
             FROM messages WHERE conversation_id = ?",
        )
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(message.direction.as_str())
        .bind(message.direction.rank())
        .bind(&message.sender)
        .bind(&message.content)
        .bind(format_timestamp(&message.timestamp))
        .bind(message.intent.as_deref())
        .bind(message.confidence)
        .bind(&message.conversation_id)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query("SELECT sequence FROM messages WHERE id = ?")
            .bind(&message.id)
            .fetch_one(&self.pool)
            .await?;

        let mut stored = message.clone();
        stored.sequence = row.try_get("sequence")?;

        tracing::debug!(
            "Appended {} message {} to conversation {} (sequence {})",
            stored.direction,
            stored.id,
            stored.conversation_id,
            stored.sequence
        );

        Ok(stored)
    }

    async fn get_messages(&self, conversation_id: &str, limit: i64) -> DomainResult<Vec<Message>> {
        if limit < 1 {
            return Err(DomainError::ValidationError(
                "limit must be at least 1".to_string(),
            ));
        }

        let rows = sqlx::query(&format!(
            "SELECT {cols} FROM (
                 SELECT {cols}, direction_rank FROM messages WHERE conversation_id = ?
                 ORDER BY {desc} LIMIT ?
             ) ORDER BY {asc}",
            cols = MESSAGE_COLUMNS,
            desc = ORDER_DESC,
            asc = ORDER_ASC
        ))
        .bind(conversation_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(message_from_row).collect()
    }

    async fn recent_inbound_intents(
        &self,
        conversation_id: &str,
        limit: i64,
    ) -> DomainResult<Vec<Option<String>>> {
        let rows = sqlx::query(&format!(
            "SELECT intent FROM messages
             WHERE conversation_id = ? AND direction = 'inbound'
             ORDER BY {} LIMIT ?",
            ORDER_DESC
        ))
        .bind(conversation_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| nullable(row, "intent")).collect())
    }

    async fn last_message(&self, conversation_id: &str) -> DomainResult<Option<Message>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM messages WHERE conversation_id = ? ORDER BY {} LIMIT 1",
            MESSAGE_COLUMNS, ORDER_DESC
        ))
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(message_from_row).transpose()
    }
}
