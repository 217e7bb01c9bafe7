use super::{nullable, parse_column, parse_ts, Database};
use crate::domain::entities::{format_timestamp, Ticket};
use crate::domain::errors::DomainResult;
use crate::domain::ports::ticket_repository::TicketRepository;
use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::Row;

const TICKET_COLUMNS: &str =
    "id, conversation_id, status, priority, assignee, department, created_at, updated_at";

fn ticket_from_row(row: &AnyRow) -> DomainResult<Ticket> {
    let status: String = row.try_get("status")?;
    let priority: String = row.try_get("priority")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Ticket {
        id: row.try_get("id")?,
        conversation_id: row.try_get("conversation_id")?,
        status: parse_column(&status)?,
        priority: parse_column(&priority)?,
        assignee: nullable(row, "assignee"),
        department: nullable(row, "department"),
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

#[async_trait]
impl TicketRepository for Database {
    async fn create_ticket(&self, ticket: &Ticket) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO tickets (id, conversation_id, status, priority, assignee, department, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&ticket.id)
        .bind(&ticket.conversation_id)
        .bind(ticket.status.as_str())
        .bind(ticket.priority.as_str())
        .bind(ticket.assignee.as_deref())
        .bind(ticket.department.as_deref())
        .bind(format_timestamp(&ticket.created_at))
        .bind(format_timestamp(&ticket.updated_at))
        .execute(&self.pool)
        .await?;

        tracing::info!(
            "Ticket {} created for conversation {}",
            ticket.id,
            ticket.conversation_id
        );
        Ok(())
    }

    async fn get_ticket_by_id(&self, id: &str) -> DomainResult<Option<Ticket>> {
        let row = sqlx::query(&format!("SELECT {} FROM tickets WHERE id = ?", TICKET_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(ticket_from_row).transpose()
    }

    async fn get_ticket_by_conversation(&self, conversation_id: &str) -> DomainResult<Option<Ticket>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM tickets WHERE conversation_id = ?",
            TICKET_COLUMNS
        ))
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(ticket_from_row).transpose()
    }

    async fn update_ticket(&self, ticket: &Ticket) -> DomainResult<()> {
        sqlx::query(
            "UPDATE tickets SET status = ?, priority = ?, assignee = ?, department = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(ticket.status.as_str())
        .bind(ticket.priority.as_str())
        .bind(ticket.assignee.as_deref())
        .bind(ticket.department.as_deref())
        .bind(format_timestamp(&ticket.updated_at))
        .bind(&ticket.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
