//! # Ticket Repository
//!
//! Session counter for prepaid course tickets.
//!
//! Every counter change follows the same shape:
//!
//! ```text
//! BEGIN
//!   UPDATE course_tickets SET lock_version = lock_version + 1 WHERE id = ?
//!   SELECT ... FROM course_tickets WHERE id = ?        (locked snapshot)
//!   salon_core::ticket::{consume | undo | adjust}      (rule check)
//!   UPDATE course_tickets SET used_sessions, status
//!   INSERT ticket_session_events                       (audit row)
//! COMMIT
//! ```
//!
//! Two receptionists pressing "consume" on the same ticket at the same time
//! therefore use two sessions, never one, and never more than the total.

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::generate_id;
use crate::error::DbResult;
use salon_core::validation::{validate_expiry, validate_new_ticket, validate_reason};
use salon_core::{
    ticket, CoreError, CoreResult, CourseTicket, NewCourseTicket, SessionChange, SessionEvent,
    SessionEventKind, TicketStatus, ValidationError,
};

const TICKET_COLUMNS: &str = "id, tenant_id, customer_id, ticket_name, total_sessions, \
     used_sessions, status, expiry_date, price_cents, created_at, updated_at";

/// Repository for course tickets.
#[derive(Debug, Clone)]
pub struct TicketRepository {
    pool: SqlitePool,
    tenant_id: String,
}

impl TicketRepository {
    /// Creates a new TicketRepository.
    pub fn new(pool: SqlitePool, tenant_id: String) -> Self {
        TicketRepository { pool, tenant_id }
    }

    /// Sells a new ticket: `active`, nothing used.
    pub async fn create(&self, input: &NewCourseTicket) -> DbResult<CourseTicket> {
        validate_new_ticket(input)?;

        let now = Utc::now();
        validate_expiry(input.expiry_date, now.date_naive())?;

        let ticket = CourseTicket {
            id: generate_id(),
            tenant_id: self.tenant_id.clone(),
            customer_id: input.customer_id.clone(),
            ticket_name: input.ticket_name.trim().to_string(),
            total_sessions: input.total_sessions,
            used_sessions: 0,
            status: TicketStatus::Active,
            expiry_date: input.expiry_date,
            price_cents: input.price_cents,
            created_at: now,
            updated_at: now,
        };

        debug!(
            id = %ticket.id,
            customer_id = %ticket.customer_id,
            total_sessions = ticket.total_sessions,
            "Creating course ticket"
        );

        sqlx::query(
            r#"
            INSERT INTO course_tickets (
                id, tenant_id, customer_id, ticket_name,
                total_sessions, used_sessions, status,
                expiry_date, price_cents, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&ticket.id)
        .bind(&ticket.tenant_id)
        .bind(&ticket.customer_id)
        .bind(&ticket.ticket_name)
        .bind(ticket.total_sessions)
        .bind(ticket.used_sessions)
        .bind(ticket.status)
        .bind(ticket.expiry_date)
        .bind(ticket.price_cents)
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&self.pool)
        .await?;

        info!(id = %ticket.id, "Course ticket created");
        Ok(ticket)
    }

    /// Gets a ticket by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CourseTicket>> {
        let mut conn = self.pool.acquire().await?;
        find_ticket(&mut conn, id).await
    }

    /// Tickets of one customer, oldest first.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<CourseTicket>> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM course_tickets \
             WHERE customer_id = ?1 \
             ORDER BY created_at, rowid"
        );

        let tickets = sqlx::query_as::<_, CourseTicket>(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(tickets)
    }

    /// Uses one session.
    ///
    /// ## Errors
    /// * `TicketExhausted` - all sessions already used
    /// * `TicketNotActive` - ticket is expired / cancelled
    /// * `TicketNotFound`
    pub async fn consume(&self, ticket_id: &str) -> DbResult<SessionChange> {
        debug!(ticket_id = %ticket_id, "Consuming session");
        self.apply(ticket_id, SessionEventKind::Consume, None, ticket::consume)
            .await
    }

    /// Gives the last used session back. `completed` becomes `active`.
    ///
    /// ## Errors
    /// * `NothingToUndo` - no session used yet
    /// * `TicketNotActive` - ticket is expired / cancelled
    /// * `TicketNotFound`
    pub async fn undo(&self, ticket_id: &str) -> DbResult<SessionChange> {
        debug!(ticket_id = %ticket_id, "Undoing session");
        self.apply(ticket_id, SessionEventKind::Undo, None, ticket::undo)
            .await
    }

    /// Overwrites the used-session counter.
    ///
    /// The returned [`SessionChange`] carries the previous and the new
    /// value for the operator's confirmation screen.
    ///
    /// ## Errors
    /// * `SessionsOutOfRange` - `new_used` outside `0..=total_sessions`
    /// * `TicketNotActive` - ticket is expired / cancelled
    /// * `TicketNotFound`
    pub async fn adjust(
        &self,
        ticket_id: &str,
        new_used: i64,
        reason: Option<&str>,
    ) -> DbResult<SessionChange> {
        validate_reason(reason, false)?;

        debug!(ticket_id = %ticket_id, new_used, "Adjusting sessions");
        self.apply(ticket_id, SessionEventKind::Adjust, reason, |t| {
            ticket::adjust(t, new_used)
        })
        .await
    }

    /// Marks a ticket expired or cancelled.
    ///
    /// Hook for the collaborators that own those states. Session
    /// operations refuse tickets in either state afterwards.
    pub async fn set_external_status(&self, ticket_id: &str, status: TicketStatus) -> DbResult<()> {
        if !status.is_externally_owned() {
            return Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                reason: format!("{status} is derived from the session counter"),
            }
            .into());
        }

        debug!(ticket_id = %ticket_id, status = %status, "Setting external ticket status");

        let result = sqlx::query(
            r#"
            UPDATE course_tickets
            SET status = ?2, updated_at = ?3, lock_version = lock_version + 1
            WHERE id = ?1
            "#,
        )
        .bind(ticket_id)
        .bind(status)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::TicketNotFound(ticket_id.to_string()).into());
        }

        info!(ticket_id = %ticket_id, status = %status, "Ticket status set");
        Ok(())
    }

    /// Audit trail of counter changes, oldest first.
    pub async fn session_history(&self, ticket_id: &str) -> DbResult<Vec<SessionEvent>> {
        let events = sqlx::query_as::<_, SessionEvent>(
            r#"
            SELECT id, ticket_id, kind, used_before, used_after, reason, created_at
            FROM ticket_session_events
            WHERE ticket_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Tickets of this tenant whose expiry date is before `today` and that
    /// are still active, for the collaborator that expires them.
    pub async fn list_overdue(&self, today: NaiveDate) -> DbResult<Vec<CourseTicket>> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM course_tickets \
             WHERE tenant_id = ?1 AND status = 'active' \
               AND expiry_date IS NOT NULL AND expiry_date < ?2 \
             ORDER BY expiry_date, rowid"
        );

        let tickets = sqlx::query_as::<_, CourseTicket>(&sql)
            .bind(&self.tenant_id)
            .bind(today)
            .fetch_all(&self.pool)
            .await?;

        Ok(tickets)
    }

    /// Locked read, rule check, write back, audit row. One transaction.
    async fn apply<F>(
        &self,
        ticket_id: &str,
        kind: SessionEventKind,
        reason: Option<&str>,
        rule: F,
    ) -> DbResult<SessionChange>
    where
        F: FnOnce(&CourseTicket) -> CoreResult<SessionChange>,
    {
        let mut tx = self.pool.begin().await?;
        lock_ticket(&mut tx, ticket_id).await?;

        let current = find_ticket(&mut tx, ticket_id)
            .await?
            .ok_or_else(|| CoreError::TicketNotFound(ticket_id.to_string()))?;

        let change = match rule(&current) {
            Ok(change) => change,
            Err(e) => {
                warn!(
                    ticket_id = %ticket_id,
                    used = current.used_sessions,
                    total = current.total_sessions,
                    status = %current.status,
                    error = %e,
                    "Session operation rejected"
                );
                return Err(e.into());
            }
        };

        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE course_tickets
            SET used_sessions = ?2, status = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(ticket_id)
        .bind(change.used_sessions)
        .bind(change.status)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO ticket_session_events (
                id, ticket_id, kind, used_before, used_after, reason, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(generate_id())
        .bind(ticket_id)
        .bind(kind)
        .bind(change.previous_used)
        .bind(change.used_sessions)
        .bind(reason)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            ticket_id = %ticket_id,
            kind = ?kind,
            before = change.previous_used,
            after = change.used_sessions,
            status = %change.status,
            "Session change committed"
        );
        Ok(change)
    }
}

/// Takes the write lock on a ticket row; first statement of the transaction.
async fn lock_ticket(conn: &mut SqliteConnection, ticket_id: &str) -> DbResult<()> {
    let result =
        sqlx::query("UPDATE course_tickets SET lock_version = lock_version + 1 WHERE id = ?1")
            .bind(ticket_id)
            .execute(&mut *conn)
            .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::TicketNotFound(ticket_id.to_string()).into());
    }

    Ok(())
}

async fn find_ticket(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<CourseTicket>> {
    let sql = format!("SELECT {TICKET_COLUMNS} FROM course_tickets WHERE id = ?1");

    let ticket = sqlx::query_as::<_, CourseTicket>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(ticket)
}

// =============================================================================
// Unit Tests
// =============================================================================
