//! # Session Counter State Machine
//!
//! Pure transitions for a course ticket's `used_sessions` / `status`.
//! salon-db reads the ticket under its row lock, calls one of these, and
//! writes back the returned [`SessionChange`].
//!
//! ## State Machine
//! ```text
//!              consume (used+1 < total)
//!             ┌──────────┐
//!             │          ▼
//!        ┌─────────┐  consume (used+1 == total)  ┌───────────┐
//!        │ Active  │ ───────────────────────────►│ Completed │
//!        └─────────┘ ◄───────────────────────────└───────────┘
//!             ▲  │               undo
//!             └──┘ undo (partial)
//!
//!   adjust(n): any n in [0, total]; status = Completed iff n == total
//!
//!   Expired / Cancelled: owned by other collaborators. Every operation
//!   here fails fast with TicketNotActive and leaves them untouched.
//! ```

use crate::error::{CoreError, CoreResult};
use crate::types::{CourseTicket, SessionChange, TicketStatus};

fn ensure_not_external(ticket: &CourseTicket) -> CoreResult<()> {
    if ticket.status.is_externally_owned() {
        return Err(CoreError::TicketNotActive {
            ticket_id: ticket.id.clone(),
            status: ticket.status,
        });
    }
    Ok(())
}

fn change(ticket: &CourseTicket, used_sessions: i64) -> SessionChange {
    SessionChange {
        previous_used: ticket.used_sessions,
        used_sessions,
        total_sessions: ticket.total_sessions,
        status: TicketStatus::from_counter(used_sessions, ticket.total_sessions),
    }
}

/// Uses one session.
///
/// ## Errors
/// - [`CoreError::TicketNotActive`] for expired / cancelled tickets
/// - [`CoreError::TicketExhausted`] when every session is already used
pub fn consume(ticket: &CourseTicket) -> CoreResult<SessionChange> {
    ensure_not_external(ticket)?;

    if ticket.used_sessions >= ticket.total_sessions {
        return Err(CoreError::TicketExhausted {
            ticket_id: ticket.id.clone(),
            total: ticket.total_sessions,
        });
    }

    if ticket.status != TicketStatus::Active {
        return Err(CoreError::TicketNotActive {
            ticket_id: ticket.id.clone(),
            status: ticket.status,
        });
    }

    Ok(change(ticket, ticket.used_sessions + 1))
}

/// Gives one session back; the exact inverse of [`consume`].
///
/// ## Errors
/// - [`CoreError::TicketNotActive`] for expired / cancelled tickets
/// - [`CoreError::NothingToUndo`] when no session has been used
pub fn undo(ticket: &CourseTicket) -> CoreResult<SessionChange> {
    ensure_not_external(ticket)?;

    if ticket.used_sessions <= 0 {
        return Err(CoreError::NothingToUndo(ticket.id.clone()));
    }

    Ok(change(ticket, ticket.used_sessions - 1))
}

/// Overwrites the counter (manual correction).
///
/// The range is checked before anything else so an out-of-range request
/// never reaches a write.
///
/// ## Errors
/// - [`CoreError::SessionsOutOfRange`] unless `0 <= new_used <= total`
/// - [`CoreError::TicketNotActive`] for expired / cancelled tickets
pub fn adjust(ticket: &CourseTicket, new_used: i64) -> CoreResult<SessionChange> {
    if new_used < 0 || new_used > ticket.total_sessions {
        return Err(CoreError::SessionsOutOfRange {
            ticket_id: ticket.id.clone(),
            requested: new_used,
            total: ticket.total_sessions,
        });
    }

    ensure_not_external(ticket)?;

    Ok(change(ticket, new_used))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ticket(total: i64, used: i64, status: TicketStatus) -> CourseTicket {
        CourseTicket {
            id: "t-1".to_string(),
            tenant_id: "tenant".to_string(),
            customer_id: "c-1".to_string(),
            ticket_name: "Treatment x5".to_string(),
            total_sessions: total,
            used_sessions: used,
            status,
            expiry_date: None,
            price_cents: 50_000,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn apply(t: &mut CourseTicket, c: SessionChange) {
        t.used_sessions = c.used_sessions;
        t.status = c.status;
    }

    #[test]
    fn test_five_consumes_complete_the_ticket() {
        let mut t = ticket(5, 0, TicketStatus::Active);
        for i in 1..=5 {
            let c = consume(&t).unwrap();
            assert_eq!(c.used_sessions, i);
            apply(&mut t, c);
        }
        assert_eq!(t.status, TicketStatus::Completed);

        assert!(matches!(
            consume(&t),
            Err(CoreError::TicketExhausted { total: 5, .. })
        ));
    }

    #[test]
    fn test_undo_from_completed_reopens() {
        let t = ticket(5, 5, TicketStatus::Completed);
        let c = undo(&t).unwrap();
        assert_eq!(c.previous_used, 5);
        assert_eq!(c.used_sessions, 4);
        assert_eq!(c.status, TicketStatus::Active);
    }

    #[test]
    fn test_undo_at_zero_fails() {
        let t = ticket(5, 0, TicketStatus::Active);
        assert!(matches!(undo(&t), Err(CoreError::NothingToUndo(_))));
    }

    #[test]
    fn test_adjust_within_range() {
        let t = ticket(5, 1, TicketStatus::Active);
        let c = adjust(&t, 3).unwrap();
        assert_eq!((c.previous_used, c.used_sessions), (1, 3));
        assert_eq!(c.status, TicketStatus::Active);
        assert_eq!(c.remaining(), 2);

        let full = adjust(&t, 5).unwrap();
        assert_eq!(full.status, TicketStatus::Completed);

        let back = adjust(&ticket(5, 5, TicketStatus::Completed), 0).unwrap();
        assert_eq!(back.status, TicketStatus::Active);
    }

    #[test]
    fn test_adjust_out_of_range() {
        let t = ticket(5, 1, TicketStatus::Active);
        assert!(matches!(
            adjust(&t, 6),
            Err(CoreError::SessionsOutOfRange { requested: 6, total: 5, .. })
        ));
        assert!(adjust(&t, -1).is_err());
    }

    #[test]
    fn test_external_states_are_untouchable() {
        for status in [TicketStatus::Expired, TicketStatus::Cancelled] {
            let t = ticket(5, 2, status);
            assert!(matches!(consume(&t), Err(CoreError::TicketNotActive { .. })));
            assert!(matches!(undo(&t), Err(CoreError::TicketNotActive { .. })));
            assert!(matches!(adjust(&t, 1), Err(CoreError::TicketNotActive { .. })));
        }
    }
}
