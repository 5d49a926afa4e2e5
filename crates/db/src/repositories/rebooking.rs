use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sqlx::{Row, Sqlite, Transaction};
use tracing::debug;

use wayfare_core::domain::booking::{
    BoardingPass, Flight, FlightAssignment, FlightId, PassengerId, Ticket, TicketNumber,
};
use wayfare_core::errors::StorageError;
use wayfare_core::rebooking::{RebookingStore, RebookingTransaction};

use super::RepositoryError;
use crate::DbPool;

/// Timestamp layouts found in the travel database, most specific first.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%z",
];

pub fn parse_scheduled_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, RepositoryError> {
    let trimmed = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(trimmed).ok())
        .ok_or_else(|| RepositoryError::Decode(format!("unrecognized timestamp `{raw}`")))
}

pub fn format_scheduled_timestamp(value: &DateTime<FixedOffset>) -> String {
    value.format("%Y-%m-%d %H:%M:%S%.6f%:z").to_string()
}

/// Reads the boarding pass issued for `ticket_no`, if the passenger has checked in.
pub async fn find_boarding_pass(
    pool: &DbPool,
    ticket_no: &TicketNumber,
) -> Result<Option<BoardingPass>, RepositoryError> {
    let row = sqlx::query(
        "SELECT ticket_no, flight_id, boarding_no, seat_no FROM boarding_passes WHERE ticket_no = ?",
    )
    .bind(ticket_no.as_str())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    Ok(Some(BoardingPass {
        ticket_no: TicketNumber(row.try_get("ticket_no")?),
        flight_id: FlightId(row.try_get("flight_id")?),
        boarding_no: row.try_get("boarding_no")?,
        seat_no: row.try_get("seat_no")?,
    }))
}

pub struct SqlRebookingStore {
    pool: DbPool,
}

impl SqlRebookingStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RebookingStore for SqlRebookingStore {
    async fn begin(&self) -> Result<Box<dyn RebookingTransaction>, StorageError> {
        // IMMEDIATE takes the database write lock before the first read, so concurrent
        // rebookings queue here instead of racing on stale snapshots.
        let tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(RepositoryError::from)?;
        debug!(event_name = "rebooking.transaction_started", "write transaction started");
        Ok(Box::new(SqlRebookingTransaction { tx }))
    }
}

pub struct SqlRebookingTransaction {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl RebookingTransaction for SqlRebookingTransaction {
    async fn find_flight(&mut self, flight_id: FlightId) -> Result<Option<Flight>, StorageError> {
        let row = sqlx::query(
            "SELECT flight_id, flight_no, departure_airport, arrival_airport, scheduled_departure
             FROM flights WHERE flight_id = ?",
        )
        .bind(flight_id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(RepositoryError::from)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let scheduled_departure: String =
            row.try_get("scheduled_departure").map_err(RepositoryError::from)?;
        Ok(Some(Flight {
            flight_id: FlightId(row.try_get("flight_id").map_err(RepositoryError::from)?),
            flight_no: row.try_get("flight_no").map_err(RepositoryError::from)?,
            departure_airport: row.try_get("departure_airport").map_err(RepositoryError::from)?,
            arrival_airport: row.try_get("arrival_airport").map_err(RepositoryError::from)?,
            scheduled_departure: parse_scheduled_timestamp(&scheduled_departure)?,
        }))
    }

    async fn find_assignment(
        &mut self,
        ticket_no: &TicketNumber,
    ) -> Result<Option<FlightAssignment>, StorageError> {
        let flight_id: Option<i64> =
            sqlx::query_scalar("SELECT flight_id FROM ticket_flights WHERE ticket_no = ?")
                .bind(ticket_no.as_str())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(RepositoryError::from)?;

        Ok(flight_id.map(|flight_id| FlightAssignment {
            ticket_no: ticket_no.clone(),
            flight_id: FlightId(flight_id),
        }))
    }

    async fn find_owned_ticket(
        &mut self,
        ticket_no: &TicketNumber,
        passenger_id: &PassengerId,
    ) -> Result<Option<Ticket>, StorageError> {
        let row = sqlx::query(
            "SELECT ticket_no, book_ref, passenger_id
             FROM tickets WHERE ticket_no = ? AND passenger_id = ?",
        )
        .bind(ticket_no.as_str())
        .bind(passenger_id.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(RepositoryError::from)?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Ticket {
            ticket_no: TicketNumber(row.try_get("ticket_no").map_err(RepositoryError::from)?),
            book_ref: row.try_get("book_ref").map_err(RepositoryError::from)?,
            passenger_id: PassengerId(row.try_get("passenger_id").map_err(RepositoryError::from)?),
        }))
    }

    async fn update_assignment_flight(
        &mut self,
        ticket_no: &TicketNumber,
        flight_id: FlightId,
    ) -> Result<u64, StorageError> {
        let result = sqlx::query("UPDATE ticket_flights SET flight_id = ? WHERE ticket_no = ?")
            .bind(flight_id.0)
            .bind(ticket_no.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(RepositoryError::from)?;
        Ok(result.rows_affected())
    }

    async fn update_boarding_pass_flight(
        &mut self,
        ticket_no: &TicketNumber,
        flight_id: FlightId,
    ) -> Result<u64, StorageError> {
        let result = sqlx::query("UPDATE boarding_passes SET flight_id = ? WHERE ticket_no = ?")
            .bind(flight_id.0)
            .bind(ticket_no.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(RepositoryError::from)?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        self.tx.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        self.tx.rollback().await.map_err(RepositoryError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone, Timelike};

    use super::{format_scheduled_timestamp, parse_scheduled_timestamp};

    #[test]
    fn parses_travel_database_timestamps() {
        let parsed = parse_scheduled_timestamp("2024-05-03 12:09:03.561731-04:00").expect("parse");
        assert_eq!(parsed.offset().local_minus_utc(), -4 * 3600);
        assert_eq!(parsed.hour(), 12);
        assert_eq!(parsed.nanosecond(), 561_731_000);

        assert!(parse_scheduled_timestamp("2024-05-03 12:09:03-0400").is_ok());
        assert!(parse_scheduled_timestamp("2024-05-03T12:09:03+03:00").is_ok());
        assert!(parse_scheduled_timestamp("yesterday").is_err());
    }

    #[test]
    fn formatted_timestamps_parse_back() {
        let offset = FixedOffset::east_opt(3 * 3600).expect("offset");
        let value = offset.with_ymd_and_hms(2024, 5, 3, 9, 30, 0).single().expect("timestamp");

        let formatted = format_scheduled_timestamp(&value);
        assert_eq!(formatted, "2024-05-03 09:30:00.000000+03:00");
        assert_eq!(parse_scheduled_timestamp(&formatted).expect("parse"), value);
    }
}
