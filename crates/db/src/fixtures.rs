use chrono::{DateTime, Duration, FixedOffset, Utc};

use wayfare_core::TicketNumber;

use crate::connection::DbPool;
use crate::repositories::rebooking::{find_boarding_pass, format_scheduled_timestamp};
use crate::repositories::RepositoryError;

struct SeedFlight {
    flight_id: i64,
    flight_no: &'static str,
    departure_airport: &'static str,
    arrival_airport: &'static str,
    hours_from_now: i64,
    duration_minutes: i64,
}

struct SeedTicket {
    ticket_no: &'static str,
    book_ref: &'static str,
    passenger_id: &'static str,
    flight_id: i64,
    fare_conditions: &'static str,
    amount: i64,
    boarding: Option<(i64, &'static str)>,
}

/// Demo travel dataset; departures are placed relative to the seeding time.
const SEED_FLIGHTS: &[SeedFlight] = &[
    SeedFlight {
        flight_id: 19250,
        flight_no: "LX0112",
        departure_airport: "CDG",
        arrival_airport: "BSL",
        hours_from_now: 26,
        duration_minutes: 70,
    },
    SeedFlight {
        flight_id: 19251,
        flight_no: "LX0112",
        departure_airport: "CDG",
        arrival_airport: "BSL",
        hours_from_now: 50,
        duration_minutes: 70,
    },
    SeedFlight {
        flight_id: 19252,
        flight_no: "LX0114",
        departure_airport: "CDG",
        arrival_airport: "BSL",
        hours_from_now: 2,
        duration_minutes: 70,
    },
    SeedFlight {
        flight_id: 19253,
        flight_no: "LX0318",
        departure_airport: "ZRH",
        arrival_airport: "LHR",
        hours_from_now: 74,
        duration_minutes: 105,
    },
];

const SEED_TICKETS: &[SeedTicket] = &[
    SeedTicket {
        ticket_no: "N3J2LG",
        book_ref: "C46E9F",
        passenger_id: "3442 587242",
        flight_id: 19250,
        fare_conditions: "Economy",
        amount: 23400,
        boarding: Some((17, "12C")),
    },
    SeedTicket {
        ticket_no: "7240005432906569",
        book_ref: "C46E9F",
        passenger_id: "3442 587242",
        flight_id: 19253,
        fare_conditions: "Business",
        amount: 91200,
        boarding: None,
    },
    SeedTicket {
        ticket_no: "7240005432906570",
        book_ref: "8D2F1A",
        passenger_id: "8149 604011",
        flight_id: 19253,
        fare_conditions: "Economy",
        amount: 31800,
        boarding: Some((44, "27A")),
    },
];

pub struct TravelSeedDataset;

impl TravelSeedDataset {
    /// Inserts the demo dataset, leaving rows that already exist untouched.
    pub async fn load(pool: &DbPool, now: DateTime<Utc>) -> Result<SeedResult, RepositoryError> {
        let offset = FixedOffset::west_opt(4 * 3600)
            .ok_or_else(|| RepositoryError::Decode("invalid seed offset".to_string()))?;
        let mut tx = pool.begin().await?;
        let mut flights_inserted = 0;
        let mut tickets_inserted = 0;

        for flight in SEED_FLIGHTS {
            let departure = (now + Duration::hours(flight.hours_from_now)).with_timezone(&offset);
            let arrival = departure + Duration::minutes(flight.duration_minutes);
            let result = sqlx::query(
                "INSERT OR IGNORE INTO flights (
                    flight_id, flight_no, scheduled_departure, scheduled_arrival,
                    departure_airport, arrival_airport, status, aircraft_code
                 ) VALUES (?, ?, ?, ?, ?, ?, 'Scheduled', '321')",
            )
            .bind(flight.flight_id)
            .bind(flight.flight_no)
            .bind(format_scheduled_timestamp(&departure))
            .bind(format_scheduled_timestamp(&arrival))
            .bind(flight.departure_airport)
            .bind(flight.arrival_airport)
            .execute(&mut *tx)
            .await?;
            flights_inserted += result.rows_affected();
        }

        for ticket in SEED_TICKETS {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO tickets (ticket_no, book_ref, passenger_id) VALUES (?, ?, ?)",
            )
            .bind(ticket.ticket_no)
            .bind(ticket.book_ref)
            .bind(ticket.passenger_id)
            .execute(&mut *tx)
            .await?;
            tickets_inserted += result.rows_affected();

            sqlx::query(
                "INSERT OR IGNORE INTO ticket_flights (ticket_no, flight_id, fare_conditions, amount)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(ticket.ticket_no)
            .bind(ticket.flight_id)
            .bind(ticket.fare_conditions)
            .bind(ticket.amount)
            .execute(&mut *tx)
            .await?;

            if let Some((boarding_no, seat_no)) = ticket.boarding {
                sqlx::query(
                    "INSERT OR IGNORE INTO boarding_passes (ticket_no, flight_id, boarding_no, seat_no)
                     VALUES (?, ?, ?, ?)",
                )
                .bind(ticket.ticket_no)
                .bind(ticket.flight_id)
                .bind(boarding_no)
                .bind(seat_no)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        Ok(SeedResult { flights_inserted, tickets_inserted })
    }

    /// Checks the dataset is present and every boarding pass agrees with its assignment.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let flight_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM flights WHERE flight_id IN (19250, 19251, 19252, 19253)",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("flights", flight_count == SEED_FLIGHTS.len() as i64));

        let ticket_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM tickets
             WHERE ticket_no IN ('N3J2LG', '7240005432906569', '7240005432906570')",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("tickets", ticket_count == SEED_TICKETS.len() as i64));

        let assignment_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM ticket_flights
             WHERE ticket_no IN ('N3J2LG', '7240005432906569', '7240005432906570')",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("ticket-flights", assignment_count == SEED_TICKETS.len() as i64));

        let mismatched_passes: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM boarding_passes bp
             JOIN ticket_flights tf ON tf.ticket_no = bp.ticket_no
             WHERE bp.flight_id <> tf.flight_id",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("boarding-passes-in-sync", mismatched_passes == 0));

        let demo_pass = find_boarding_pass(pool, &TicketNumber::new("N3J2LG")).await?;
        checks.push(("demo-boarding-pass", demo_pass.is_some_and(|pass| pass.seat_no == "12C")));

        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub flights_inserted: u64,
    pub tickets_inserted: u64,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
