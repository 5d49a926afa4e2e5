use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketNumber(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlightId(pub i64);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PassengerId(pub String);

impl TicketNumber {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl PassengerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for FlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PassengerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A passenger's booking record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_no: TicketNumber,
    pub book_ref: String,
    pub passenger_id: PassengerId,
}

/// The flight a ticket is currently booked on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightAssignment {
    pub ticket_no: TicketNumber,
    pub flight_id: FlightId,
}

/// Denormalized copy of the assignment; its flight must always match the assignment's.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardingPass {
    pub ticket_no: TicketNumber,
    pub flight_id: FlightId,
    pub boarding_no: i64,
    pub seat_no: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub flight_id: FlightId,
    pub flight_no: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub scheduled_departure: DateTime<FixedOffset>,
}

/// Identity attached to an operation by the invoking session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallerContext {
    pub passenger_id: Option<PassengerId>,
}

impl CallerContext {
    pub fn for_passenger(passenger_id: impl Into<String>) -> Self {
        Self { passenger_id: Some(PassengerId::new(passenger_id)) }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Returns the passenger id when present and non-blank.
    pub fn passenger(&self) -> Option<&PassengerId> {
        self.passenger_id.as_ref().filter(|id| !id.0.trim().is_empty())
    }
}
