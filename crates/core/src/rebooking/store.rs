use async_trait::async_trait;

use crate::domain::booking::{Flight, FlightAssignment, FlightId, PassengerId, Ticket, TicketNumber};
use crate::errors::StorageError;

/// Opens scoped units of work against the booking tables.
#[async_trait]
pub trait RebookingStore: Send + Sync {
    /// Starts a transaction that holds the write lock until commit or rollback.
    async fn begin(&self) -> Result<Box<dyn RebookingTransaction>, StorageError>;
}

/// A transaction over the booking tables.
///
/// Dropping a transaction without calling [`commit`](Self::commit) must discard its writes.
#[async_trait]
pub trait RebookingTransaction: Send {
    async fn find_flight(&mut self, flight_id: FlightId) -> Result<Option<Flight>, StorageError>;

    async fn find_assignment(
        &mut self,
        ticket_no: &TicketNumber,
    ) -> Result<Option<FlightAssignment>, StorageError>;

    async fn find_owned_ticket(
        &mut self,
        ticket_no: &TicketNumber,
        passenger_id: &PassengerId,
    ) -> Result<Option<Ticket>, StorageError>;

    /// Returns the number of assignment rows changed.
    async fn update_assignment_flight(
        &mut self,
        ticket_no: &TicketNumber,
        flight_id: FlightId,
    ) -> Result<u64, StorageError>;

    /// Returns the number of boarding pass rows changed.
    async fn update_boarding_pass_flight(
        &mut self,
        ticket_no: &TicketNumber,
        flight_id: FlightId,
    ) -> Result<u64, StorageError>;

    async fn commit(self: Box<Self>) -> Result<(), StorageError>;

    async fn rollback(self: Box<Self>) -> Result<(), StorageError>;
}
