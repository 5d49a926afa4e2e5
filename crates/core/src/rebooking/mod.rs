//! Ticket rebooking.
//!
//! Moving a ticket to another flight rewrites two rows that must always agree: the
//! ticket's flight assignment and its boarding pass. Both writes happen in one storage
//! transaction, after every validation step has passed inside that same transaction.

pub mod policy;
pub mod store;

use std::sync::Arc;

use chrono::{Duration, FixedOffset};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::RebookingConfig;
use crate::domain::booking::{CallerContext, FlightId, PassengerId, TicketNumber};
use crate::errors::RebookError;

pub use policy::{
    Clock, DepartureCheck, FixedClock, MinimumLeadTime, PermitAnyDeparture, PolicyDecision,
    RebookingPolicy, SystemClock,
};
pub use store::{RebookingStore, RebookingTransaction};

pub const REBOOK_SUCCESS_MESSAGE: &str = "Ticket successfully updated to new flight.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RebookOutcome {
    pub ticket_no: TicketNumber,
    pub previous_flight_id: FlightId,
    pub new_flight_id: FlightId,
    #[serde(serialize_with = "serialize_minutes")]
    pub time_until_departure: Duration,
    pub boarding_passes_updated: u64,
}

impl RebookOutcome {
    pub fn message(&self) -> &'static str {
        REBOOK_SUCCESS_MESSAGE
    }
}

fn serialize_minutes<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_i64(value.num_minutes())
}

pub struct RebookingService {
    store: Arc<dyn RebookingStore>,
    policy: Arc<dyn RebookingPolicy>,
    clock: Arc<dyn Clock>,
    reference_offset: FixedOffset,
}

impl RebookingService {
    pub fn new(store: Arc<dyn RebookingStore>) -> Self {
        Self {
            store,
            policy: Arc::new(PermitAnyDeparture),
            clock: Arc::new(SystemClock),
            reference_offset: policy::reference_offset(3),
        }
    }

    pub fn from_config(store: Arc<dyn RebookingStore>, config: &RebookingConfig) -> Self {
        Self::new(store)
            .with_policy(policy::policy_from_config(config))
            .with_reference_offset(policy::reference_offset(config.reference_utc_offset_hours))
    }

    pub fn with_policy(mut self, policy: Arc<dyn RebookingPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_reference_offset(mut self, offset: FixedOffset) -> Self {
        self.reference_offset = offset;
        self
    }

    /// Moves `ticket_no` to `new_flight_id` on behalf of the caller.
    ///
    /// Either both the flight assignment and the boarding pass end up on the new flight,
    /// or neither row changes.
    pub async fn rebook_ticket(
        &self,
        ticket_no: &TicketNumber,
        new_flight_id: FlightId,
        caller: &CallerContext,
    ) -> Result<RebookOutcome, RebookError> {
        let passenger_id = caller.passenger().ok_or(RebookError::MissingCallerContext)?;
        if ticket_no.is_blank() {
            return Err(RebookError::TicketNotFound { ticket_no: ticket_no.clone() });
        }

        let mut tx = self.store.begin().await?;
        let result = self.apply(tx.as_mut(), ticket_no, new_flight_id, passenger_id).await;

        match result {
            Ok(outcome) => {
                tx.commit().await?;
                info!(
                    event_name = "rebooking.committed",
                    ticket_no = %outcome.ticket_no,
                    previous_flight_id = outcome.previous_flight_id.0,
                    new_flight_id = outcome.new_flight_id.0,
                    minutes_until_departure = outcome.time_until_departure.num_minutes(),
                    boarding_passes_updated = outcome.boarding_passes_updated,
                    "ticket moved to new flight"
                );
                Ok(outcome)
            }
            Err(error) => {
                if let Err(rollback_error) = tx.rollback().await {
                    warn!(
                        event_name = "rebooking.rollback_failed",
                        ticket_no = %ticket_no,
                        error = %rollback_error,
                        "explicit rollback failed; connection discards the transaction"
                    );
                }
                self.log_rejection(&error, ticket_no, new_flight_id, passenger_id);
                Err(error)
            }
        }
    }

    async fn apply(
        &self,
        tx: &mut dyn RebookingTransaction,
        ticket_no: &TicketNumber,
        new_flight_id: FlightId,
        passenger_id: &PassengerId,
    ) -> Result<RebookOutcome, RebookError> {
        let flight = tx
            .find_flight(new_flight_id)
            .await?
            .ok_or(RebookError::InvalidFlight { flight_id: new_flight_id })?;

        let now = self.clock.now_utc().with_timezone(&self.reference_offset);
        let time_until_departure = flight.scheduled_departure.signed_duration_since(now);
        let check = DepartureCheck { flight: &flight, now, time_until_departure };
        if let PolicyDecision::Reject { reason } = self.policy.evaluate(&check) {
            return Err(RebookError::PolicyRejected { reason });
        }

        let assignment = tx
            .find_assignment(ticket_no)
            .await?
            .ok_or_else(|| RebookError::TicketNotFound { ticket_no: ticket_no.clone() })?;

        if tx.find_owned_ticket(ticket_no, passenger_id).await?.is_none() {
            return Err(RebookError::NotOwner {
                passenger_id: passenger_id.clone(),
                ticket_no: ticket_no.clone(),
            });
        }

        let assignments_updated = tx.update_assignment_flight(ticket_no, new_flight_id).await?;
        if assignments_updated == 0 {
            return Err(RebookError::StorageFailure(format!(
                "flight assignment for ticket {ticket_no} disappeared during update"
            )));
        }
        let boarding_passes_updated =
            tx.update_boarding_pass_flight(ticket_no, new_flight_id).await?;

        Ok(RebookOutcome {
            ticket_no: ticket_no.clone(),
            previous_flight_id: assignment.flight_id,
            new_flight_id,
            time_until_departure,
            boarding_passes_updated,
        })
    }

    fn log_rejection(
        &self,
        error: &RebookError,
        ticket_no: &TicketNumber,
        new_flight_id: FlightId,
        passenger_id: &PassengerId,
    ) {
        match error {
            RebookError::NotOwner { .. } => warn!(
                event_name = "rebooking.not_owner",
                ticket_no = %ticket_no,
                passenger_id = %passenger_id,
                new_flight_id = new_flight_id.0,
                "passenger attempted to rebook a ticket they do not own"
            ),
            RebookError::StorageFailure(cause) => warn!(
                event_name = "rebooking.storage_failure",
                ticket_no = %ticket_no,
                new_flight_id = new_flight_id.0,
                error = %cause,
                "rebooking rolled back after storage failure"
            ),
            other => info!(
                event_name = "rebooking.rejected",
                ticket_no = %ticket_no,
                new_flight_id = new_flight_id.0,
                policy = self.policy.name(),
                error_class = other.error_class(),
                "rebooking rejected"
            ),
        }
    }
}
