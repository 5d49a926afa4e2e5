use thiserror::Error;

use crate::domain::booking::{FlightId, PassengerId, TicketNumber};
use crate::retrieval::PolicyLookupError;

/// Failure reported by a storage backend, carrying the driver's message.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct StorageError(pub String);

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RebookError {
    #[error("no passenger ID configured for the current session")]
    MissingCallerContext,
    #[error("invalid new flight ID provided: {flight_id}")]
    InvalidFlight { flight_id: FlightId },
    #[error("no existing ticket found for ticket number {ticket_no}")]
    TicketNotFound { ticket_no: TicketNumber },
    #[error("current signed-in passenger with ID {passenger_id} is not the owner of ticket {ticket_no}")]
    NotOwner { passenger_id: PassengerId, ticket_no: TicketNumber },
    #[error("rebooking not permitted: {reason}")]
    PolicyRejected { reason: String },
    #[error("error updating ticket: {0}")]
    StorageFailure(String),
}

impl RebookError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::MissingCallerContext => "missing_caller_context",
            Self::InvalidFlight { .. } => "invalid_flight",
            Self::TicketNotFound { .. } => "ticket_not_found",
            Self::NotOwner { .. } => "not_owner",
            Self::PolicyRejected { .. } => "policy_rejected",
            Self::StorageFailure(_) => "storage_failure",
        }
    }

    /// Only storage failures may succeed on retry; business rejections never will.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageFailure(_))
    }
}

impl From<StorageError> for RebookError {
    fn from(value: StorageError) -> Self {
        Self::StorageFailure(value.0)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Rebooking(#[from] RebookError),
    #[error(transparent)]
    PolicyLookup(#[from] PolicyLookupError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let unassigned = || "unassigned".to_owned();
        match value {
            ApplicationError::Rebooking(error @ RebookError::MissingCallerContext) => {
                Self::Internal { message: error.to_string(), correlation_id: unassigned() }
            }
            ApplicationError::Rebooking(error @ RebookError::StorageFailure(_)) => {
                Self::ServiceUnavailable { message: error.to_string(), correlation_id: unassigned() }
            }
            ApplicationError::Rebooking(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id: unassigned() }
            }
            ApplicationError::PolicyLookup(error @ PolicyLookupError::EmptyQuery) => {
                Self::BadRequest { message: error.to_string(), correlation_id: unassigned() }
            }
            ApplicationError::PolicyLookup(error) => {
                Self::ServiceUnavailable { message: error.to_string(), correlation_id: unassigned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::booking::{FlightId, PassengerId, TicketNumber};
    use crate::errors::{ApplicationError, InterfaceError, RebookError, StorageError};
    use crate::retrieval::PolicyLookupError;

    #[test]
    fn policy_lookup_failures_split_between_caller_and_provider() {
        let empty = ApplicationError::from(PolicyLookupError::EmptyQuery).into_interface("req-4");
        assert!(matches!(empty, InterfaceError::BadRequest { .. }));

        let provider =
            ApplicationError::from(PolicyLookupError::Embedding("rate limited".to_owned()))
                .into_interface("req-5");
        assert!(matches!(
            provider,
            InterfaceError::ServiceUnavailable { ref message, ref correlation_id }
                if message.contains("rate limited") && correlation_id == "req-5"
        ));
    }

    #[test]
    fn business_rejection_maps_to_bad_request_interface_error() {
        let interface = ApplicationError::from(RebookError::TicketNotFound {
            ticket_no: TicketNumber::new("ZZZ999"),
        })
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn storage_failure_maps_to_service_unavailable() {
        let interface = ApplicationError::from(RebookError::from(StorageError::new(
            "database is locked",
        )))
        .into_interface("req-2");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn missing_caller_context_is_an_internal_fault() {
        let interface =
            ApplicationError::from(RebookError::MissingCallerContext).into_interface("req-3");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }

    #[test]
    fn not_owner_message_names_passenger_and_ticket() {
        let error = RebookError::NotOwner {
            passenger_id: PassengerId::new("8149 604011"),
            ticket_no: TicketNumber::new("N3J2LG"),
        };

        let message = error.to_string();
        assert!(message.contains("8149 604011"));
        assert!(message.contains("N3J2LG"));
        assert_eq!(error.error_class(), "not_owner");
        assert!(!error.is_retryable());
    }

    #[test]
    fn only_storage_failures_are_retryable() {
        assert!(RebookError::StorageFailure("busy".to_owned()).is_retryable());
        assert!(!RebookError::InvalidFlight { flight_id: FlightId(1) }.is_retryable());
        assert!(!RebookError::MissingCallerContext.is_retryable());
        assert!(!RebookError::PolicyRejected { reason: "too late".to_owned() }.is_retryable());
    }
}
