pub mod config;
pub mod domain;
pub mod errors;
pub mod rebooking;
pub mod retrieval;

pub use domain::booking::{
    BoardingPass, CallerContext, Flight, FlightAssignment, FlightId, PassengerId, Ticket,
    TicketNumber,
};
pub use domain::policy::{PassageId, PolicyPassage, ScoredPassage};
pub use errors::{ApplicationError, InterfaceError, RebookError, StorageError};
pub use rebooking::{RebookOutcome, RebookingService};
pub use retrieval::{PolicyLookup, PolicyLookupError};
