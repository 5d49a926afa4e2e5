use std::sync::Arc;

use wayfare_core::{CallerContext, FlightId, RebookError, RebookingService, TicketNumber};
use wayfare_db::repositories::SqlRebookingStore;

use crate::commands::{
    build_runtime, load_config, open_migrated_pool, CommandResult, Failure, EXIT_EXECUTION,
    EXIT_REJECTED,
};

/// Moves a ticket to another flight on behalf of `passenger`.
pub fn run(ticket: &str, flight: i64, passenger: Option<&str>) -> CommandResult {
    let config = match load_config() {
        Ok(config) => config,
        Err(failure) => return CommandResult::from_failure("rebook", failure),
    };

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(failure) => return CommandResult::from_failure("rebook", failure),
    };

    let caller = passenger.map(CallerContext::for_passenger).unwrap_or_else(CallerContext::anonymous);
    let ticket_no = TicketNumber::new(ticket.trim());

    let result = runtime.block_on(async {
        let pool = open_migrated_pool(&config).await?;
        let service = RebookingService::from_config(
            Arc::new(SqlRebookingStore::new(pool.clone())),
            &config.rebooking,
        );

        let outcome = service.rebook_ticket(&ticket_no, FlightId(flight), &caller).await;
        pool.close().await;
        outcome.map_err(|error| rebook_failure(&error))
    });

    match result {
        Ok(outcome) => CommandResult::success_with_data(
            "rebook",
            outcome.message(),
            serde_json::to_value(&outcome).ok(),
        ),
        Err(failure) => CommandResult::from_failure("rebook", failure),
    }
}

fn rebook_failure(error: &RebookError) -> Failure {
    let exit_code = if error.is_retryable() { EXIT_EXECUTION } else { EXIT_REJECTED };
    (error.error_class(), error.to_string(), exit_code)
}
