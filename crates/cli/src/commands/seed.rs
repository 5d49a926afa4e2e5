use chrono::Utc;
use wayfare_db::TravelSeedDataset;

use crate::commands::{
    build_runtime, load_config, open_migrated_pool, CommandResult, Failure, EXIT_EXECUTION,
    EXIT_REJECTED,
};

pub fn run() -> CommandResult {
    let config = match load_config() {
        Ok(config) => config,
        Err(failure) => return CommandResult::from_failure("seed", failure),
    };

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(failure) => return CommandResult::from_failure("seed", failure),
    };

    let result = runtime.block_on(async {
        let pool = open_migrated_pool(&config).await?;

        let seed_result = TravelSeedDataset::load(&pool, Utc::now())
            .await
            .map_err(|error| ("seed_execution", error.to_string(), EXIT_EXECUTION))?;

        let verification = TravelSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), EXIT_REJECTED))?;

        let run_result: Result<(u64, u64), Failure> = if verification.all_present {
            Ok((seed_result.flights_inserted, seed_result.tickets_inserted))
        } else {
            let failed_checks = verification
                .checks
                .iter()
                .filter_map(|(check, passed)| (!passed).then_some(*check))
                .collect::<Vec<_>>();
            Err(("seed_verification", verification_message(&failed_checks), EXIT_REJECTED))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok((flights, tickets)) => CommandResult::success(
            "seed",
            format!(
                "travel dataset present ({flights} flights and {tickets} tickets inserted); \
                 demo ticket N3J2LG belongs to passenger 3442 587242"
            ),
        ),
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

fn verification_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
