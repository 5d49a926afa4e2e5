use wayfare_db::{restore_from_backup, sqlite_file_path, BackupError};

use crate::commands::{build_runtime, load_config, CommandResult, EXIT_CONFIG, EXIT_EXECUTION};

pub fn run() -> CommandResult {
    let config = match load_config() {
        Ok(config) => config,
        Err(failure) => return CommandResult::from_failure("reset", failure),
    };

    let Some(backup_url) = config.database.backup_url.as_deref() else {
        return CommandResult::failure(
            "reset",
            "config_validation",
            "database.backup_url is not configured (set WAYFARE_DATABASE_BACKUP_URL)",
            EXIT_CONFIG,
        );
    };

    let paths = sqlite_file_path(backup_url)
        .and_then(|backup| Ok((backup, sqlite_file_path(&config.database.url)?)));
    let (backup, local) = match paths {
        Ok(paths) => paths,
        Err(error) => {
            return CommandResult::failure("reset", "config_validation", error.to_string(), EXIT_CONFIG)
        }
    };
    if backup == local {
        return CommandResult::failure(
            "reset",
            "config_validation",
            "database.backup_url must point to a different file than database.url",
            EXIT_CONFIG,
        );
    }

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(failure) => return CommandResult::from_failure("reset", failure),
    };

    match runtime.block_on(restore_from_backup(&backup, &local)) {
        Ok(bytes) => CommandResult::success(
            "reset",
            format!("restored `{}` from `{}` ({bytes} bytes)", local.display(), backup.display()),
        ),
        Err(error @ BackupError::MissingBackup(_)) => {
            CommandResult::failure("reset", "missing_backup", error.to_string(), EXIT_EXECUTION)
        }
        Err(error) => {
            CommandResult::failure("reset", "reset_execution", error.to_string(), EXIT_EXECUTION)
        }
    }
}
