pub mod backup;
pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use backup::{restore_from_backup, sqlite_file_path, BackupError};
pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{SeedResult, TravelSeedDataset, VerificationResult};
