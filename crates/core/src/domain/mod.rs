pub mod booking;
pub mod policy;
