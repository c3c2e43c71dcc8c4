/// Log retention scheduling
mod manager;
mod retention;
mod types;

pub use manager::start_retention_scheduler;
