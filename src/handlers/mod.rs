/// Framework-level handlers
mod error;

pub use error::on_error;
