pub mod messages;
pub mod references;
pub mod string_utils;
pub mod timezone;
pub mod validation;
