pub mod common;
pub mod env;
pub mod error;
pub mod sim;
