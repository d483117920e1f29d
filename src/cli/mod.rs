pub mod commands;
pub mod validate;
pub mod verify;

pub use commands::{Cli, Commands};
