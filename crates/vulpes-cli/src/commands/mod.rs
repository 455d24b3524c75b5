//! Command implementations for the Vulpes Shader CLI

pub mod check;
pub mod common;
pub mod info;
pub mod transpile;

pub use check::check_command;
pub use info::info_command;
pub use transpile::transpile_command;
