//! CLI command implementations

pub mod config;
pub mod gate;
pub mod text;

pub use config::execute as config;
pub use gate::execute as gate;
pub use text::execute as text;
