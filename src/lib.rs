//! querykit - keyed async query cache and account energy gate
//!
//! Typed query and mutation resources over a shared cache, an awaitable
//! gate that resolves once an account has energy, and the text helpers the
//! chat and account screens lean on.

pub mod cli;
pub mod config;
pub mod error;
pub mod gate;
pub mod query;
pub mod text;
pub mod ui;

pub use error::{QueryKitError, QueryKitResult};
