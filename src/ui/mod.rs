//! Terminal output helpers
//!
//! Uses `cliclack` framing in interactive terminals and plain prefixed lines
//! everywhere else, so command output stays greppable in CI and tests.

mod context;
mod output;

pub use context::UiContext;
pub use output::{
    intro, key_value_status, step_error_detail, step_info, step_ok, step_ok_detail,
    step_warn_hint,
};
