//! Account energy gating
//!
//! Callers that need energy before acting (sending a message, liking a post)
//! grab the latest wait from the gate and await it:
//!
//! ```rust,ignore
//! let store = AccountStore::new(address, 0.0);
//! let gate = Arc::new(EnergyGate::new(address, 0.0, GatePolicy::default()));
//! gate.drive(&store);
//!
//! let has_energy = gate.accessor();
//! has_energy().wait().await?;
//! ```
//!
//! # Policies
//!
//! | Policy | Wait created while energy > 0 |
//! |--------|-------------------------------|
//! | NextTransition | Resolves on the next change to a positive value |
//! | ResolveIfReady | Resolves immediately |

mod account;
mod energy;

pub use account::{AccountState, AccountStore};
pub use energy::{EnergyGate, EnergyWait, GatePolicy};
