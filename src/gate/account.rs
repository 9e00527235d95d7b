//! Reactive account state: the current address and its energy

use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Snapshot of the signed-in account
#[derive(Debug, Clone, PartialEq)]
pub struct AccountState<A> {
    pub address: A,
    pub energy: f64,
}

/// Holds the account state and notifies subscribers on change
pub struct AccountStore<A> {
    tx: Arc<watch::Sender<AccountState<A>>>,
}

impl<A> Clone for AccountStore<A> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<A> AccountStore<A>
where
    A: PartialEq + Clone + std::fmt::Debug,
{
    pub fn new(address: A, energy: f64) -> Self {
        let (tx, _) = watch::channel(AccountState { address, energy });
        Self { tx: Arc::new(tx) }
    }

    /// Current state
    pub fn snapshot(&self) -> AccountState<A> {
        self.tx.borrow().clone()
    }

    /// Switch to another address; subscribers are only notified on change
    pub fn set_address(&self, address: A) {
        self.tx.send_if_modified(|state| {
            if state.address == address {
                return false;
            }
            debug!("Account switched to {:?}", address);
            state.address = address;
            true
        });
    }

    /// Record a new energy reading; subscribers are only notified on change
    pub fn set_energy(&self, energy: f64) {
        self.tx.send_if_modified(|state| {
            if state.energy == energy {
                return false;
            }
            state.energy = energy;
            true
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<AccountState<A>> {
        self.tx.subscribe()
    }
}
