//! Energy gate: awaitables that resolve once an account has energy
//!
//! Each gate owns a ledger of handed-out waits and a queue of pending
//! resolvers. Switching address appends a fresh wait instead of replacing the
//! old one, so callers still holding an earlier wait are resolved by the same
//! positive transition.

use super::account::AccountStore;
use crate::error::{QueryKitError, QueryKitResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// What happens to a wait created while energy is already positive
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum GatePolicy {
    /// Wait for the next change of energy to a positive value
    #[default]
    NextTransition,
    /// Resolve as soon as the wait exists if energy is already positive
    ResolveIfReady,
}

impl fmt::Display for GatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NextTransition => "next-transition",
            Self::ResolveIfReady => "resolve-if-ready",
        };
        write!(f, "{}", name)
    }
}

/// A single-resolution awaitable handed out by [`EnergyGate`]
#[derive(Debug, Clone)]
pub struct EnergyWait {
    id: u64,
    rx: watch::Receiver<bool>,
}

impl EnergyWait {
    /// Sequence number within its gate, starting at 0
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether energy has turned positive since this wait was created
    pub fn is_resolved(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until resolved; fails if the gate is dropped first
    pub async fn wait(mut self) -> QueryKitResult<()> {
        self.rx
            .wait_for(|resolved| *resolved)
            .await
            .map(|_| ())
            .map_err(|_| QueryKitError::GateClosed)
    }
}

struct Resolver {
    id: u64,
    tx: watch::Sender<bool>,
}

struct GateState<A> {
    address: A,
    energy: f64,
    resolvers: Vec<Resolver>,
    ledger: Vec<EnergyWait>,
    /// Same handle as the last ledger entry
    latest: EnergyWait,
    next_id: u64,
}

fn open_wait(id: u64) -> (Resolver, EnergyWait) {
    let (tx, rx) = watch::channel(false);
    (Resolver { id, tx }, EnergyWait { id, rx })
}

impl<A> GateState<A> {
    fn new(address: A, energy: f64) -> Self {
        let (resolver, wait) = open_wait(0);
        Self {
            address,
            energy,
            resolvers: vec![resolver],
            ledger: vec![wait.clone()],
            latest: wait,
            next_id: 1,
        }
    }

    fn push_wait(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        let (resolver, wait) = open_wait(id);
        self.resolvers.push(resolver);
        self.ledger.push(wait.clone());
        self.latest = wait;
        id
    }

    fn drain(&mut self) -> usize {
        let count = self.resolvers.len();
        for resolver in self.resolvers.drain(..) {
            resolver.tx.send_replace(true);
            debug!("Resolved energy wait {}", resolver.id);
        }
        count
    }
}

/// Condition gate over an (address, energy) pair
pub struct EnergyGate<A> {
    policy: GatePolicy,
    state: Mutex<GateState<A>>,
}

impl<A> EnergyGate<A>
where
    A: PartialEq + Clone + fmt::Debug,
{
    /// Create a gate with one pending wait
    pub fn new(address: A, energy: f64, policy: GatePolicy) -> Self {
        let mut state = GateState::new(address, energy);
        if policy == GatePolicy::ResolveIfReady && energy > 0.0 {
            state.drain();
        }

        Self {
            policy,
            state: Mutex::new(state),
        }
    }

    /// Switch identity; a changed address gets its own wait
    pub fn set_address(&self, address: A) {
        let mut state = self.state.lock();
        if state.address == address {
            return;
        }

        debug!("Energy gate address {:?} -> {:?}", state.address, address);
        state.address = address;
        let id = state.push_wait();
        debug!("Created energy wait {}", id);

        if self.policy == GatePolicy::ResolveIfReady && state.energy > 0.0 {
            state.drain();
        }
    }

    /// Feed a new energy reading; a changed positive value resolves every
    /// pending wait. Returns how many waits were resolved.
    pub fn set_energy(&self, energy: f64) -> usize {
        let mut state = self.state.lock();
        let changed = state.energy != energy;
        state.energy = energy;

        if !changed || energy <= 0.0 || energy.is_nan() {
            return 0;
        }

        let resolved = state.drain();
        if resolved > 0 {
            debug!("Energy {} resolved {} wait(s)", energy, resolved);
        }
        resolved
    }

    /// The most recently created wait
    pub fn latest(&self) -> EnergyWait {
        self.state.lock().latest.clone()
    }

    /// Every wait handed out so far, oldest first
    pub fn ledger(&self) -> Vec<EnergyWait> {
        self.state.lock().ledger.clone()
    }

    /// Number of waits not yet resolved
    pub fn pending(&self) -> usize {
        self.state.lock().resolvers.len()
    }

    pub fn address(&self) -> A {
        self.state.lock().address.clone()
    }

    pub fn energy(&self) -> f64 {
        self.state.lock().energy
    }

    pub fn policy(&self) -> GatePolicy {
        self.policy
    }
}

impl<A> EnergyGate<A>
where
    A: PartialEq + Clone + fmt::Debug + Send + Sync + 'static,
{
    /// Zero-argument accessor returning the latest wait at call time
    pub fn accessor(self: &Arc<Self>) -> impl Fn() -> EnergyWait + Send + Sync + 'static {
        let gate = Arc::clone(self);
        move || gate.latest()
    }

    /// Follow an account store: every update is applied as address first,
    /// then energy. The task ends when the store or the gate is dropped.
    pub fn drive(self: &Arc<Self>, store: &AccountStore<A>) -> JoinHandle<()> {
        let gate: Weak<Self> = Arc::downgrade(self);
        let mut updates = store.subscribe();

        tokio::spawn(async move {
            loop {
                let account = updates.borrow_and_update().clone();
                let Some(gate) = gate.upgrade() else {
                    break;
                };
                gate.set_address(account.address);
                gate.set_energy(account.energy);
                drop(gate);

                if updates.changed().await.is_err() {
                    break;
                }
            }
            debug!("Energy gate driver stopped");
        })
    }
}
