//! Write-side wrapper: run a mutation function with merged callbacks

use super::options::MutationConfig;
use super::resource::Fetcher;
use crate::error::QueryKitError;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Shared handle to a mutation failure
pub type SharedError = Arc<QueryKitError>;

/// Lifecycle of a single mutation handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Latest outcome observed by a [`MutationHandle`]
#[derive(Debug, Clone)]
pub struct MutationState<R> {
    pub status: MutationStatus,
    pub data: Option<R>,
    pub error: Option<SharedError>,
}

impl<R> Default for MutationState<R> {
    fn default() -> Self {
        Self {
            status: MutationStatus::Idle,
            data: None,
            error: None,
        }
    }
}

/// Mutation function plus its default config
pub struct Mutation<D, R> {
    func: Arc<dyn Fetcher<D, R>>,
    default_config: MutationConfig<D, R>,
}

/// Wrap `func` so every handle created from it fires `default_config`
/// callbacks before the caller's own.
pub fn create_mutation<D, R, F>(
    func: F,
    default_config: Option<MutationConfig<D, R>>,
) -> Mutation<D, R>
where
    D: Send + 'static,
    R: Send + 'static,
    F: Fetcher<D, R> + 'static,
{
    Mutation {
        func: Arc::new(func),
        default_config: default_config.unwrap_or_default(),
    }
}

impl<D, R> Mutation<D, R>
where
    D: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    /// Create a handle with `config` layered over the defaults
    pub fn use_mutation(&self, config: Option<MutationConfig<D, R>>) -> MutationHandle<D, R> {
        MutationHandle {
            id: Uuid::new_v4(),
            func: self.func.clone(),
            config: MutationConfig::merge(config.as_ref(), Some(&self.default_config)),
            state: Arc::new(Mutex::new(MutationState::default())),
        }
    }
}

/// One mutation observer; tracks the outcome of its latest call
pub struct MutationHandle<D, R> {
    id: Uuid,
    func: Arc<dyn Fetcher<D, R>>,
    config: MutationConfig<D, R>,
    state: Arc<Mutex<MutationState<R>>>,
}

impl<D, R> MutationHandle<D, R>
where
    D: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Run the mutation once with `data`
    pub async fn mutate(&self, data: D) -> Result<R, SharedError> {
        {
            let mut state = self.state.lock();
            state.status = MutationStatus::Loading;
            state.error = None;
        }
        debug!("Mutation {} started", self.id);

        match self.func.fetch(data.clone()).await {
            Ok(result) => {
                {
                    let mut state = self.state.lock();
                    state.status = MutationStatus::Success;
                    state.data = Some(result.clone());
                }
                if let Some(on_success) = &self.config.on_success {
                    on_success(&result, &data);
                }
                Ok(result)
            }
            Err(e) => {
                debug!("Mutation {} failed: {}", self.id, e);
                let error = Arc::new(e);
                {
                    let mut state = self.state.lock();
                    state.status = MutationStatus::Error;
                    state.error = Some(error.clone());
                }
                if let Some(on_error) = &self.config.on_error {
                    on_error(error.as_ref(), &data);
                }
                Err(error)
            }
        }
    }

    /// Snapshot of the latest outcome
    pub fn state(&self) -> MutationState<R> {
        self.state.lock().clone()
    }

    /// Forget the latest outcome
    pub fn reset(&self) {
        *self.state.lock() = MutationState::default();
    }
}
