//! Query and mutation configuration with explicit merge policy
//!
//! Merging a caller config `C` over a default config `D`:
//!
//! | Field | Policy |
//! |-------|--------|
//! | `enabled` | `D.enabled.unwrap_or(true) && C.enabled.unwrap_or(true)` |
//! | `stale_time` | `C` overrides `D` |
//! | `on_success` / `on_error` | both fire, `D` first, isolated from each other |

use crate::config::QueryDefaults;
use crate::error::QueryKitError;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Lifecycle callback for a query
pub type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Lifecycle callback for a mutation, receiving the mutation input as well
pub type MutationCallback<T, D> = Arc<dyn Fn(&T, &D) + Send + Sync>;

/// Per-query options
pub struct QueryConfig<O> {
    /// Gate whether the fetch runs at all
    pub enabled: Option<bool>,

    /// How long a fetched entry is served without refetching
    pub stale_time: Option<Duration>,

    /// Called with the fetched value
    pub on_success: Option<Callback<O>>,

    /// Called with the fetch error
    pub on_error: Option<Callback<QueryKitError>>,
}

impl<O> QueryConfig<O> {
    /// Empty config, every field unset
    pub fn new() -> Self {
        Self {
            enabled: None,
            stale_time: None,
            on_success: None,
            on_error: None,
        }
    }

    /// Build the default layer from the loaded configuration file
    pub fn from_defaults(defaults: &QueryDefaults) -> Self {
        Self {
            enabled: Some(defaults.enabled),
            stale_time: Some(Duration::from_millis(defaults.stale_time_ms)),
            ..Self::new()
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    pub fn on_success(mut self, callback: impl Fn(&O) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl Fn(&QueryKitError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// Whether the fetch may execute; unset means enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

impl<O: 'static> QueryConfig<O> {
    /// Merge a caller config over a default config
    pub fn merge(config: Option<&Self>, default: Option<&Self>) -> Self {
        let enabled = default.and_then(|d| d.enabled).unwrap_or(true)
            && config.and_then(|c| c.enabled).unwrap_or(true);

        Self {
            enabled: Some(enabled),
            stale_time: config
                .and_then(|c| c.stale_time)
                .or_else(|| default.and_then(|d| d.stale_time)),
            on_success: combine_callbacks(
                "on_success",
                default.and_then(|d| d.on_success.as_ref()),
                config.and_then(|c| c.on_success.as_ref()),
            ),
            on_error: combine_callbacks(
                "on_error",
                default.and_then(|d| d.on_error.as_ref()),
                config.and_then(|c| c.on_error.as_ref()),
            ),
        }
    }
}

impl<O> Default for QueryConfig<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> Clone for QueryConfig<O> {
    fn clone(&self) -> Self {
        Self {
            enabled: self.enabled,
            stale_time: self.stale_time,
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<O> fmt::Debug for QueryConfig<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryConfig")
            .field("enabled", &self.enabled)
            .field("stale_time", &self.stale_time)
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Per-mutation options
pub struct MutationConfig<D, R> {
    /// Called with the mutation result and input
    pub on_success: Option<MutationCallback<R, D>>,

    /// Called with the mutation error and input
    pub on_error: Option<MutationCallback<QueryKitError, D>>,
}

impl<D, R> MutationConfig<D, R> {
    pub fn new() -> Self {
        Self {
            on_success: None,
            on_error: None,
        }
    }

    pub fn on_success(mut self, callback: impl Fn(&R, &D) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub fn on_error(
        mut self,
        callback: impl Fn(&QueryKitError, &D) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }
}

impl<D: 'static, R: 'static> MutationConfig<D, R> {
    /// Merge a caller config over a default config; both callbacks fire
    pub fn merge(config: Option<&Self>, default: Option<&Self>) -> Self {
        Self {
            on_success: combine_mutation_callbacks(
                "on_success",
                default.and_then(|d| d.on_success.as_ref()),
                config.and_then(|c| c.on_success.as_ref()),
            ),
            on_error: combine_mutation_callbacks(
                "on_error",
                default.and_then(|d| d.on_error.as_ref()),
                config.and_then(|c| c.on_error.as_ref()),
            ),
        }
    }
}

impl<D, R> Default for MutationConfig<D, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D, R> Clone for MutationConfig<D, R> {
    fn clone(&self) -> Self {
        Self {
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

/// Run one callback, containing a panic so sibling callbacks still run
fn invoke_isolated(name: &'static str, callback: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(callback)).is_err() {
        warn!("{} callback panicked, continuing with remaining callbacks", name);
    }
}

/// Combine default and caller callbacks into one that fires both in order
pub fn combine_callbacks<T: ?Sized + 'static>(
    name: &'static str,
    default: Option<&Callback<T>>,
    config: Option<&Callback<T>>,
) -> Option<Callback<T>> {
    if default.is_none() && config.is_none() {
        return None;
    }

    let default = default.cloned();
    let config = config.cloned();
    Some(Arc::new(move |value: &T| {
        for callback in [&default, &config].into_iter().flatten() {
            invoke_isolated(name, || callback(value));
        }
    }))
}

/// Two-argument variant of [`combine_callbacks`] for mutations
pub fn combine_mutation_callbacks<T: ?Sized + 'static, D: 'static>(
    name: &'static str,
    default: Option<&MutationCallback<T, D>>,
    config: Option<&MutationCallback<T, D>>,
) -> Option<MutationCallback<T, D>> {
    if default.is_none() && config.is_none() {
        return None;
    }

    let default = default.cloned();
    let config = config.cloned();
    Some(Arc::new(move |value: &T, data: &D| {
        for callback in [&default, &config].into_iter().flatten() {
            invoke_isolated(name, || callback(value, data));
        }
    }))
}
