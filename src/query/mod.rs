//! Keyed query cache with typed read and write resources
//!
//! ```rust,ignore
//! use querykit::query::{create_query, QueryClient, QueryConfig};
//!
//! let client = QueryClient::new();
//! let profiles = create_query("profile", |address: String| async move {
//!     api.load_profile(&address).await
//! });
//!
//! let state = profiles.use_query(&client, Some(address), None, None).await;
//! profiles.invalidate(&client, None, false)?;
//! ```
//!
//! # Entry states
//!
//! | Slot | Meaning |
//! |------|---------|
//! | Missing | Never fetched or written |
//! | Empty | Fetched or written without a value (`null`) |
//! | Filled | Holds a value |

pub mod client;
pub mod key;
pub mod mutation;
pub mod options;
pub mod resource;

pub use client::{CacheEntry, CacheEvent, QueryClient, QueryStatus};
pub use key::{QueryFilter, QueryKey};
pub use mutation::{
    create_mutation, Mutation, MutationHandle, MutationState, MutationStatus, SharedError,
};
pub use options::{Callback, MutationCallback, MutationConfig, QueryConfig};
pub use resource::{
    create_query, is_any_loading, wrap_query, CacheSlot, Fetcher, Query, QueryState, WrappedQuery,
};
