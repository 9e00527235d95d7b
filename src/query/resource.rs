//! Typed query resources over the shared cache

use super::client::{QueryClient, QueryStatus};
use super::key::{QueryFilter, QueryKey};
use super::options::QueryConfig;
use crate::error::{QueryKitError, QueryKitResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Async function that produces the value for one input
///
/// Implemented for any `Fn(I) -> impl Future<Output = QueryKitResult<O>>`.
#[async_trait]
pub trait Fetcher<I, O>: Send + Sync {
    async fn fetch(&self, input: I) -> QueryKitResult<O>;
}

#[async_trait]
impl<I, O, F, Fut> Fetcher<I, O> for F
where
    F: Fn(I) -> Fut + Send + Sync,
    Fut: Future<Output = QueryKitResult<O>> + Send,
    I: Send + 'static,
    O: Send + 'static,
{
    async fn fetch(&self, input: I) -> QueryKitResult<O> {
        (self)(input).await
    }
}

/// Fetcher that loads extra context before every call, see [`wrap_query`]
pub struct WrappedQuery<F, G, A> {
    func: F,
    additional: G,
    _additional: PhantomData<fn() -> A>,
}

#[async_trait]
impl<I, O, A, F, Fut, G, GFut> Fetcher<I, O> for WrappedQuery<F, G, A>
where
    F: Fn(I, A) -> Fut + Send + Sync,
    Fut: Future<Output = QueryKitResult<O>> + Send,
    G: Fn() -> GFut + Send + Sync,
    GFut: Future<Output = QueryKitResult<A>> + Send,
    I: Send + 'static,
    O: Send + 'static,
    A: Send + 'static,
{
    async fn fetch(&self, input: I) -> QueryKitResult<O> {
        let additional = (self.additional)().await?;
        (self.func)(input, additional).await
    }
}

/// Build a fetcher that awaits `additional()` and hands its result to `func`
/// together with the query input.
pub fn wrap_query<F, G, A>(func: F, additional: G) -> WrappedQuery<F, G, A> {
    WrappedQuery {
        func,
        additional,
        _additional: PhantomData,
    }
}

/// What the cache holds for one key
#[derive(Debug, Clone, PartialEq)]
pub enum CacheSlot<T> {
    /// Never fetched or written
    Missing,
    /// Fetched or written without a value
    Empty,
    Filled(T),
}

impl<T> CacheSlot<T> {
    /// The value, if one is stored
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Filled(value) => Some(value),
            Self::Missing | Self::Empty => None,
        }
    }
}

/// Result of reading a query
#[derive(Debug, Clone)]
pub struct QueryState<O> {
    pub data: Option<O>,
    pub error: Option<Arc<QueryKitError>>,
    pub status: QueryStatus,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<O> QueryState<O> {
    /// Disabled or no input: nothing fetched, nothing loading
    pub fn idle() -> Self {
        Self {
            data: None,
            error: None,
            status: QueryStatus::Idle,
            updated_at: None,
        }
    }

    fn failed(error: Arc<QueryKitError>, data: Option<O>) -> Self {
        Self {
            data,
            error: Some(error),
            status: QueryStatus::Error,
            updated_at: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }
}

/// Where one input of a batch gets its state from
enum BatchSlot {
    Idle,
    Failed(Arc<QueryKitError>),
    /// Index into the deduplicated fetches
    Shared(usize),
}

/// True if any of the results is still loading
pub fn is_any_loading<O>(results: &[QueryState<O>]) -> bool {
    results.iter().any(QueryState::is_loading)
}

/// A named, typed resource backed by a fetcher
pub struct Query<I, O> {
    key: Arc<str>,
    fetcher: Arc<dyn Fetcher<I, O>>,
}

impl<I, O> Clone for Query<I, O> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            fetcher: self.fetcher.clone(),
        }
    }
}

/// Create a cached resource named `key` that loads values with `fetcher`
pub fn create_query<I, O, F>(key: impl Into<String>, fetcher: F) -> Query<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fetcher<I, O> + 'static,
{
    Query {
        key: Arc::from(key.into()),
        fetcher: Arc::new(fetcher),
    }
}

impl<I, O> Query<I, O>
where
    I: Serialize + Send + Sync + 'static,
    O: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Resource name
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Cache key for `input`
    pub fn get_query_key(&self, input: &I) -> QueryKitResult<QueryKey> {
        QueryKey::new(&*self.key, input)
    }

    /// Read `input` through the cache, fetching when absent or stale.
    ///
    /// A `None` input or a disabled merged config never fetches and yields an
    /// idle state. Fetch failures land in the returned state, not in a `Result`.
    pub async fn use_query(
        &self,
        client: &QueryClient,
        input: Option<I>,
        config: Option<&QueryConfig<O>>,
        default_config: Option<&QueryConfig<O>>,
    ) -> QueryState<O> {
        let merged = QueryConfig::merge(config, default_config);
        match input {
            Some(input) if merged.is_enabled() => self.run(client, input, &merged).await,
            _ => QueryState::idle(),
        }
    }

    /// Batch form of [`use_query`](Self::use_query), one state per input in
    /// input order. Inputs with the same cache key share one fetch.
    pub async fn use_queries(
        &self,
        client: &QueryClient,
        inputs: Vec<Option<I>>,
        config: Option<&QueryConfig<O>>,
        default_config: Option<&QueryConfig<O>>,
    ) -> Vec<QueryState<O>> {
        let merged = QueryConfig::merge(config, default_config);
        let mut unique: Vec<I> = Vec::new();
        let mut positions: HashMap<QueryKey, usize> = HashMap::new();

        let plan: Vec<BatchSlot> = inputs
            .into_iter()
            .map(|input| match input {
                Some(input) if merged.is_enabled() => match self.get_query_key(&input) {
                    Ok(key) => BatchSlot::Shared(*positions.entry(key).or_insert_with(|| {
                        unique.push(input);
                        unique.len() - 1
                    })),
                    Err(e) => BatchSlot::Failed(Arc::new(e)),
                },
                _ => BatchSlot::Idle,
            })
            .collect();

        let merged = &merged;
        let states =
            join_all(unique.into_iter().map(|input| self.run(client, input, merged))).await;

        plan.into_iter()
            .map(|slot| match slot {
                BatchSlot::Idle => QueryState::idle(),
                BatchSlot::Failed(error) => QueryState::failed(error, None),
                BatchSlot::Shared(index) => states[index].clone(),
            })
            .collect()
    }

    /// Mark entries stale. `None` targets the whole resource; `exact` limits
    /// the match to the precise key.
    pub fn invalidate(
        &self,
        client: &QueryClient,
        input: Option<&I>,
        exact: bool,
    ) -> QueryKitResult<usize> {
        let filter = match input {
            None => QueryFilter::resource(&*self.key),
            Some(input) => {
                QueryFilter::input(&*self.key, serde_json::to_value(input)?, exact)
            }
        };
        Ok(client.invalidate_queries(&filter))
    }

    /// Overwrite the cached value; `None` stores the empty sentinel
    pub fn set_query_data(
        &self,
        client: &QueryClient,
        input: &I,
        value: Option<O>,
    ) -> QueryKitResult<()> {
        let key = self.get_query_key(input)?;
        let value = match value {
            Some(value) => serde_json::to_value(&value)?,
            None => Value::Null,
        };
        client.set_query_data(key, value);
        Ok(())
    }

    /// Read the cached value without fetching
    pub fn get_query_data(&self, client: &QueryClient, input: &I) -> QueryKitResult<CacheSlot<O>> {
        let key = self.get_query_key(input)?;
        self.decode(client.get_query_data(&key))
    }

    /// Fetch once, store the result and hand it back
    pub async fn fetch_query(&self, client: &QueryClient, input: I) -> QueryKitResult<O> {
        let key = self.get_query_key(&input)?;
        let value = self.fetcher.fetch(input).await?;
        client.set_query_data(key, serde_json::to_value(&value)?);
        Ok(value)
    }

    async fn run(&self, client: &QueryClient, input: I, config: &QueryConfig<O>) -> QueryState<O> {
        let key = match self.get_query_key(&input) {
            Ok(key) => key,
            Err(e) => return QueryState::failed(Arc::new(e), None),
        };

        let stale_time = config.stale_time.unwrap_or(Duration::ZERO);
        let cached = client.entry(&key);
        if let Some(entry) = cached.as_ref().filter(|entry| entry.is_fresh(stale_time)) {
            debug!("Cache hit {}", key);
            return match self.decode(entry.data.clone()) {
                Ok(slot) => QueryState {
                    data: slot.into_option(),
                    error: None,
                    status: QueryStatus::Success,
                    updated_at: entry.updated_at,
                },
                Err(e) => QueryState::failed(Arc::new(e), None),
            };
        }

        debug!("Cache miss {}, fetching", key);
        let loading = client.mark_loading(&key);

        let fetched = match self.fetcher.fetch(input).await {
            Ok(value) => serde_json::to_value(&value)
                .map(|json| (value, json))
                .map_err(QueryKitError::from),
            Err(e) => Err(e),
        };
        loading.complete();

        match fetched {
            Ok((value, json)) => {
                client.set_query_data(key.clone(), json);
                if let Some(on_success) = &config.on_success {
                    on_success(&value);
                }
                QueryState {
                    data: Some(value),
                    error: None,
                    status: QueryStatus::Success,
                    updated_at: client.entry(&key).and_then(|entry| entry.updated_at),
                }
            }
            Err(e) => {
                debug!("Fetch failed for {}: {}", key, e);
                let error = Arc::new(e);
                client.record_error(&key, error.clone());
                if let Some(on_error) = &config.on_error {
                    on_error(error.as_ref());
                }
                let previous = cached
                    .and_then(|entry| self.decode(entry.data).ok())
                    .and_then(CacheSlot::into_option);
                QueryState::failed(error, previous)
            }
        }
    }

    fn decode(&self, stored: Option<Value>) -> QueryKitResult<CacheSlot<O>> {
        match stored {
            None => Ok(CacheSlot::Missing),
            Some(Value::Null) => Ok(CacheSlot::Empty),
            Some(json) => serde_json::from_value(json)
                .map(CacheSlot::Filled)
                .map_err(|e| QueryKitError::DataDecode {
                    resource: self.key.to_string(),
                    reason: e.to_string(),
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::CacheEvent;
    use parking_lot::Mutex;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
    }

    fn counted_profiles() -> (Query<String, Profile>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let query = create_query("profile", move |address: String| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if address == "broken" {
                    Err(QueryKitError::fetch("profile", "node unreachable"))
                } else {
                    Ok(Profile {
                        name: format!("user-{address}"),
                    })
                }
            }
        });
        (query, calls)
    }

    #[tokio::test]
    async fn none_input_does_not_fetch() {
        let client = QueryClient::new();
        let (query, calls) = counted_profiles();

        let state = query.use_query(&client, None, None, None).await;

        assert_eq!(state.status, QueryStatus::Idle);
        assert!(!state.is_loading());
        assert!(state.data.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn disabled_default_wins() {
        let client = QueryClient::new();
        let (query, calls) = counted_profiles();
        let default = QueryConfig::new().enabled(false);
        let caller = QueryConfig::new().enabled(true);

        let state = query
            .use_query(&client, Some("alice".into()), Some(&caller), Some(&default))
            .await;

        assert_eq!(state.status, QueryStatus::Idle);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(client.is_empty());
    }

    #[tokio::test]
    async fn fetch_populates_cache_and_fires_callbacks() {
        let client = QueryClient::new();
        let (query, _) = counted_profiles();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (seen.clone(), seen.clone());
        let default = QueryConfig::new()
            .on_success(move |p: &Profile| a.lock().push(format!("f {}", p.name)));
        let caller = QueryConfig::new()
            .on_success(move |p: &Profile| b.lock().push(format!("g {}", p.name)));

        let state = query
            .use_query(&client, Some("alice".into()), Some(&caller), Some(&default))
            .await;

        assert!(state.is_success());
        assert_eq!(state.data.unwrap().name, "user-alice");
        assert_eq!(*seen.lock(), vec!["f user-alice", "g user-alice"]);
        assert_eq!(
            query.get_query_data(&client, &"alice".to_string()).unwrap(),
            CacheSlot::Filled(Profile { name: "user-alice".into() })
        );
    }

    #[tokio::test]
    async fn fresh_entry_is_served_from_cache() {
        let client = QueryClient::new();
        let (query, calls) = counted_profiles();
        let config = QueryConfig::new().stale_time(Duration::from_secs(60));

        query.use_query(&client, Some("alice".into()), Some(&config), None).await;
        let second = query.use_query(&client, Some("alice".into()), Some(&config), None).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.data.unwrap().name, "user-alice");
    }

    #[tokio::test]
    async fn invalidation_forces_refetch() {
        let client = QueryClient::new();
        let (query, calls) = counted_profiles();
        let config = QueryConfig::new().stale_time(Duration::from_secs(60));

        query.use_query(&client, Some("alice".into()), Some(&config), None).await;
        assert_eq!(query.invalidate(&client, None, false).unwrap(), 1);
        query.use_query(&client, Some("alice".into()), Some(&config), None).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exact_invalidation_leaves_siblings() {
        let client = QueryClient::new();
        let (query, _) = counted_profiles();
        query.fetch_query(&client, "alice".into()).await.unwrap();
        query.fetch_query(&client, "bob".into()).await.unwrap();

        let count = query.invalidate(&client, Some(&"alice".to_string()), true).unwrap();

        assert_eq!(count, 1);
        let bob = query.get_query_key(&"bob".to_string()).unwrap();
        assert!(!client.entry(&bob).unwrap().stale);
    }

    #[tokio::test]
    async fn failure_surfaces_as_error_state() {
        let client = QueryClient::new();
        let (query, _) = counted_profiles();
        let errors = Arc::new(AtomicUsize::new(0));
        let counter = errors.clone();
        let config = QueryConfig::new().on_error(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let state = query
            .use_query(&client, Some("broken".into()), Some(&config), None)
            .await;

        assert!(state.is_error());
        assert!(state.error.unwrap().to_string().contains("node unreachable"));
        assert_eq!(errors.load(Ordering::SeqCst), 1);

        let key = query.get_query_key(&"broken".to_string()).unwrap();
        assert_eq!(client.entry(&key).unwrap().status, QueryStatus::Error);
    }

    #[tokio::test]
    async fn use_queries_isolates_failures_in_order() {
        let client = QueryClient::new();
        let (query, _) = counted_profiles();

        let results = query
            .use_queries(
                &client,
                vec![Some("broken".into()), Some("bob".into()), None],
                None,
                None,
            )
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].error.is_some());
        assert_eq!(results[1].data.as_ref().unwrap().name, "user-bob");
        assert_eq!(results[2].status, QueryStatus::Idle);
        assert!(!is_any_loading(&results));
    }

    #[tokio::test]
    async fn use_queries_shares_fetch_for_duplicate_inputs() {
        let client = QueryClient::new();
        let (query, calls) = counted_profiles();

        let results = query
            .use_queries(&client, vec![Some("bob".into()), Some("bob".into())], None, None)
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(results[0].data, results[1].data);
    }

    #[tokio::test]
    async fn abandoned_fetch_does_not_stay_loading() {
        let client = QueryClient::new();
        let mut events = client.subscribe();
        let query: Query<u32, u32> = create_query("slow", |_id: u32| async {
            std::future::pending::<QueryKitResult<u32>>().await
        });

        let outcome = tokio::time::timeout(
            Duration::from_millis(20),
            query.use_query(&client, Some(1), None, None),
        )
        .await;
        assert!(outcome.is_err());

        let key = query.get_query_key(&1).unwrap();
        assert_eq!(client.entry(&key).unwrap().status, QueryStatus::Idle);
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Updated(key.clone()));
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Updated(key));
    }

    #[tokio::test]
    async fn long_stale_time_serves_cached_value() {
        let client = QueryClient::new();
        let (query, calls) = counted_profiles();
        let config = QueryConfig::new().stale_time(Duration::from_millis(10_000_000_000_000_000));

        for _ in 0..2 {
            let state = query
                .use_query(&client, Some("alice".into()), Some(&config), None)
                .await;
            assert!(state.is_success());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn set_query_data_none_stores_empty_sentinel() {
        let client = QueryClient::new();
        let (query, _) = counted_profiles();
        let alice = "alice".to_string();

        assert_eq!(query.get_query_data(&client, &alice).unwrap(), CacheSlot::Missing);

        query.set_query_data(&client, &alice, None).unwrap();

        assert_eq!(query.get_query_data(&client, &alice).unwrap(), CacheSlot::Empty);
    }

    #[tokio::test]
    async fn fetch_query_returns_raw_and_writes_cache() {
        let client = QueryClient::new();
        let (query, calls) = counted_profiles();

        let profile = query.fetch_query(&client, "carol".into()).await.unwrap();

        assert_eq!(profile.name, "user-carol");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            query.get_query_data(&client, &"carol".to_string()).unwrap().into_option(),
            Some(profile)
        );
    }

    #[tokio::test]
    async fn fetch_query_error_leaves_cache_untouched() {
        let client = QueryClient::new();
        let (query, _) = counted_profiles();

        assert!(query.fetch_query(&client, "broken".into()).await.is_err());
        assert!(client.is_empty());
    }

    #[tokio::test]
    async fn optional_output_round_trips_through_sentinel() {
        let client = QueryClient::new();
        let query: Query<u32, Option<String>> =
            create_query("nickname", |_id: u32| async {
                Ok::<Option<String>, QueryKitError>(None)
            });

        let fetched = query.fetch_query(&client, 7).await.unwrap();

        assert_eq!(fetched, None);
        assert_eq!(query.get_query_data(&client, &7).unwrap(), CacheSlot::Empty);
    }

    #[tokio::test]
    async fn wrapped_query_receives_additional_data() {
        let client = QueryClient::new();
        let query = create_query(
            "balance",
            wrap_query(
                |account: String, decimals: u32| async move {
                    Ok::<_, QueryKitError>(format!("{account}:{decimals}"))
                },
                || async { Ok::<_, QueryKitError>(10u32) },
            ),
        );

        let value = query.fetch_query(&client, "alice".to_string()).await.unwrap();
        assert_eq!(value, "alice:10");
    }

    #[tokio::test]
    async fn wrapped_query_propagates_additional_failure() {
        let client = QueryClient::new();
        let query: Query<String, String> = create_query(
            "balance",
            wrap_query(
                |account: String, _decimals: u32| async move { Ok::<_, QueryKitError>(account) },
                || async { Err::<u32, _>(QueryKitError::Internal("no api".into())) },
            ),
        );

        assert!(query.fetch_query(&client, "alice".to_string()).await.is_err());
    }
}
