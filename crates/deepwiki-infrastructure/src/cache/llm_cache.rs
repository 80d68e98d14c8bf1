use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use deepwiki_domain::entities::CacheRecord;
use deepwiki_domain::error::ProviderError;
use deepwiki_domain::ports::{CacheStats, CacheStore, EmbeddingProvider, GenerateStream, LlmProvider};
use deepwiki_domain::value_objects::LlmCacheConfig;
use futures::stream;
use futures::StreamExt;
use moka::future::Cache;
use tracing::debug;

/// Number of artificial chunks a cache hit is split into for `generate_stream`,
/// per §4.6's "small number of artificial chunks" wrapping contract.
const STREAM_HIT_CHUNK_COUNT: usize = 4;

fn now_epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs_f64()
}

/// Splits `text` into at most `parts` roughly equal chunks on char
/// boundaries, used to turn a cached response into an artificial stream.
fn split_into_chunks(text: &str, parts: usize) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }
    let chars: Vec<char> = text.chars().collect();
    let parts = parts.max(1).min(chars.len().max(1));
    let chunk_len = chars.len().div_ceil(parts);
    chars
        .chunks(chunk_len)
        .map(|c| c.iter().collect::<String>())
        .collect()
}

/// Persists a freshly generated response to the durable store and, once the
/// row count exceeds `max_entries`, runs TTL eviction. §4.6 "On write" +
/// "Eviction": eviction runs after every insert, gated on `row_count >
/// max_entries`.
#[allow(clippy::too_many_arguments)]
async fn persist_and_evict(
    store: &Arc<dyn CacheStore>,
    embedder: &Arc<dyn EmbeddingProvider>,
    config: &LlmCacheConfig,
    system_prompt: &str,
    prompt: &str,
    response: &str,
    temperature: f64,
    model_name: &str,
) {
    let exact_hash = CacheRecord::compute_exact_hash(system_prompt, prompt);
    let Ok(vectors) = embedder.embed(&[format!("{system_prompt}\n---\n{prompt}")]).await else {
        return;
    };
    let Some(vector) = vectors.into_iter().next() else {
        return;
    };

    let record = CacheRecord {
        id: uuid::Uuid::new_v4().to_string(),
        exact_hash,
        vector,
        system_prompt: system_prompt.to_string(),
        prompt: prompt.to_string(),
        response: response.to_string(),
        temperature,
        model_name: model_name.to_string(),
        created_at: now_epoch_seconds(),
        hit_count: 0,
        last_hit_at: None,
        ttl_seconds: config.ttl_seconds,
    };
    if let Err(e) = store.insert(record).await {
        debug!("failed to persist cache record: {e}");
        return;
    }

    match store.row_count().await {
        Ok(count) if count > config.max_entries => match store.evict_expired(now_epoch_seconds(), 100).await {
            Ok(deleted) => {
                if deleted > 0 {
                    debug!("evicted {deleted} expired cache records after insert");
                }
            }
            Err(e) => debug!("post-insert cache eviction failed: {e}"),
        },
        Ok(_) => {}
        Err(e) => debug!("failed to read cache row count: {e}"),
    }
}

/// Decorator over any `LlmProvider`: a two-path lookup (exact hash, then
/// embedding similarity) backed by an in-process moka front cache and a
/// durable `CacheStore`. §4.6.
pub struct LlmCache {
    inner: Arc<dyn LlmProvider>,
    store: Arc<dyn CacheStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    front: Cache<String, String>,
    config: LlmCacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    skipped: AtomicU64,
}

impl LlmCache {
    pub fn new(
        inner: Arc<dyn LlmProvider>,
        store: Arc<dyn CacheStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: LlmCacheConfig,
    ) -> Self {
        let front = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(Duration::from_secs(config.ttl_seconds))
            .build();
        LlmCache {
            inner,
            store,
            embedder,
            front,
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    /// Deletes every durable record whose TTL has expired, paging through
    /// `batch_size` rows at a time until a pass returns nothing.
    pub async fn evict_expired(&self, batch_size: usize) -> Result<u64, ProviderError> {
        let now = now_epoch_seconds();
        let mut total = 0u64;
        loop {
            let deleted = self
                .store
                .evict_expired(now, batch_size)
                .await
                .map_err(|e| ProviderError::Invocation(e.to_string()))?;
            total += deleted;
            if deleted == 0 {
                break;
            }
        }
        Ok(total)
    }

    async fn lookup(&self, system_prompt: &str, prompt: &str, model_name: &str) -> Option<String> {
        let exact_hash = CacheRecord::compute_exact_hash(system_prompt, prompt);

        if let Some(response) = self.front.get(&exact_hash).await {
            return Some(response);
        }

        match self.store.lookup_exact(&exact_hash).await {
            Ok(Some(hit)) if hit.model_name == model_name && hit_is_valid(&hit, now_epoch_seconds()) => {
                self.front.insert(exact_hash, hit.response.clone()).await;
                return Some(hit.response);
            }
            Ok(_) => {}
            Err(e) => debug!("cache exact lookup failed, treating as miss: {e}"),
        }

        let Ok(vectors) = self.embedder.embed(&[format!("{system_prompt}\n---\n{prompt}")]).await else {
            return None;
        };
        let Some(query_vector) = vectors.into_iter().next() else {
            return None;
        };

        match self.store.search_similar(&query_vector, 5).await {
            Ok(candidates) => {
                let now = now_epoch_seconds();
                candidates
                    .into_iter()
                    .find(|c| c.model_name == model_name && c.similarity >= self.config.similarity_threshold && hit_is_valid(c, now))
                    .map(|c| c.response)
            }
            Err(e) => {
                debug!("cache similarity search failed, treating as miss: {e}");
                None
            }
        }
    }

    async fn store_response(&self, system_prompt: &str, prompt: &str, response: &str, temperature: f64, model_name: &str) {
        let exact_hash = CacheRecord::compute_exact_hash(system_prompt, prompt);
        self.front.insert(exact_hash, response.to_string()).await;
        persist_and_evict(&self.store, &self.embedder, &self.config, system_prompt, prompt, response, temperature, model_name).await;
    }
}

fn hit_is_valid(hit: &deepwiki_domain::ports::CacheLookup, now: f64) -> bool {
    now - hit.created_at < hit.ttl_seconds as f64
}

/// State threaded through `stream::unfold` for a cache-miss `generate_stream`
/// call: chunks pass through unchanged while accumulating, and the
/// concatenation is persisted once the inner stream ends.
struct MissStreamState {
    inner: GenerateStream,
    accumulated: String,
    front: Cache<String, String>,
    store: Arc<dyn CacheStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: LlmCacheConfig,
    system_prompt: String,
    prompt: String,
    temperature: f64,
    model_name: String,
    done: bool,
}

async fn advance_miss_stream(mut state: MissStreamState) -> Option<(Result<String, ProviderError>, MissStreamState)> {
    if state.done {
        return None;
    }
    match state.inner.next().await {
        Some(Ok(piece)) => {
            state.accumulated.push_str(&piece);
            Some((Ok(piece), state))
        }
        Some(Err(e)) => {
            state.done = true;
            Some((Err(e), state))
        }
        None => {
            state.done = true;
            if !state.accumulated.is_empty() {
                let exact_hash = CacheRecord::compute_exact_hash(&state.system_prompt, &state.prompt);
                state.front.insert(exact_hash, state.accumulated.clone()).await;
                persist_and_evict(
                    &state.store,
                    &state.embedder,
                    &state.config,
                    &state.system_prompt,
                    &state.prompt,
                    &state.accumulated,
                    state.temperature,
                    &state.model_name,
                )
                .await;
            }
            None
        }
    }
}

#[async_trait]
impl LlmProvider for LlmCache {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String, ProviderError> {
        // Non-deterministic generations above the cacheable threshold are
        // never looked up or stored — caching them would silently make a
        // high-temperature call deterministic, which callers don't expect.
        if temperature > self.config.max_cacheable_temperature {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            return self.inner.generate(prompt, system_prompt, max_tokens, temperature).await;
        }

        let system_prompt = system_prompt.unwrap_or("");
        if let Some(cached) = self.lookup(system_prompt, prompt, self.inner.name()).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let response = self
            .inner
            .generate(prompt, Some(system_prompt), max_tokens, temperature)
            .await?;
        self.store_response(system_prompt, prompt, &response, temperature, self.inner.name()).await;
        Ok(response)
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<GenerateStream, ProviderError> {
        if temperature > self.config.max_cacheable_temperature {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            return self.inner.generate_stream(prompt, system_prompt, max_tokens, temperature).await;
        }

        let system_prompt = system_prompt.unwrap_or("").to_string();
        if let Some(cached) = self.lookup(&system_prompt, prompt, self.inner.name()).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            let chunks = split_into_chunks(&cached, STREAM_HIT_CHUNK_COUNT);
            return Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok::<String, ProviderError>))));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let inner_stream = self
            .inner
            .generate_stream(prompt, Some(&system_prompt), max_tokens, temperature)
            .await?;

        let state = MissStreamState {
            inner: inner_stream,
            accumulated: String::new(),
            front: self.front.clone(),
            store: self.store.clone(),
            embedder: self.embedder.clone(),
            config: self.config.clone(),
            system_prompt,
            prompt: prompt.to_string(),
            temperature,
            model_name: self.inner.name().to_string(),
            done: false,
        };
        Ok(Box::pin(stream::unfold(state, advance_miss_stream)))
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
