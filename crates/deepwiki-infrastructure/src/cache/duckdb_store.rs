use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use deepwiki_domain::entities::CacheRecord;
use deepwiki_domain::error::CacheError;
use deepwiki_domain::ports::{CacheLookup, CacheStore};
use duckdb::{params, Connection, Row};
use tokio::sync::Mutex;
use tracing::debug;

fn backend_err(context: &str, e: impl std::fmt::Display) -> CacheError {
    CacheError::Backend(format!("{context}: {e}"))
}

/// DuckDB + VSS backed durable half of the LLM cache (§4.6). The in-process
/// moka front cache and the exact-hash/similarity decision logic live in
/// `llm_cache.rs`; this type only persists and retrieves `CacheRecord`s.
pub struct DuckDbCacheStore {
    conn: Arc<Mutex<Connection>>,
    dimension: usize,
}

impl DuckDbCacheStore {
    pub fn open(path: &Path, dimension: usize) -> Result<Self, CacheError> {
        let conn = Connection::open(path).map_err(|e| backend_err("failed to open cache store", e))?;
        Self::initialize(&conn, dimension)?;
        Ok(DuckDbCacheStore {
            conn: Arc::new(Mutex::new(conn)),
            dimension,
        })
    }

    pub fn open_in_memory(dimension: usize) -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory().map_err(|e| backend_err("failed to open in-memory cache store", e))?;
        Self::initialize(&conn, dimension)?;
        Ok(DuckDbCacheStore {
            conn: Arc::new(Mutex::new(conn)),
            dimension,
        })
    }

    fn initialize(conn: &Connection, dimension: usize) -> Result<(), CacheError> {
        conn.execute_batch("INSTALL vss; LOAD vss; SET hnsw_enable_experimental_persistence = true;")
            .map_err(|e| backend_err("failed to load vss extension", e))?;

        let schema = format!(
            r#"
            CREATE TABLE IF NOT EXISTS llm_cache (
                id TEXT PRIMARY KEY,
                exact_hash TEXT NOT NULL,
                system_prompt TEXT NOT NULL,
                prompt TEXT NOT NULL,
                response TEXT NOT NULL,
                temperature DOUBLE NOT NULL,
                model_name TEXT NOT NULL,
                created_at DOUBLE NOT NULL,
                hit_count UBIGINT NOT NULL,
                last_hit_at DOUBLE,
                ttl_seconds UBIGINT NOT NULL,
                vector FLOAT[{dimension}] NOT NULL
            );
            "#
        );
        conn.execute_batch(&schema).map_err(|e| backend_err("failed to create llm_cache table", e))?;

        let statements = [
            "CREATE INDEX IF NOT EXISTS llm_cache_exact_hash_idx ON llm_cache(exact_hash);",
            "CREATE INDEX IF NOT EXISTS llm_cache_vector_hnsw_idx ON llm_cache USING HNSW (vector) WITH (metric = 'cosine');",
        ];
        for stmt in statements {
            if let Err(e) = conn.execute_batch(stmt) {
                debug!("cache index creation skipped ({stmt}): {e}");
            }
        }
        Ok(())
    }

    fn vector_literal(&self, vector: &[f32]) -> Result<String, CacheError> {
        if vector.len() != self.dimension {
            return Err(CacheError::Corruption(format!(
                "expected embedding dimension {}, got {}",
                self.dimension,
                vector.len()
            )));
        }
        let mut s = String::with_capacity(vector.len() * 8 + 16);
        s.push('[');
        for (i, v) in vector.iter().enumerate() {
            if i > 0 {
                s.push_str(", ");
            }
            s.push_str(&v.to_string());
        }
        s.push_str(&format!("]::FLOAT[{}]", self.dimension));
        Ok(s)
    }

    fn row_to_lookup(row: &Row, similarity: f64) -> duckdb::Result<CacheLookup> {
        Ok(CacheLookup {
            id: row.get(0)?,
            response: row.get(1)?,
            model_name: row.get(2)?,
            created_at: row.get(3)?,
            ttl_seconds: row.get::<_, i64>(4)? as u64,
            similarity,
        })
    }
}

#[async_trait]
impl CacheStore for DuckDbCacheStore {
    async fn lookup_exact(&self, exact_hash: &str) -> Result<Option<CacheLookup>, CacheError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, response, model_name, created_at, ttl_seconds FROM llm_cache \
                 WHERE exact_hash = ? ORDER BY created_at DESC LIMIT 1",
            )
            .map_err(|e| backend_err("failed to prepare exact lookup", e))?;
        let mut rows = stmt
            .query(params![exact_hash])
            .map_err(|e| backend_err("failed to run exact lookup", e))?;
        match rows.next().map_err(|e| backend_err("failed to read exact lookup row", e))? {
            Some(row) => Ok(Some(Self::row_to_lookup(row, 1.0).map_err(|e| backend_err("failed to parse cache row", e))?)),
            None => Ok(None),
        }
    }

    async fn search_similar(&self, vector: &[f32], limit: usize) -> Result<Vec<CacheLookup>, CacheError> {
        let literal = self.vector_literal(vector)?;
        let sql = format!(
            "SELECT id, response, model_name, created_at, ttl_seconds, \
             1.0 - array_cosine_distance(vector, {literal}) AS similarity \
             FROM llm_cache ORDER BY array_cosine_distance(vector, {literal}) LIMIT ?"
        );
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&sql).map_err(|e| backend_err("failed to prepare similarity search", e))?;
        let mut rows = stmt
            .query(params![limit as i64])
            .map_err(|e| backend_err("failed to run similarity search", e))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| backend_err("failed to read similarity row", e))? {
            let similarity: f64 = row.get(5).map_err(|e| backend_err("failed to read similarity", e))?;
            out.push(Self::row_to_lookup(row, similarity.clamp(0.0, 1.0)).map_err(|e| backend_err("failed to parse cache row", e))?);
        }
        Ok(out)
    }

    async fn insert(&self, record: CacheRecord) -> Result<(), CacheError> {
        let literal = self.vector_literal(&record.vector)?;
        let conn = self.conn.lock().await;
        let sql = format!(
            "INSERT OR REPLACE INTO llm_cache \
             (id, exact_hash, system_prompt, prompt, response, temperature, model_name, created_at, hit_count, last_hit_at, ttl_seconds, vector) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, {literal})"
        );
        conn.execute(
            &sql,
            params![
                record.id,
                record.exact_hash,
                record.system_prompt,
                record.prompt,
                record.response,
                record.temperature,
                record.model_name,
                record.created_at,
                record.hit_count as i64,
                record.last_hit_at,
                record.ttl_seconds as i64,
            ],
        )
        .map_err(|e| backend_err("failed to insert cache record", e))?;
        Ok(())
    }

    async fn evict_expired(&self, now_epoch_seconds: f64, limit: usize) -> Result<u64, CacheError> {
        let conn = self.conn.lock().await;
        let count = conn
            .execute(
                "DELETE FROM llm_cache WHERE id IN (\
                   SELECT id FROM llm_cache \
                   WHERE (? - created_at) >= ttl_seconds \
                   LIMIT ?\
                 )",
                params![now_epoch_seconds, limit as i64],
            )
            .map_err(|e| backend_err("failed to evict expired cache records", e))?;
        Ok(count as u64)
    }

    async fn row_count(&self) -> Result<u64, CacheError> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM llm_cache", [], |row| row.get(0))
            .map_err(|e| backend_err("failed to count cache rows", e))?;
        Ok(count as u64)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let conn = self.conn.lock().await;
        conn.execute_batch("DELETE FROM llm_cache;").map_err(|e| backend_err("failed to clear cache", e))?;
        Ok(())
    }
}
