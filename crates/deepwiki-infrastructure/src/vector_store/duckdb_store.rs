use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use deepwiki_domain::entities::{CodeChunk, SearchResult};
use deepwiki_domain::error::IndexError;
use deepwiki_domain::ports::{EmbeddingProvider, VectorStore, VectorStoreStats};
use deepwiki_domain::value_objects::{ChunkType, Language};
use duckdb::{params, Connection, Row};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::sanitize::sanitize_scalar;

use super::embed_text::embed_text;

fn storage_err(context: &str, e: impl std::fmt::Display) -> IndexError {
    IndexError::VectorStoreIo(format!("{context}: {e}"))
}

/// DuckDB + VSS backed implementation of the `VectorStore` port. One table
/// per repository (`chunks`), an HNSW index over the embedding column for
/// ANN search, and scalar indexes on `id`/`file_path`/`language`/
/// `chunk_type` created idempotently on every open.
pub struct DuckDbVectorStore {
    conn: Arc<Mutex<Connection>>,
    embedder: Arc<dyn EmbeddingProvider>,
    dimension: usize,
}

impl DuckDbVectorStore {
    pub fn open(path: &Path, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self, IndexError> {
        let conn = Connection::open(path).map_err(|e| storage_err("failed to open vector store", e))?;
        let dimension = embedder.dimension();
        Self::initialize(&conn, dimension)?;
        Ok(DuckDbVectorStore {
            conn: Arc::new(Mutex::new(conn)),
            embedder,
            dimension,
        })
    }

    pub fn open_in_memory(embedder: Arc<dyn EmbeddingProvider>) -> Result<Self, IndexError> {
        let conn = Connection::open_in_memory().map_err(|e| storage_err("failed to open in-memory vector store", e))?;
        let dimension = embedder.dimension();
        Self::initialize(&conn, dimension)?;
        Ok(DuckDbVectorStore {
            conn: Arc::new(Mutex::new(conn)),
            embedder,
            dimension,
        })
    }

    fn initialize(conn: &Connection, dimension: usize) -> Result<(), IndexError> {
        conn.execute_batch("INSTALL vss; LOAD vss; SET hnsw_enable_experimental_persistence = true;")
            .map_err(|e| storage_err("failed to load vss extension", e))?;

        let schema = format!(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                file_path TEXT NOT NULL,
                language TEXT NOT NULL,
                chunk_type TEXT NOT NULL,
                name TEXT NOT NULL,
                parent_name TEXT,
                content TEXT NOT NULL,
                start_line INTEGER NOT NULL,
                end_line INTEGER NOT NULL,
                docstring TEXT,
                metadata_json TEXT NOT NULL,
                vector FLOAT[{dimension}] NOT NULL
            );
            "#
        );
        conn.execute_batch(&schema).map_err(|e| storage_err("failed to create chunks table", e))?;
        Self::ensure_indexes(conn)
    }

    /// Created on first table creation and re-attempted (idempotently) on
    /// every open, per §4.3.
    fn ensure_indexes(conn: &Connection) -> Result<(), IndexError> {
        let statements = [
            "CREATE INDEX IF NOT EXISTS chunks_file_path_idx ON chunks(file_path);",
            "CREATE INDEX IF NOT EXISTS chunks_language_idx ON chunks(language);",
            "CREATE INDEX IF NOT EXISTS chunks_chunk_type_idx ON chunks(chunk_type);",
            "CREATE INDEX IF NOT EXISTS chunks_vector_hnsw_idx ON chunks USING HNSW (vector) WITH (metric = 'cosine');",
        ];
        for stmt in statements {
            if let Err(e) = conn.execute_batch(stmt) {
                // The HNSW index statement fails harmlessly if it already
                // exists under a name DuckDB considers a duplicate object;
                // log and continue rather than fail the whole open.
                warn!("index creation skipped ({stmt}): {e}");
            }
        }
        Ok(())
    }

    fn vector_literal(&self, vector: &[f32]) -> Result<String, IndexError> {
        if vector.len() != self.dimension {
            return Err(IndexError::VectorStoreIo(format!(
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

    fn row_to_chunk(row: &Row) -> duckdb::Result<CodeChunk> {
        let language_str: String = row.get(2)?;
        let chunk_type_str: String = row.get(3)?;
        let metadata_json: String = row.get(10)?;
        Ok(CodeChunk {
            id: row.get(0)?,
            file_path: row.get(1)?,
            language: parse_language(&language_str),
            chunk_type: parse_chunk_type(&chunk_type_str),
            name: row.get(4)?,
            parent_name: row.get(5)?,
            content: row.get(6)?,
            start_line: row.get::<_, i64>(7)? as usize,
            end_line: row.get::<_, i64>(8)? as usize,
            docstring: row.get(9)?,
            metadata: serde_json::from_str(&metadata_json).unwrap_or_default(),
        })
    }

    async fn write_chunks(&self, chunks: &[CodeChunk]) -> Result<usize, IndexError> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = chunks.iter().map(embed_text).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(IndexError::VectorStoreIo(
                "embedding provider returned a mismatched vector count".to_string(),
            ));
        }

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().map_err(|e| storage_err("failed to begin transaction", e))?;
        for (chunk, vector) in chunks.iter().zip(vectors.iter()) {
            let literal = self.vector_literal(vector)?;
            let metadata_json = serde_json::to_string(&chunk.metadata).unwrap_or_default();
            let sql = format!(
                "INSERT OR REPLACE INTO chunks \
                 (id, file_path, language, chunk_type, name, parent_name, content, start_line, end_line, docstring, metadata_json, vector) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, {literal})"
            );
            tx.execute(
                &sql,
                params![
                    chunk.id,
                    chunk.file_path,
                    chunk.language.as_str(),
                    chunk.chunk_type.as_str(),
                    chunk.name,
                    chunk.parent_name,
                    chunk.content,
                    chunk.start_line as i64,
                    chunk.end_line as i64,
                    chunk.docstring,
                    metadata_json,
                ],
            )
            .map_err(|e| storage_err(&format!("failed to insert chunk {}", chunk.id), e))?;
        }
        tx.commit().map_err(|e| storage_err("failed to commit", e))?;
        debug!("wrote {} chunks to vector store", chunks.len());
        Ok(chunks.len())
    }
}

fn parse_language(s: &str) -> Language {
    Language::ALL.into_iter().find(|l| l.as_str() == s).unwrap_or(Language::Rust)
}

fn parse_chunk_type(s: &str) -> ChunkType {
    match s {
        "module" => ChunkType::Module,
        "import" => ChunkType::Import,
        "class" => ChunkType::Class,
        "method" => ChunkType::Method,
        _ => ChunkType::Function,
    }
}

#[async_trait]
impl VectorStore for DuckDbVectorStore {
    async fn create_or_update_table(&self, chunks: Vec<CodeChunk>) -> Result<usize, IndexError> {
        {
            let conn = self.conn.lock().await;
            conn.execute_batch("DELETE FROM chunks;").map_err(|e| storage_err("failed to clear table", e))?;
        }
        let count = self.write_chunks(&chunks).await?;
        let conn = self.conn.lock().await;
        Self::ensure_indexes(&conn)?;
        Ok(count)
    }

    async fn add_chunks(&self, chunks: Vec<CodeChunk>) -> Result<usize, IndexError> {
        self.write_chunks(&chunks).await
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        language: Option<Language>,
        chunk_type: Option<ChunkType>,
    ) -> Result<Vec<SearchResult>, IndexError> {
        let vectors = self.embedder.embed(&[query.to_string()]).await?;
        let query_vector = vectors.into_iter().next().ok_or_else(|| IndexError::VectorStoreIo("embedding provider returned no vector".to_string()))?;
        let literal = self.vector_literal(&query_vector)?;

        let mut sql = format!(
            "SELECT id, file_path, language, chunk_type, name, parent_name, content, start_line, end_line, docstring, metadata_json, \
             1.0 - array_cosine_distance(vector, {literal}) AS score \
             FROM chunks"
        );
        let mut where_clauses = Vec::new();
        if let Some(language) = language {
            where_clauses.push(format!("language = '{}'", language.as_str()));
        }
        if let Some(chunk_type) = chunk_type {
            where_clauses.push(format!("chunk_type = '{}'", chunk_type.as_str()));
        }
        if !where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_clauses.join(" AND "));
        }
        sql.push_str(&format!(" ORDER BY array_cosine_distance(vector, {literal}) LIMIT ?"));

        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&sql).map_err(|e| storage_err("failed to prepare search", e))?;
        let mut rows = stmt.query(params![limit as i64]).map_err(|e| storage_err("failed to run search", e))?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().map_err(|e| storage_err("failed to read search row", e))? {
            let distance_complement: f64 = row.get(11).map_err(|e| storage_err("failed to read score", e))?;
            let chunk = Self::row_to_chunk(row).map_err(|e| storage_err("failed to parse chunk row", e))?;
            results.push(SearchResult {
                chunk,
                score: distance_complement.clamp(0.0, 1.0),
            });
        }
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(results)
    }

    async fn get_chunk_by_id(&self, id: &str) -> Result<Option<CodeChunk>, IndexError> {
        let Some(id) = sanitize_scalar(id) else {
            return Ok(None);
        };
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, file_path, language, chunk_type, name, parent_name, content, start_line, end_line, docstring, metadata_json \
                 FROM chunks WHERE id = ?",
            )
            .map_err(|e| storage_err("failed to prepare lookup", e))?;
        let mut rows = stmt.query(params![id]).map_err(|e| storage_err("failed to run lookup", e))?;
        match rows.next().map_err(|e| storage_err("failed to read lookup row", e))? {
            Some(row) => Ok(Some(Self::row_to_chunk(row).map_err(|e| storage_err("failed to parse chunk row", e))?)),
            None => Ok(None),
        }
    }

    async fn get_chunks_by_file(&self, rel_path: &str) -> Result<Vec<CodeChunk>, IndexError> {
        let Some(rel_path) = sanitize_scalar(rel_path) else {
            return Ok(Vec::new());
        };
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, file_path, language, chunk_type, name, parent_name, content, start_line, end_line, docstring, metadata_json \
                 FROM chunks WHERE file_path = ?",
            )
            .map_err(|e| storage_err("failed to prepare file lookup", e))?;
        let mut rows = stmt.query(params![rel_path]).map_err(|e| storage_err("failed to run file lookup", e))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| storage_err("failed to read file lookup row", e))? {
            out.push(Self::row_to_chunk(row).map_err(|e| storage_err("failed to parse chunk row", e))?);
        }
        Ok(out)
    }

    async fn delete_chunks_by_file(&self, rel_path: &str) -> Result<usize, IndexError> {
        let Some(rel_path) = sanitize_scalar(rel_path) else {
            return Ok(0);
        };
        let conn = self.conn.lock().await;
        let deleted = conn
            .execute("DELETE FROM chunks WHERE file_path = ?", params![rel_path])
            .map_err(|e| storage_err("failed to delete chunks by file", e))?;
        Ok(deleted)
    }

    async fn stats(&self) -> Result<VectorStoreStats, IndexError> {
        let conn = self.conn.lock().await;
        let row_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
            .map_err(|e| storage_err("failed to count rows", e))?;
        let unique_files: i64 = conn
            .query_row("SELECT COUNT(DISTINCT file_path) FROM chunks", [], |row| row.get(0))
            .map_err(|e| storage_err("failed to count unique files", e))?;
        Ok(VectorStoreStats {
            row_count: row_count as u64,
            unique_files: unique_files as u64,
        })
    }
}
