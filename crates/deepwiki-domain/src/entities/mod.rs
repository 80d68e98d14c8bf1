mod cache_record;
mod code_chunk;
mod file_info;
mod index_status;
mod research;
mod search_result;

pub use cache_record::CacheRecord;
pub use code_chunk::{ChunkMetadata, CodeChunk, ANONYMOUS};
pub use file_info::FileInfo;
pub use index_status::{FileStatusEntry, IndexStatus, CURRENT_SCHEMA_VERSION};
pub use research::{DeepResearchResult, ResearchProgress, ResearchStep, SourceReference, SubQuestion};
pub use search_result::SearchResult;
