use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of chunk kinds the chunker emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Module,
    Import,
    Class,
    Method,
    Function,
}

impl ChunkType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChunkType::Module => "module",
            ChunkType::Import => "import",
            ChunkType::Class => "class",
            ChunkType::Method => "method",
            ChunkType::Function => "function",
        }
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
