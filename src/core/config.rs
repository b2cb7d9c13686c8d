use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;

/// Tokenization and accumulation limits shared by the build pipeline and
/// the query path. Persisted in the archive manifest so both sides apply
/// the exact same rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexiconConfig {
    pub min_word_len: usize,            // Pre-trim token length bounds
    pub max_word_len: usize,
    pub max_hits_per_posting: usize,    // Hit stream cap per (term, post)
}

impl Default for LexiconConfig {
    fn default() -> Self {
        LexiconConfig {
            min_word_len: 3,
            max_word_len: 32,
            max_hits_per_posting: 255,  // Spill streams carry a u8 count
        }
    }
}

/// Build-time facts a reader needs: how many messages the archive holds and
/// the tokenizer configuration the index was built with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub message_count: u32,
    pub config: LexiconConfig,
}

impl Manifest {
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}
