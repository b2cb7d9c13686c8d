use std::fs;
use std::path::PathBuf;

use crate::core::error::Result;

/// One archive directory holding the lexicon index files
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
    pub base_dir: PathBuf,
}

impl ArchiveLayout {
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        Ok(ArchiveLayout { base_dir })
    }

    pub fn lexstr_path(&self) -> PathBuf {
        self.base_dir.join("lexstr")
    }

    pub fn lexmeta_path(&self) -> PathBuf {
        self.base_dir.join("lexmeta")
    }

    pub fn lexdata_path(&self) -> PathBuf {
        self.base_dir.join("lexdata")
    }

    pub fn lexhit_path(&self) -> PathBuf {
        self.base_dir.join("lexhit")
    }

    pub fn lexhash_path(&self) -> PathBuf {
        self.base_dir.join("lexhash")
    }

    pub fn lexhashdata_path(&self) -> PathBuf {
        self.base_dir.join("lexhashdata")
    }

    pub fn lexdist_path(&self) -> PathBuf {
        self.base_dir.join("lexdist")
    }

    pub fn lexdistmeta_path(&self) -> PathBuf {
        self.base_dir.join("lexdistmeta")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.base_dir.join("manifest")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.base_dir.join(".lock")
    }
}
