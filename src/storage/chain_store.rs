// Chain persistence as a JSON document

use crate::core::Block;
use crate::error::Result;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Stores the chain as a pretty-printed JSON array of blocks.
///
/// Only the chain is written. Mempool and UTXO set are derived state and are
/// rebuilt after loading.
#[derive(Debug, Clone)]
pub struct ChainStore {
    path: PathBuf,
}

impl ChainStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Load the saved chain. `Ok(None)` when nothing has been saved yet.
    pub fn load(&self) -> Result<Option<Vec<Block>>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("No saved chain at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let chain: Vec<Block> = serde_json::from_str(&content)?;
        log::info!("Loaded {} blocks from {}", chain.len(), self.path.display());
        Ok(Some(chain))
    }

    /// Write the chain, replacing any previous file
    pub fn save(&self, chain: &[Block]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(&self.path, to_json(chain)?)?;
        log::info!("Saved {} blocks to {}", chain.len(), self.path.display());
        Ok(())
    }
}

/// Pretty JSON rendering of a chain
pub fn to_json(chain: &[Block]) -> Result<String> {
    Ok(serde_json::to_string_pretty(chain)?)
}
