use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::agents::InvocationRequest;
use crate::error::{AgencyError, Result};

/// On-disk list of invocations, JSON or TOML (`[[invocations]]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchFile {
    #[serde(default)]
    pub invocations: Vec<InvocationRequest>,
}

impl BatchFile {
    /// Parses by file extension; anything other than `.toml` is read as JSON.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("toml"));

        let batch: BatchFile = if is_toml {
            toml::from_str(content)
                .map_err(|e| AgencyError::ParseError(format!("Invalid batch file {}: {}", path.display(), e)))?
        } else {
            serde_json::from_str(content)
                .map_err(|e| AgencyError::ParseError(format!("Invalid batch file {}: {}", path.display(), e)))?
        };
        Ok(batch)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AgencyError::IoError(format!("Failed to read batch file {}: {}", path.display(), e)))?;
        let batch = Self::parse(path, &content)?;
        debug!("Loaded {} invocations from {}", batch.invocations.len(), path.display());
        Ok(batch)
    }
}
