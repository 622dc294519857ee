use crate::domain::LocationFix;
use crate::sink::{FixSink, SinkError};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Appends every accepted fix to a file as one JSON object per line.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonlSink { path: path.into() }
    }
}

#[async_trait]
impl FixSink for JsonlSink {
    async fn store(&self, fix: LocationFix) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(&fix)?;
        line.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path).await?;
        file.write_all(line.as_bytes()).await?;

        debug!("💾 Stored fix {} {} accuracy {}m", fix.latitude, fix.longitude, fix.accuracy_meters);
        Ok(())
    }
}
