//! FileSink - one JSON array file per batch in a local directory

use std::path::{Path, PathBuf};

use contracts::{Batch, BatchSink, ContractError};
use tracing::{debug, instrument};

/// Sink that writes each batch to `<dir>/<sequence>flow.json`
pub struct FileSink {
    name: String,
    dir: PathBuf,
}

impl FileSink {
    /// Create a new FileSink, creating `dir` if needed
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        Ok(Self {
            name: name.into(),
            dir,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Output path for a batch
    pub fn path_for(&self, batch: &Batch) -> PathBuf {
        self.dir.join(batch.file_name())
    }
}

impl BatchSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, batch),
        fields(sink = %self.name, sequence = batch.sequence)
    )]
    async fn write(&mut self, batch: &Batch) -> Result<usize, ContractError> {
        let path = self.path_for(batch);
        let content = batch.to_json_array();

        tokio::fs::write(&path, content.as_bytes())
            .await
            .map_err(|e| {
                ContractError::sink_write(&self.name, format!("{}: {e}", path.display()))
            })?;

        debug!(path = %path.display(), flows = batch.len(), "Batch file written");
        Ok(content.len())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, "FileSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{EncodedFlow, Header, NetFlowV5, Record};
    use tempfile::tempdir;

    fn encoded(records: usize) -> EncodedFlow {
        let flow = NetFlowV5 {
            header: Header {
                version: 5,
                count: records as u16,
                ..Default::default()
            },
            records: vec![Record::default(); records],
        };
        EncodedFlow::encode(&flow).unwrap()
    }

    #[tokio::test]
    async fn test_file_sink_write() {
        let dir = tempdir().unwrap();
        let mut sink = FileSink::new("local_fs", dir.path()).unwrap();

        let batch = Batch::new(7, vec![encoded(2), encoded(1)]);
        let bytes = sink.write(&batch).await.unwrap();

        let path = dir.path().join("7flow.json");
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(bytes, content.len());

        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        let items = parsed.as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["Records"].as_array().unwrap().len(), 2);
        assert_eq!(items[2], serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_single_flow_batch_is_valid_json() {
        let dir = tempdir().unwrap();
        let mut sink = FileSink::new("local_fs", dir.path()).unwrap();

        sink.write(&Batch::new(1, vec![encoded(0)])).await.unwrap();

        let content = std::fs::read_to_string(dir.path().join("1flow.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed[0]["Records"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");

        let mut sink = FileSink::new("local_fs", &nested).unwrap();
        sink.write(&Batch::new(3, vec![encoded(1)])).await.unwrap();

        assert!(nested.join("3flow.json").exists());
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let dir = tempdir().unwrap();
        let mut sink = FileSink::new("local_fs", dir.path()).unwrap();
        std::fs::remove_dir_all(dir.path()).unwrap();

        let err = sink.write(&Batch::new(1, vec![encoded(1)])).await.unwrap_err();
        assert!(matches!(err, ContractError::SinkWrite { .. }));
    }
}
