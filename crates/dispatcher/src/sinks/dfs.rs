//! DfsSink - batch files written through an `object_store` client
//!
//! Same naming and content as the local file sink; the destination is a URL
//! (`file:///data/flows`, `memory:///flows`, or a cloud scheme when the
//! corresponding `object_store` feature is compiled in).

use std::sync::Arc;

use bytes::Bytes;
use contracts::{Batch, BatchSink, ContractError};
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use tracing::{debug, info, instrument};
use url::Url;

/// Sink that puts each batch as one object under a base prefix
pub struct DfsSink {
    name: String,
    store: Arc<dyn ObjectStore>,
    prefix: ObjectPath,
}

impl DfsSink {
    /// Resolve `destination` into a store and a base prefix
    pub fn from_url(name: impl Into<String>, destination: &str) -> Result<Self, ContractError> {
        let name = name.into();
        let url = Url::parse(destination).map_err(|e| {
            ContractError::sink_connection(&name, format!("invalid url '{destination}': {e}"))
        })?;
        let (store, prefix) = object_store::parse_url(&url).map_err(|e| {
            ContractError::sink_connection(&name, format!("unsupported store '{destination}': {e}"))
        })?;

        info!(sink = %name, store = %store, prefix = %prefix, "DFS sink resolved");
        Ok(Self::with_store(name, Arc::from(store), prefix))
    }

    /// Use an already constructed store
    pub fn with_store(
        name: impl Into<String>,
        store: Arc<dyn ObjectStore>,
        prefix: ObjectPath,
    ) -> Self {
        Self {
            name: name.into(),
            store,
            prefix,
        }
    }

    /// Object location for a batch
    pub fn location_for(&self, batch: &Batch) -> ObjectPath {
        self.prefix.child(batch.file_name())
    }
}

impl BatchSink for DfsSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "dfs_sink_write",
        skip(self, batch),
        fields(sink = %self.name, sequence = batch.sequence)
    )]
    async fn write(&mut self, batch: &Batch) -> Result<usize, ContractError> {
        let location = self.location_for(batch);
        let content = Bytes::from(batch.to_json_array());
        let len = content.len();

        self.store
            .put(&location, PutPayload::from(content))
            .await
            .map_err(|e| ContractError::sink_write(&self.name, format!("{location}: {e}")))?;

        debug!(location = %location, flows = batch.len(), "Batch object written");
        Ok(len)
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, "DfsSink closed");
        Ok(())
    }
}
