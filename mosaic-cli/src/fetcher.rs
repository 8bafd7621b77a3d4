use async_trait::async_trait;
use mosaic_common::feature::SlicePayload;
use mosaic_runtime::collaborators::SliceFetcher;
use mosaic_runtime::error::FetchError;
use mosaic_runtime::query::SliceQuery;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Serves slice payloads from `<dir>/<slice_id>.json`
#[derive(Debug, Clone)]
pub struct FileFetcher {
    dir: PathBuf,
}

impl FileFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SliceFetcher for FileFetcher {
    async fn fetch(&self, query: &SliceQuery) -> Result<SlicePayload, FetchError> {
        let path = self.dir.join(format!("{}.json", query.slice_id()));
        tracing::debug!(path = %path.display(), "reading slice payload");

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => FetchError::Server {
                status: 404,
                message: format!("{} not found", path.display()),
            },
            _ => FetchError::Request(format!("{}: {e}", path.display())),
        })?;
        serde_json::from_str(&content).map_err(|e| FetchError::InvalidPayload(e.to_string()))
    }
}
