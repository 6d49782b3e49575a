use super::Backend;
use crate::{Location, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::{fs, sync::Mutex};
use tracing::{debug, trace};

/// Keeps only the latest location in a pretty-printed json file
#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileBackend {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Option<Location>> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "No location file yet");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }
}

#[async_trait]
impl Backend for JsonFileBackend {
    async fn save(&self, location: &Location) -> Result<()> {
        let _guard = self.lock.lock().await;
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent).await?,
            _ => (),
        }
        // serde_json writes non-ascii text as-is, so korean addresses stay readable
        let serialized = serde_json::to_string_pretty(location)?;
        trace!(path = ?self.path, "Writing location file");
        fs::write(&self.path, serialized).await?;
        Ok(())
    }

    async fn latest(&self) -> Result<Option<Location>> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    async fn history(&self, limit: Option<u32>) -> Result<Vec<Location>> {
        if limit == Some(0) {
            return Ok(Vec::new());
        }
        Ok(self.latest().await?.into_iter().collect())
    }

    fn describe(&self) -> String {
        format!("json file '{}'", self.path.display())
    }
}
