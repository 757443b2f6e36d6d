use std::io::Write as _;
use std::path::PathBuf;

use color_eyre::eyre::{eyre, WrapErr};
use tracing::{debug, info};

use super::{CredentialRecord, TokenStore};

/// Credential document kept as a JSON array in a single file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl JsonFileStore {
    async fn read(&self) -> color_eyre::Result<Option<Vec<CredentialRecord>>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .wrap_err_with(|| format!("Failed to read {}", self.path.display()));
            }
        };

        let records = serde_json::from_str(&contents)
            .wrap_err_with(|| format!("Token file {} is not valid", self.path.display()))?;
        Ok(Some(records))
    }

    /// Write `json` to the target through a temporary file in the same directory
    ///
    /// With `replace` unset an existing document is never overwritten, and
    /// `Ok(false)` reports that one was already there.
    async fn write(&self, json: Vec<u8>, replace: bool) -> color_eyre::Result<bool> {
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || -> color_eyre::Result<bool> {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };

            let mut temp_file = tempfile::NamedTempFile::new_in(&dir)
                .wrap_err_with(|| format!("Failed to create temporary file in {}", dir.display()))?;
            temp_file
                .write_all(&json)
                .wrap_err("Failed to write credentials")?;
            temp_file
                .as_file()
                .sync_all()
                .wrap_err("Failed to flush credentials")?;

            if replace {
                temp_file
                    .persist(&path)
                    .map_err(|e| eyre!("Failed to replace {}: {}", path.display(), e))?;
                return Ok(true);
            }

            match temp_file.persist_noclobber(&path) {
                Ok(_) => Ok(true),
                Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
                Err(e) => Err(eyre!("Failed to create {}: {}", path.display(), e)),
            }
        })
        .await?
    }
}

#[async_trait::async_trait]
impl TokenStore for JsonFileStore {
    async fn load(&self) -> color_eyre::Result<Vec<CredentialRecord>> {
        if let Some(records) = self.read().await? {
            return Ok(records);
        }

        info!(
            "Token file {} not found, creating an empty one",
            self.path.display()
        );
        if self.write(b"[]".to_vec(), false).await? {
            return Ok(Vec::new());
        }

        // A concurrent save created the document first
        debug!("Token file {} appeared while creating it", self.path.display());
        Ok(self.read().await?.unwrap_or_default())
    }

    async fn save(&self, records: &[CredentialRecord]) -> color_eyre::Result<()> {
        let json = serde_json::to_vec_pretty(records).wrap_err("Failed to serialize credentials")?;

        // Readers only ever see the old or the new document
        self.write(json, true).await?;

        debug!("Saved {} credential records", records.len());
        Ok(())
    }
}
