//! Avatar files on disk.
//!
//! Avatars live flat in one directory and are addressed by file name only;
//! accounts store them as `/images/<file name>`.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

pub const AVATAR_URL_PREFIX: &str = "/images/";

#[derive(Debug, Clone)]
pub struct MediaStore {
    avatars_dir: PathBuf,
}

impl MediaStore {
    pub fn new(avatars_dir: impl Into<PathBuf>) -> Self {
        Self { avatars_dir: avatars_dir.into() }
    }

    pub fn avatars_dir(&self) -> &Path {
        &self.avatars_dir
    }

    /// Writes a new avatar for the account and returns its URL.
    pub async fn save_avatar(&self, account_id: u64, data: &[u8]) -> io::Result<String> {
        tokio::fs::create_dir_all(&self.avatars_dir).await?;

        let file_name = format!("{account_id}_{}.jpg", Uuid::new_v4());
        tokio::fs::write(self.avatars_dir.join(&file_name), data).await?;

        debug!(account_id, %file_name, size = data.len(), "avatar saved");
        Ok(format!("{AVATAR_URL_PREFIX}{file_name}"))
    }

    /// Removes the avatar behind `url`. A file that is already gone is not an
    /// error.
    pub async fn delete_avatar(&self, url: &str) -> io::Result<()> {
        let Some(path) = self.resolve(url.strip_prefix(AVATAR_URL_PREFIX).unwrap_or(url)) else {
            warn!(%url, "refusing to delete avatar outside the avatars directory");
            return Ok(());
        };

        match tokio::fs::remove_file(&path).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    /// The avatar named `file_name`, `None` when the name is not a plain file
    /// name or nothing is stored under it.
    pub async fn read_avatar(&self, file_name: &str) -> io::Result<Option<Bytes>> {
        let Some(path) = self.resolve(file_name) else {
            return Ok(None);
        };

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn resolve(&self, file_name: &str) -> Option<PathBuf> {
        let plain = !file_name.is_empty()
            && !file_name.starts_with('.')
            && !file_name.contains(['/', '\\'])
            && Path::new(file_name).file_name().is_some_and(|name| name == file_name);

        plain.then(|| self.avatars_dir.join(file_name))
    }
}
