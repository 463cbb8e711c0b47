//! Pluggable persistence backends for the session store.
//!
//! Each backend holds the full session collection, keyed by session
//! name: an in-memory map (process lifetime), one JSON file on disk, or
//! a remote document collection over REST (one document per session,
//! overwritten wholesale on every save -- last write wins, which is fine
//! for a single interactive user).

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use banter_common::StoreError;

use crate::Turn;

/// Durable shape of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub name: String,
    pub messages: Vec<Turn>,
}

#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Overwrite the backing store with the full session collection.
    async fn save(&self, records: &[SessionRecord]) -> Result<(), StoreError>;

    /// Read every persisted session, newest first.
    async fn load(&self) -> Result<Vec<SessionRecord>, StoreError>;
}

/// In-memory backend. Clones share the same storage.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    records: Arc<tokio::sync::Mutex<Vec<SessionRecord>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn save(&self, records: &[SessionRecord]) -> Result<(), StoreError> {
        *self.records.lock().await = records.to_vec();
        Ok(())
    }

    async fn load(&self) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self.records.lock().await.clone())
    }
}

/// File backend: the whole collection as one JSON document, written via
/// temp file + rename so a crash never leaves a torn file behind.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Platform default: `<data dir>/banter/sessions.json`.
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            StoreError::Io(std::io::Error::other("could not determine data directory"))
        })?;
        Ok(data_dir.join("banter").join("sessions.json"))
    }
}

#[async_trait]
impl StoreBackend for FileBackend {
    async fn save(&self, records: &[SessionRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(records)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    async fn load(&self) -> Result<Vec<SessionRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let bytes = std::fs::read(&self.path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Remote document-collection backend.
///
/// `PUT {base}/{collection}/{name}` overwrites one session document;
/// `GET {base}/{collection}` lists them all. No partial updates and no
/// conflict detection across writers.
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: reqwest::Url,
    collection: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        collection: impl Into<String>,
        token: Option<String>,
    ) -> Result<Self, StoreError> {
        let base_url = reqwest::Url::parse(base_url)
            .map_err(|e| StoreError::Remote(format!("invalid base URL: {e}")))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            collection: collection.into(),
            token,
        })
    }

    fn url_with(&self, segments: &[&str]) -> Result<reqwest::Url, StoreError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| StoreError::Remote("base URL cannot hold paths".into()))?;
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl StoreBackend for HttpBackend {
    async fn save(&self, records: &[SessionRecord]) -> Result<(), StoreError> {
        for record in records {
            let url = self.url_with(&[&self.collection, &record.name])?;
            let response = self
                .authorize(self.http.put(url).json(record))
                .send()
                .await
                .map_err(|e| StoreError::Remote(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let body = body.chars().take(200).collect::<String>();
                return Err(StoreError::Remote(format!(
                    "PUT {}: HTTP {status}: {body}",
                    record.name
                )));
            }
        }
        Ok(())
    }

    async fn load(&self) -> Result<Vec<SessionRecord>, StoreError> {
        let url = self.url_with(&[&self.collection])?;
        let response = self
            .authorize(self.http.get(url))
            .send()
            .await
            .map_err(|e| StoreError::Remote(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = body.chars().take(200).collect::<String>();
            return Err(StoreError::Remote(format!("GET: HTTP {status}: {body}")));
        }

        let mut records: Vec<SessionRecord> = response
            .json()
            .await
            .map_err(|e| StoreError::Remote(e.to_string()))?;

        sort_newest_first(&mut records);
        Ok(records)
    }
}

/// Restore display order for an unordered listing. Creation order is
/// encoded in the generated "Chat N" names; no rename operation exists.
fn sort_newest_first(records: &mut [SessionRecord]) {
    records.sort_by(|a, b| chat_number(&b.name).cmp(&chat_number(&a.name)));
}

fn chat_number(name: &str) -> Option<u32> {
    name.strip_prefix("Chat ")?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Turn;

    fn records() -> Vec<SessionRecord> {
        vec![
            SessionRecord {
                name: "Chat 2".into(),
                messages: vec![Turn::user("hi"), Turn::assistant("hello")],
            },
            SessionRecord {
                name: "Chat 1".into(),
                messages: Vec::new(),
            },
        ]
    }

    #[tokio::test]
    async fn memory_round_trips() {
        let backend = MemoryBackend::new();
        backend.save(&records()).await.unwrap();
        assert_eq!(backend.load().await.unwrap(), records());
    }

    #[tokio::test]
    async fn memory_clones_share_state() {
        let backend = MemoryBackend::new();
        let twin = backend.clone();
        backend.save(&records()).await.unwrap();
        assert_eq!(twin.load().await.unwrap(), records());
    }

    #[tokio::test]
    async fn file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("nested").join("sessions.json"));

        backend.save(&records()).await.unwrap();
        assert_eq!(backend.load().await.unwrap(), records());

        // A second save fully replaces the first.
        let smaller = vec![records().remove(1)];
        backend.save(&smaller).await.unwrap();
        assert_eq!(backend.load().await.unwrap(), smaller);
    }

    #[tokio::test]
    async fn file_load_of_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("sessions.json"));
        assert!(backend.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_load_of_garbage_is_a_serialize_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        std::fs::write(&path, b"not json").unwrap();
        let err = FileBackend::new(path).load().await.unwrap_err();
        assert!(matches!(err, StoreError::Serialize(_)));
    }

    #[test]
    fn unordered_listings_sort_newest_first() {
        let mut listing = vec![
            SessionRecord {
                name: "Chat 2".into(),
                messages: Vec::new(),
            },
            SessionRecord {
                name: "Chat 10".into(),
                messages: Vec::new(),
            },
            SessionRecord {
                name: "Chat 1".into(),
                messages: Vec::new(),
            },
        ];
        sort_newest_first(&mut listing);
        let names: Vec<_> = listing.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Chat 10", "Chat 2", "Chat 1"]);
    }

    #[test]
    fn http_backend_rejects_bad_base_url() {
        assert!(HttpBackend::new("not a url", "sessions", None).is_err());
    }
}
