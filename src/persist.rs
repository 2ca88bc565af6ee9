//! Persistence collaborator.
//!
//! The engine itself never touches storage; an autosave component drives a
//! [`PersistenceProvider`]. [`FsPersistence`] keeps a document folder on
//! disk: `document.json` plus an `assets/` directory with one file per
//! registered asset.

#[cfg(test)]
#[path = "persist_test.rs"]
mod persist_test;

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::document::{Document, DocumentError};
use crate::store::{Asset, AssetId};

const DOCUMENT_FILE: &str = "document.json";
const ASSET_DIR: &str = "assets";

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("asset not stored: {0}")]
    AssetNotFound(AssetId),
    #[error("persistence provider has been disposed")]
    Disposed,
}

impl PersistError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "E_IO",
            Self::Document(e) => e.error_code(),
            Self::AssetNotFound(_) => "E_ASSET_NOT_FOUND",
            Self::Disposed => "E_DISPOSED",
        }
    }
}

/// Callback invoked with the freshly loaded document after an external edit.
pub type ExternalChangeListener = Box<dyn FnMut(&Document)>;

/// Storage for documents and their binary assets.
pub trait PersistenceProvider {
    /// Load the stored document, `None` if nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Storage failures and invalid documents.
    fn load(&mut self) -> Result<Option<Document>, PersistError>;

    /// Replace the stored document.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn save(&mut self, doc: &Document) -> Result<(), PersistError>;

    /// Store the bytes of a registered asset.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn save_asset(&mut self, asset: &Asset, bytes: &[u8]) -> Result<(), PersistError>;

    /// Read back the bytes of a stored asset.
    ///
    /// # Errors
    ///
    /// `AssetNotFound` when nothing is stored under `asset`.
    fn load_asset(&self, asset: &Asset) -> Result<Vec<u8>, PersistError>;

    /// Host-usable URLs for the given assets. Assets without stored bytes are left out.
    ///
    /// # Errors
    ///
    /// Storage failures.
    fn load_asset_urls(&self, assets: &[Asset]) -> Result<HashMap<AssetId, String>, PersistError>;

    /// Register a callback for edits made to the stored document by someone else.
    fn on_external_change(&mut self, listener: ExternalChangeListener);

    /// Release resources. Every later call fails with `Disposed` or does nothing.
    fn dispose(&mut self);
}

/// A document folder on the local filesystem.
pub struct FsPersistence {
    dir: PathBuf,
    /// Modification time of `document.json` after our last read or write.
    last_seen: Option<SystemTime>,
    listeners: Vec<ExternalChangeListener>,
    disposed: bool,
}

impl FsPersistence {
    /// Use `dir` as the document folder. It is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), last_seen: None, listeners: Vec::new(), disposed: false }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn document_path(&self) -> PathBuf {
        self.dir.join(DOCUMENT_FILE)
    }

    fn asset_path(&self, asset: &Asset) -> PathBuf {
        let name = match Path::new(&asset.filename).extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}.{ext}", asset.id),
            None => asset.id.to_string(),
        };
        self.dir.join(ASSET_DIR).join(name)
    }

    fn ensure_live(&self) -> Result<(), PersistError> {
        if self.disposed { Err(PersistError::Disposed) } else { Ok(()) }
    }

    fn modified(&self) -> Result<Option<SystemTime>, PersistError> {
        match fs::metadata(self.document_path()) {
            Ok(meta) => Ok(Some(meta.modified()?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Check whether `document.json` changed since our last read or write.
    /// On change the document is reloaded and every listener is called with it.
    /// Returns whether listeners fired. Does nothing after `dispose`.
    ///
    /// # Errors
    ///
    /// Storage failures and invalid documents.
    pub fn poll_external_change(&mut self) -> Result<bool, PersistError> {
        if self.disposed {
            return Ok(false);
        }
        let Some(current) = self.modified()? else {
            return Ok(false);
        };
        if self.last_seen.is_none_or(|seen| seen == current) {
            self.last_seen = Some(current);
            return Ok(false);
        }
        let json = fs::read_to_string(self.document_path())?;
        let doc = Document::from_json(&json)?;
        self.last_seen = Some(current);
        tracing::info!(path = %self.document_path().display(), "external document change");
        for listener in &mut self.listeners {
            listener(&doc);
        }
        Ok(true)
    }
}

impl PersistenceProvider for FsPersistence {
    fn load(&mut self) -> Result<Option<Document>, PersistError> {
        self.ensure_live()?;
        let path = self.document_path();
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let doc = Document::from_json(&json)?;
        self.last_seen = self.modified()?;
        tracing::info!(path = %path.display(), "document loaded");
        Ok(Some(doc))
    }

    fn save(&mut self, doc: &Document) -> Result<(), PersistError> {
        self.ensure_live()?;
        fs::create_dir_all(&self.dir)?;
        let json = doc.to_json()?;
        let path = self.document_path();
        let tmp = self.dir.join(format!("{DOCUMENT_FILE}.tmp"));
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        self.last_seen = self.modified()?;
        tracing::info!(path = %path.display(), bytes = json.len(), "document saved");
        Ok(())
    }

    fn save_asset(&mut self, asset: &Asset, bytes: &[u8]) -> Result<(), PersistError> {
        self.ensure_live()?;
        let path = self.asset_path(asset);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        tracing::debug!(asset = %asset.id, bytes = bytes.len(), "asset saved");
        Ok(())
    }

    fn load_asset(&self, asset: &Asset) -> Result<Vec<u8>, PersistError> {
        self.ensure_live()?;
        match fs::read(self.asset_path(asset)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(PersistError::AssetNotFound(asset.id)),
            Err(e) => Err(e.into()),
        }
    }

    fn load_asset_urls(&self, assets: &[Asset]) -> Result<HashMap<AssetId, String>, PersistError> {
        self.ensure_live()?;
        let mut urls = HashMap::new();
        for asset in assets {
            let path = self.asset_path(asset);
            if !path.exists() {
                continue;
            }
            let abs = fs::canonicalize(&path)?;
            urls.insert(asset.id, format!("file://{}", abs.display()));
        }
        Ok(urls)
    }

    fn on_external_change(&mut self, listener: ExternalChangeListener) {
        if !self.disposed {
            self.listeners.push(listener);
        }
    }

    fn dispose(&mut self) {
        self.listeners.clear();
        self.disposed = true;
        tracing::debug!(dir = %self.dir.display(), "persistence disposed");
    }
}
