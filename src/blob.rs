//! Content-addressed uploads for product media and payment receipts
use super::error::{Result, StorefrontError, ValidationError};
use super::store::Store;
use tracing::{debug, info, instrument};

const MAX_EXTENSION_LEN: usize = 8;

#[derive(Clone)]
pub struct BlobService {
    store: Store,
    public_base_url: String,
}

/// A stored upload. `name` is `<sha256>.<ext>` and never changes for the same bytes.
#[derive(serde::Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    pub name: String,
    pub url: String,
}

impl BlobService {
    pub fn new(store: Store, public_base_url: impl Into<String>) -> Self {
        Self {
            store,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    #[instrument(name = "blobs::put", skip(self, bytes), fields(len = bytes.len()))]
    pub fn put(&self, original_name: &str, bytes: &[u8]) -> Result<BlobRef> {
        if bytes.is_empty() {
            return Err(ValidationError::EmptyUpload.into());
        }

        let name = match extension_of(original_name) {
            Some(ext) => format!("{}.{ext}", sha256::digest(bytes)),
            None => sha256::digest(bytes),
        };

        // identical bytes under the same name are already stored; nothing to do
        match self
            .store
            .blobs
            .compare_and_swap(name.as_bytes(), None as Option<&[u8]>, Some(bytes))?
        {
            Ok(()) => info!(%name, "blob stored"),
            Err(_) => debug!(%name, "blob already present"),
        }

        Ok(BlobRef {
            url: format!("{}/uploads/{name}", self.public_base_url),
            name,
        })
    }

    pub fn get(&self, name: &str) -> Result<Vec<u8>> {
        self.store
            .blobs
            .get(name.as_bytes())?
            .map(|bytes| bytes.to_vec())
            .ok_or_else(|| StorefrontError::NotFound(format!("upload {name}")))
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    (!ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.chars().all(|c| c.is_ascii_alphanumeric()))
    .then_some(ext)
}

/// How a stored upload is handed back to a browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Served with this content type.
    Inline(&'static str),
    /// Served as `application/octet-stream` with `Content-Disposition: attachment`.
    Attachment,
}

/// Raster images and archives are served with their own type. Anything a
/// browser could execute (svg, html, pdf, unknown) is forced to download.
pub fn disposition_for(name: &str) -> Disposition {
    match extension_of(name).as_deref() {
        Some("png") => Disposition::Inline("image/png"),
        Some("jpg" | "jpeg") => Disposition::Inline("image/jpeg"),
        Some("gif") => Disposition::Inline("image/gif"),
        Some("webp") => Disposition::Inline("image/webp"),
        Some("zip") => Disposition::Inline("application/zip"),
        _ => Disposition::Attachment,
    }
}
