use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use uuid::Uuid;

use crate::error::{Error, ErrorKind};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// Image submitted as a `data:image/<ext>;base64,<payload>` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub extension: String,
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn parse(field: &str, data: &str) -> Result<Self, Error> {
        let invalid = || Error::field(field, "Upload a valid image.");

        let (header, payload) = data
            .strip_prefix("data:image/")
            .and_then(|rest| rest.split_once(";base64,"))
            .ok_or_else(invalid)?;

        let extension = header.to_ascii_lowercase();
        if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            return Err(invalid());
        }

        let bytes = STANDARD.decode(payload.trim()).map_err(|_| invalid())?;
        if bytes.is_empty() {
            return Err(Error::field(field, "The submitted file is empty."));
        }

        Ok(Self { extension, bytes })
    }
}

/// Local directory holding uploaded images, served under `url`.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    url: String,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, url: &str) -> Self {
        let mut url = url.to_owned();
        if !url.ends_with('/') {
            url.push('/');
        }

        Self {
            root: root.into(),
            url,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the image under `dir` and returns its reference relative to the root.
    pub async fn save(&self, dir: &str, image: &EncodedImage) -> Result<String, Error> {
        let reference = format!("{dir}/{}.{}", Uuid::new_v4(), image.extension);
        let path = self.root.join(&reference);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                log::error!("Failed to create {}: {e}", parent.display());
                ErrorKind::InternalServerError.default()
            })?;
        }

        tokio::fs::write(&path, &image.bytes).await.map_err(|e| {
            log::error!("Failed to write {}: {e}", path.display());
            ErrorKind::InternalServerError.default()
        })?;

        log::trace!("> Stored image {reference}");
        Ok(reference)
    }

    /// Removes a stored image. Failures are logged and otherwise ignored.
    pub async fn remove(&self, reference: &str) {
        if reference.is_empty() {
            return;
        }

        if let Err(e) = tokio::fs::remove_file(self.root.join(reference)).await {
            log::warn!("Failed to remove image {reference}: {e}");
        }
    }

    pub fn url(&self, reference: &str) -> String {
        format!("{}{reference}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn parses_data_urls() {
        let image = EncodedImage::parse("image", PIXEL).unwrap();

        assert_eq!(image.extension, "png");
        assert_eq!(&image.bytes[1..4], b"PNG");
    }

    #[test]
    fn rejects_other_payloads() {
        for data in [
            "",
            "http://example.com/cat.png",
            "data:image/png;base64,@@@",
            "data:image/svg+xml;base64,PHN2Zz4=",
            "data:text/plain;base64,aGVsbG8=",
        ] {
            let error = EncodedImage::parse("image", data).unwrap_err();
            assert_eq!(error.field.as_deref(), Some("image"));
        }
    }

    #[tokio::test]
    async fn saves_and_removes_images() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path(), "/media");
        let image = EncodedImage::parse("image", PIXEL).unwrap();

        let reference = store.save("recipes/images", &image).await.unwrap();
        assert!(reference.starts_with("recipes/images/"));
        assert!(reference.ends_with(".png"));
        assert_eq!(store.url(&reference), format!("/media/{reference}"));
        assert!(dir.path().join(&reference).exists());

        store.remove(&reference).await;
        assert!(!dir.path().join(&reference).exists());
    }
}
