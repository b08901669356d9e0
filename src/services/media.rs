//! Image payload storage on local disk.
//!
//! Pin records only carry a `/uploads/...` reference; the bytes live under
//! `base_path/{shard}/{shard}/{name}`, sharded by the first two bytes of the
//! MD5 of the stored name to keep per-directory file counts down. Writes go
//! through a temporary file, are fsynced, and are renamed into place so a
//! crashed upload never leaves a half-written image behind a live reference.

use bytes::Bytes;
use futures::{pin_mut, Stream, StreamExt};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("unsupported upload content type `{0}`")]
    UnsupportedType(String),
    #[error("invalid upload path")]
    InvalidPath,
    #[error("upload `{0}` not found")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type MediaResult<T> = Result<T, MediaError>;

/// A stored image, as reported back to the uploader.
#[derive(Debug, Clone)]
pub struct StoredImage {
    /// Public reference, e.g. `/uploads/3f/a1/4c0d....jpg`.
    pub url: String,
    /// Stored file name.
    pub filename: String,
    pub size_bytes: i64,
}

#[derive(Clone)]
pub struct MediaStore {
    base_path: PathBuf,
}

impl MediaStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Generate two-level shard identifiers for a stored name.
    ///
    /// Uses MD5(name) and returns the first two bytes as lowercase
    /// hexadecimal strings (00-ff).
    fn shards(name: &str) -> (String, String) {
        let digest = md5::compute(name);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    fn disk_path(&self, shard_a: &str, shard_b: &str, name: &str) -> PathBuf {
        let mut path = self.base_path.clone();
        path.push(shard_a);
        path.push(shard_b);
        path.push(name);
        path
    }

    /// Stream-save an uploaded image.
    ///
    /// The stored name is a fresh UUID plus the extension taken from the
    /// original file name, falling back to the content-type subtype. Only
    /// `image/*` uploads are accepted.
    pub async fn save_stream<S>(
        &self,
        original_name: Option<&str>,
        content_type: Option<&str>,
        stream: S,
    ) -> MediaResult<StoredImage>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let ext = image_extension(original_name, content_type)?;
        let filename = format!("{}.{}", Uuid::new_v4(), ext);
        let (shard_a, shard_b) = Self::shards(&filename);

        let file_path = self.disk_path(&shard_a, &shard_b, &filename);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            MediaError::Io(io::Error::new(
                ErrorKind::Other,
                "upload path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size_bytes: i64 = 0;
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(MediaError::Io(err));
                }
            };
            size_bytes += chunk.len() as i64;
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(MediaError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(MediaError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(MediaError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(MediaError::Io(err));
        }

        Ok(StoredImage {
            url: format!("/uploads/{shard_a}/{shard_b}/{filename}"),
            filename,
            size_bytes,
        })
    }

    /// Open a stored image for reading.
    ///
    /// `rel` is the path below `/uploads/`, e.g. `3f/a1/4c0d....jpg`.
    /// Returns the open file, a guessed content type, and the byte length.
    pub async fn open(&self, rel: &str) -> MediaResult<(File, String, i64)> {
        ensure_path_safe(rel)?;
        let path = self.base_path.join(rel);

        let file = File::open(&path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                MediaError::NotFound(rel.to_string())
            } else {
                MediaError::Io(err)
            }
        })?;
        let len = file.metadata().await?.len() as i64;
        let content_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .to_string();
        Ok((file, content_type, len))
    }
}

/// Reject trivial traversal vectors in a client-supplied upload path.
fn ensure_path_safe(rel: &str) -> MediaResult<()> {
    if rel.is_empty() || rel.len() > 512 {
        return Err(MediaError::InvalidPath);
    }
    if rel.starts_with('/') || rel.contains("..") {
        return Err(MediaError::InvalidPath);
    }
    if rel
        .bytes()
        .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
    {
        return Err(MediaError::InvalidPath);
    }
    Ok(())
}

/// Pick the stored extension: the original file name's extension when it is
/// a plausible one, otherwise the `image/*` subtype. Anything that is not an
/// image is rejected.
fn image_extension(
    original_name: Option<&str>,
    content_type: Option<&str>,
) -> MediaResult<String> {
    if let Some(ct) = content_type {
        if !ct.starts_with("image/") {
            return Err(MediaError::UnsupportedType(ct.to_string()));
        }
    }

    let from_name = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        });
    if let Some(ext) = from_name {
        return Ok(ext);
    }

    let from_type = content_type
        .and_then(|ct| ct.strip_prefix("image/"))
        .map(|sub| sub.split(|c| c == '+' || c == ';').next().unwrap_or(sub))
        .map(str::to_ascii_lowercase)
        .filter(|sub| {
            !sub.is_empty() && sub.len() <= 8 && sub.chars().all(|c| c.is_ascii_alphanumeric())
        });
    match from_type {
        Some(ext) => Ok(ext),
        None => Err(MediaError::UnsupportedType(
            content_type.unwrap_or("unknown").to_string(),
        )),
    }
}
