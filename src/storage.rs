use crate::{classify::Classifier, error::AppError, filename::sanitize};
use std::path::{Path, PathBuf};
use tokio::{
    fs::{self, File},
    io::{self, AsyncRead, AsyncWriteExt},
};

const STAGING_SUFFIX: &str = "part";
const UNKNOWN_TYPE: &str = "unknown";

pub async fn resolve_root(configured: Option<&Path>) -> Result<PathBuf, AppError> {
    match configured {
        Some(dir) => {
            fs::create_dir_all(dir).await.map_err(|e| {
                AppError::Internal(format!(
                    "Failed to create upload directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
            Ok(dir.to_path_buf())
        }
        None => Ok(dirs::home_dir().unwrap_or_else(std::env::temp_dir)),
    }
}

/// Unnamed scratch file in `root` holding an upload until its name is known.
/// It never shows up in the directory listing and is gone once dropped.
pub async fn spool(root: &Path) -> Result<File, AppError> {
    let dir = root.to_path_buf();
    let file = tokio::task::spawn_blocking(move || tempfile::tempfile_in(dir))
        .await
        .map_err(|e| AppError::Internal(format!("Spool task failed: {}", e)))?
        .map_err(|source| AppError::StorageCreate {
            path: root.to_path_buf(),
            source,
        })?;

    Ok(File::from_std(file))
}

/// Partially written files are left in place on failure.
pub async fn write<R>(path: &Path, source: &mut R) -> Result<u64, AppError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut file = File::create(path)
        .await
        .map_err(|source| AppError::StorageCreate {
            path: path.to_path_buf(),
            source,
        })?;

    let write_error = |source| AppError::StorageWrite {
        path: path.to_path_buf(),
        source,
    };

    let written = io::copy(source, &mut file).await.map_err(write_error)?;
    file.flush().await.map_err(write_error)?;

    Ok(written)
}

/// Stores an upload under `root/name` and returns the effective final path.
///
/// With a classifier the bytes are first written to `name.part`, then renamed
/// to `name.<type>` once classified. Classification or rename failures are
/// logged and never fail the upload.
pub async fn store<R>(
    root: &Path,
    name: &str,
    source: &mut R,
    tagger: Option<&dyn Classifier>,
) -> Result<PathBuf, AppError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let Some(classifier) = tagger else {
        let destination = root.join(name);
        write(&destination, source).await?;
        return Ok(destination);
    };

    let staged = root.join(format!("{name}.{STAGING_SUFFIX}"));
    write(&staged, source).await?;

    let label = match classifier.classify(&staged).await {
        Ok(mime) => type_label(&mime),
        Err(e) => {
            tracing::warn!(path = %staged.display(), error = %e, "classification failed");
            UNKNOWN_TYPE.to_string()
        }
    };

    let tagged = root.join(format!("{name}.{label}"));
    match fs::rename(&staged, &tagged).await {
        Ok(()) => Ok(tagged),
        Err(e) => {
            tracing::warn!(
                from = %staged.display(),
                to = %tagged.display(),
                error = %e,
                "rename failed, keeping untagged file"
            );
            Ok(staged)
        }
    }
}

pub fn type_label(mime: &str) -> String {
    let label = sanitize(&mime.trim().replace('/', "-"));
    if label.is_empty() {
        UNKNOWN_TYPE.to_string()
    } else {
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ClassifyError;
    use async_trait::async_trait;
    use std::io::Cursor;
    use tokio::io::{AsyncReadExt, AsyncSeekExt};

    struct Fixed(Result<&'static str, ()>);

    #[async_trait]
    impl Classifier for Fixed {
        async fn classify(&self, _path: &Path) -> Result<String, ClassifyError> {
            self.0
                .map(str::to_string)
                .map_err(|_| ClassifyError::Empty)
        }
    }

    #[test]
    fn type_label_normalizes_mime_types() {
        assert_eq!(type_label("image/png\n"), "image-png");
        assert_eq!(type_label("text/plain; charset=us-ascii"), "text-plain__charset_us-ascii");
        assert_eq!(type_label("  "), UNKNOWN_TYPE);
    }

    #[tokio::test]
    async fn configured_root_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("uploads");

        let resolved = resolve_root(Some(&root)).await.unwrap();

        assert_eq!(resolved, root);
        assert!(root.is_dir());
    }

    #[tokio::test]
    async fn untagged_store_writes_the_plain_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = Cursor::new(b"hello".to_vec());

        let path = store(dir.path(), "notes.txt", &mut source, None).await.unwrap();

        assert_eq!(path, dir.path().join("notes.txt"));
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn store_truncates_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"a much longer old body").unwrap();
        let mut source = Cursor::new(b"new".to_vec());

        let path = store(dir.path(), "notes.txt", &mut source, None).await.unwrap();

        assert_eq!(std::fs::read(path).unwrap(), b"new");
    }

    #[tokio::test]
    async fn tagged_store_renames_with_the_detected_type() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = Cursor::new(b"hello".to_vec());
        let classifier = Fixed(Ok("text/plain"));

        let path = store(dir.path(), "notes.txt", &mut source, Some(&classifier))
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("notes.txt.text-plain"));
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        assert!(!dir.path().join("notes.txt.part").exists());
    }

    #[tokio::test]
    async fn classification_failure_tags_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = Cursor::new(b"hello".to_vec());
        let classifier = Fixed(Err(()));

        let path = store(dir.path(), "notes.txt", &mut source, Some(&classifier))
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("notes.txt.unknown"));
    }

    #[tokio::test]
    async fn rename_failure_keeps_the_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory with the tagged name makes the rename fail.
        std::fs::create_dir(dir.path().join("notes.txt.text-plain")).unwrap();
        std::fs::write(dir.path().join("notes.txt.text-plain").join("keep"), b"x").unwrap();
        let mut source = Cursor::new(b"hello".to_vec());
        let classifier = Fixed(Ok("text/plain"));

        let path = store(dir.path(), "notes.txt", &mut source, Some(&classifier))
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("notes.txt.part"));
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn spool_is_invisible_and_rewindable() {
        let dir = tempfile::tempdir().unwrap();

        let mut spooled = spool(dir.path()).await.unwrap();
        spooled.write_all(b"spooled bytes").await.unwrap();
        spooled.flush().await.unwrap();
        spooled.seek(std::io::SeekFrom::Start(0)).await.unwrap();
        let mut read_back = Vec::new();
        spooled.read_to_end(&mut read_back).await.unwrap();

        assert_eq!(read_back, b"spooled bytes");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn spool_in_a_missing_root_is_a_create_error() {
        let dir = tempfile::tempdir().unwrap();

        let error = spool(&dir.path().join("missing")).await.unwrap_err();

        assert!(matches!(error, AppError::StorageCreate { .. }));
    }

    #[tokio::test]
    async fn create_failure_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = Cursor::new(b"hello".to_vec());

        let error = store(&dir.path().join("missing"), "notes.txt", &mut source, None)
            .await
            .unwrap_err();

        assert!(matches!(error, AppError::StorageCreate { .. }));
    }
}
