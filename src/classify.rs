use crate::{filename::SNIFF_LEN, sniff};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

#[derive(thiserror::Error, Debug)]
pub enum ClassifyError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("classifier returned no usable type")]
    Empty,

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Detects the MIME type of a file that has already been written to disk.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, path: &Path) -> Result<String, ClassifyError>;
}

/// Runs an external utility such as `file --brief --mime-type <path>` and
/// takes its standard output as the type.
pub struct FileCommand {
    program: String,
}

impl FileCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FileCommand {
    fn default() -> Self {
        Self::new("file")
    }
}

#[async_trait]
impl Classifier for FileCommand {
    async fn classify(&self, path: &Path) -> Result<String, ClassifyError> {
        let output = Command::new(&self.program)
            .arg("--brief")
            .arg("--mime-type")
            .arg(path)
            .output()
            .await
            .map_err(|source| ClassifyError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ClassifyError::Failed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let mime = String::from_utf8(output.stdout).map_err(|_| ClassifyError::Empty)?;
        let mime = mime.trim();
        if mime.is_empty() {
            return Err(ClassifyError::Empty);
        }

        Ok(mime.to_string())
    }
}

#[derive(Default)]
pub struct MagicBytes;

#[async_trait]
impl Classifier for MagicBytes {
    async fn classify(&self, path: &Path) -> Result<String, ClassifyError> {
        let read_error = |source| ClassifyError::Read {
            path: path.to_path_buf(),
            source,
        };

        let file = tokio::fs::File::open(path).await.map_err(read_error)?;
        let mut head = Vec::with_capacity(SNIFF_LEN);
        file.take(SNIFF_LEN as u64)
            .read_to_end(&mut head)
            .await
            .map_err(read_error)?;

        Ok(sniff::content_type(&head).to_string())
    }
}
