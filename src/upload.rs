use crate::{
    app::AppState,
    config::UploadMode,
    error::AppError,
    filename, storage,
};
use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::Method,
    Form,
};
use bytes::Bytes;
use serde::Deserialize;
use std::io::{Cursor, SeekFrom};
use tokio::io::{AsyncRead, AsyncSeek, AsyncSeekExt, AsyncWriteExt};

const FIELD: &str = "file";
const INVALID_FILE: &str = "Invalid file. Use form field 'file'";

pub trait PayloadSource: AsyncRead + AsyncSeek + Unpin + Send {}

impl<T: AsyncRead + AsyncSeek + Unpin + Send> PayloadSource for T {}

/// A payload pulled out of the request body, plus the client's filename if any.
pub struct ExtractedPayload {
    pub source: Box<dyn PayloadSource>,
    pub filename: Option<String>,
}

#[derive(Deserialize)]
struct UrlEncodedUpload {
    file: Option<String>,
}

pub async fn upload_file(
    State(state): State<AppState>,
    request: Request,
) -> Result<String, AppError> {
    if request.method() != Method::POST {
        return Err(AppError::MethodNotAllowed);
    }

    let ExtractedPayload {
        mut source,
        filename,
    } = match state.mode {
        UploadMode::Multipart => from_multipart(request, &state).await?,
        UploadMode::UrlEncoded => from_urlencoded(request, &state).await?,
    };

    let name = filename::resolve(filename.as_deref(), &mut source, state.naming)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to inspect upload: {}", e)))?;

    let stored = storage::store(
        &state.upload_root,
        &name,
        &mut source,
        state.tagger.as_deref(),
    )
    .await?;

    let saved_as = stored
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or(name);

    tracing::info!(path = %stored.display(), "Successfully saved");
    Ok(format!("Saved to: {}\n", saved_as))
}

// The `file` part is streamed into a spool file so memory use stays flat
// however large the upload is.
async fn from_multipart(request: Request, state: &AppState) -> Result<ExtractedPayload, AppError> {
    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| AppError::malformed(INVALID_FILE, e))?;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::malformed(INVALID_FILE, e))?
    {
        if field.name() != Some(FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let mut spooled = storage::spool(&state.upload_root).await?;
        let spool_error = |source| AppError::StorageWrite {
            path: state.upload_root.to_path_buf(),
            source,
        };

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::malformed(INVALID_FILE, e))?
        {
            spooled.write_all(&chunk).await.map_err(spool_error)?;
        }
        spooled.flush().await.map_err(spool_error)?;
        spooled
            .seek(SeekFrom::Start(0))
            .await
            .map_err(spool_error)?;

        return Ok(ExtractedPayload {
            source: Box::new(spooled),
            filename,
        });
    }

    Err(AppError::MissingField { field: "file" })
}

async fn from_urlencoded(request: Request, state: &AppState) -> Result<ExtractedPayload, AppError> {
    let Form(form) = Form::<UrlEncodedUpload>::from_request(request, state)
        .await
        .map_err(|e| AppError::malformed("Failed to parse form", e))?;

    match form.file {
        Some(content) if !content.is_empty() => Ok(ExtractedPayload {
            source: Box::new(Cursor::new(Bytes::from(content))),
            filename: None,
        }),
        _ => Err(AppError::MissingField { field: "content" }),
    }
}
