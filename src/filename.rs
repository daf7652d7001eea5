use crate::sniff;
use chrono::{Local, Utc};
use lazy_regex::regex_replace_all;
use std::io::{self, SeekFrom};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

pub const SNIFF_LEN: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingScheme {
    /// `upload_<HH-MM-SS>` plus an extension sniffed from the payload.
    Sniffed,
    /// `upload_<unix-epoch>` with no extension.
    Epoch,
}

/// Both `/` and `\` count as separators.
pub fn final_segment(candidate: &str) -> &str {
    let trimmed = candidate.trim_end_matches(['/', '\\']);
    match trimmed.rfind(['/', '\\']) {
        Some(index) => &trimmed[index + 1..],
        None => trimmed,
    }
}

/// Replaces every char outside `[A-Za-z0-9._-]` with `_`, one for one.
pub fn sanitize(name: &str) -> String {
    regex_replace_all!(r"[^A-Za-z0-9._-]", name, "_").into_owned()
}

fn usable(segment: &str) -> bool {
    !matches!(segment, "" | "." | ".." | "/")
}

/// Sniffing reads the first [`SNIFF_LEN`] bytes of `source` and rewinds it,
/// so the full payload can still be copied afterwards.
pub async fn resolve<R>(
    supplied: Option<&str>,
    source: &mut R,
    scheme: NamingScheme,
) -> io::Result<String>
where
    R: AsyncRead + AsyncSeek + Unpin + ?Sized,
{
    if let Some(segment) = supplied.map(final_segment).filter(|s| usable(s)) {
        return Ok(sanitize(segment));
    }

    let name = match scheme {
        NamingScheme::Sniffed => {
            let head = read_head(source).await?;
            let extension = sniff::extension_for(sniff::content_type(&head))
                .map(|ext| format!(".{ext}"))
                .unwrap_or_default();
            format!("upload_{}{}", Local::now().format("%H-%M-%S"), extension)
        }
        NamingScheme::Epoch => format!("upload_{}", Utc::now().timestamp()),
    };

    Ok(sanitize(&name))
}

async fn read_head<R>(source: &mut R) -> io::Result<Vec<u8>>
where
    R: AsyncRead + AsyncSeek + Unpin + ?Sized,
{
    let mut head = Vec::with_capacity(SNIFF_LEN);
    (&mut *source).take(SNIFF_LEN as u64).read_to_end(&mut head).await?;
    source.seek(SeekFrom::Start(0)).await?;
    Ok(head)
}
