pub const TEXT_PLAIN: &str = "text/plain";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Classifies `head` by magic bytes. Text without binary control bytes is
/// `text/plain`; anything unrecognised is `application/octet-stream`.
pub fn content_type(head: &[u8]) -> &'static str {
    if let Some(kind) = infer::get(head) {
        return kind.mime_type();
    }

    if looks_like_text(head) {
        TEXT_PLAIN
    } else {
        OCTET_STREAM
    }
}

fn looks_like_text(head: &[u8]) -> bool {
    !head.iter().any(|&b| {
        matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
    })
}

/// Picks a file extension (without the dot) for a content type.
///
/// `txt` is preferred whenever it is a candidate, otherwise the first
/// registered extension wins.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    let candidates = mime_guess::get_mime_extensions_str(essence)?;

    candidates
        .iter()
        .copied()
        .find(|ext| *ext == "txt")
        .or_else(|| candidates.first().copied())
}
