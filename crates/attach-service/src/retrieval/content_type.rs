//! Content types served for single-file downloads.

/// Content type for a file name, derived from its extension.
pub fn content_type_for(name: &str) -> &'static str {
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("obj") => "text/plain",
        _ => "application/octet-stream",
    }
}
