//! Route handlers organized by domain.

pub mod archive;
pub mod attachment;
pub mod health;
pub mod storage;

/// `Content-Disposition` value for a download named `file_name`.
///
/// Carries an ASCII `filename` plus the exact UTF-8 name in `filename*`.
pub fn content_disposition(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{ascii}\"; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("article-39dab4d8.zip"),
            "attachment; filename=\"article-39dab4d8.zip\"; filename*=UTF-8''article-39dab4d8.zip"
        );
        assert!(content_disposition("Über \"x\".stl").starts_with("attachment; filename=\"_ber _x_.stl\""));
    }
}
