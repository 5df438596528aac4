//! Input acquisition: URL fetch, file read, type sniffing.

use std::path::Path;
use std::time::Duration;

use log::info;

use tarjoman_core::error::{Result, TarjomanError};

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Source families the pipeline can route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Html,
    Pdf,
    Docx,
    Txt,
    Bin,
}

/// Routes a path by extension.
#[must_use]
pub fn sniff_type(path: &Path) -> SourceKind {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("html" | "htm" | "xhtml") => SourceKind::Html,
        Some("pdf") => SourceKind::Pdf,
        Some("docx") => SourceKind::Docx,
        Some("txt" | "md" | "text") => SourceKind::Txt,
        _ => SourceKind::Bin,
    }
}

/// Fetches a page over HTTP(S) with a desktop UA, following redirects.
///
/// A malformed or non-HTTP URL is an `InvalidRequest`; network and
/// status failures are `ExtractionFailed`.
pub fn fetch_url(url: &str, timeout: Duration) -> Result<String> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(TarjomanError::InvalidRequest(format!(
            "not an http(s) URL: {url}"
        )));
    }
    info!("fetching {url}");
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| TarjomanError::ExtractionFailed(format!("http client: {e}")))?;
    let response = client
        .get(url)
        .send()
        .map_err(|e| TarjomanError::ExtractionFailed(format!("fetch failed: {e}")))?;
    if !response.status().is_success() {
        return Err(TarjomanError::ExtractionFailed(format!(
            "fetch failed: HTTP {}",
            response.status()
        )));
    }
    response
        .text()
        .map_err(|e| TarjomanError::ExtractionFailed(format!("unreadable body: {e}")))
}

/// Reads a local file, mapping a missing path to `InvalidRequest`.
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(TarjomanError::InvalidRequest(format!(
            "no such file: {}",
            path.display()
        )));
    }
    Ok(std::fs::read(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_by_extension() {
        assert_eq!(sniff_type(Path::new("a/report.DOCX")), SourceKind::Docx);
        assert_eq!(sniff_type(Path::new("x.pdf")), SourceKind::Pdf);
        assert_eq!(sniff_type(Path::new("page.htm")), SourceKind::Html);
        assert_eq!(sniff_type(Path::new("notes.md")), SourceKind::Txt);
        assert_eq!(sniff_type(Path::new("blob.exe")), SourceKind::Bin);
        assert_eq!(sniff_type(Path::new("noext")), SourceKind::Bin);
    }

    #[test]
    fn test_non_http_url_is_invalid_request() {
        let err = fetch_url("ftp://example.com/x", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, TarjomanError::InvalidRequest(_)));
    }

    #[test]
    fn test_missing_file_is_invalid_request() {
        let err = read_file(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, TarjomanError::InvalidRequest(_)));
    }
}
