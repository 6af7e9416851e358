//! The local file being published, checked before anything touches the
//! network.

use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const PDF_MIME: &str = "application/pdf";

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Path is not a file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error("Only PDF files are accepted (use a .pdf): {}", .0.display())]
    NotPdf(PathBuf),
    #[error("Failed to read {}: {}", .path.display(), .source)]
    Unreadable { path: PathBuf, source: io::Error },
}

/// A regular `.pdf` file that existed when it was validated.
#[derive(Clone, Debug)]
pub struct UploadTarget {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub mime: &'static str,
}

impl UploadTarget {
    pub fn validate(path: &Path) -> Result<Self, ValidationError> {
        let meta = std::fs::metadata(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ValidationError::NotFound(path.to_owned()),
            _ => ValidationError::Unreadable {
                path: path.to_owned(),
                source: e,
            },
        })?;

        if !meta.is_file() {
            return Err(ValidationError::NotAFile(path.to_owned()));
        }

        if !is_pdf(path) {
            return Err(ValidationError::NotPdf(path.to_owned()));
        }

        let name = path
            .file_name()
            .map(|x| x.to_string_lossy().into_owned())
            .ok_or_else(|| ValidationError::NotAFile(path.to_owned()))?;

        Ok(Self {
            path: path.to_owned(),
            name,
            size: meta.len(),
            mime: PDF_MIME,
        })
    }

    pub fn filename(&self) -> &str {
        &self.name
    }

    pub async fn read(&self) -> Result<Vec<u8>, ValidationError> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|source| ValidationError::Unreadable {
                path: self.path.clone(),
                source,
            })
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|x| x.to_str())
        .map(|x| x.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Expand a leading `~` against the home directory, if we know it.
///
/// ```
/// let home = Path::new("/home/ann");
/// assert_eq!(expand_home("~/cv.pdf", Some(home)), PathBuf::from("/home/ann/cv.pdf"));
/// ```
pub fn expand_home(raw: &str, home: Option<&Path>) -> PathBuf {
    match (raw.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home.to_owned(),
        (Some(rest), Some(home)) if rest.starts_with('/') => home.join(&rest[1..]),
        _ => PathBuf::from(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_accepts_pdf_any_case() {
        let dir = tempfile::tempdir().unwrap();

        for name in ["a.pdf", "b.PDF", "c.Pdf"] {
            let path = dir.path().join(name);
            fs::write(&path, b"%PDF-1.4").unwrap();

            let target = UploadTarget::validate(&path).unwrap();

            assert_eq!(target.filename(), name);
            assert_eq!(target.size, 8);
            assert_eq!(target.mime, "application/pdf");
        }
    }

    #[test]
    fn test_rejects_other_extensions() {
        let dir = tempfile::tempdir().unwrap();

        for name in ["a.txt", "pdf", "a.pdf.bak", "a.pd"] {
            let path = dir.path().join(name);
            fs::write(&path, b"x").unwrap();

            assert!(matches!(
                UploadTarget::validate(&path),
                Err(ValidationError::NotPdf(_))
            ));
        }
    }

    #[test]
    fn test_rejects_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.pdf");

        assert!(matches!(
            UploadTarget::validate(&path),
            Err(ValidationError::NotFound(_))
        ));
    }

    #[test]
    fn test_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folder.pdf");
        fs::create_dir(&path).unwrap();

        assert!(matches!(
            UploadTarget::validate(&path),
            Err(ValidationError::NotAFile(_))
        ));
    }

    #[tokio::test]
    async fn test_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        fs::write(&path, b"%PDF").unwrap();

        let bytes = UploadTarget::validate(&path).unwrap().read().await.unwrap();

        assert_eq!(bytes, b"%PDF");
    }

    #[test]
    fn test_expand_home() {
        let home = Path::new("/home/ann");

        assert_eq!(expand_home("~/cv.pdf", Some(home)), PathBuf::from("/home/ann/cv.pdf"));
        assert_eq!(expand_home("~", Some(home)), PathBuf::from("/home/ann"));
        assert_eq!(expand_home("~bob/cv.pdf", Some(home)), PathBuf::from("~bob/cv.pdf"));
        assert_eq!(expand_home("~/cv.pdf", None), PathBuf::from("~/cv.pdf"));
        assert_eq!(expand_home("cv.pdf", Some(home)), PathBuf::from("cv.pdf"));
    }
}
