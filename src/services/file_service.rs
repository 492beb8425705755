use anyhow::Result;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

/// Stores uploaded report files under a configured directory with
/// collision-resistant generated names.
#[derive(Clone)]
pub struct FileService {
    upload_path: String,
}

impl FileService {
    pub fn new(upload_path: String) -> Self {
        Self { upload_path }
    }

    /// Write uploaded bytes to disk under a generated unique filename.
    /// Returns the stored filename and full path.
    pub async fn save_report_file(&self, data: &[u8]) -> Result<(String, String)> {
        let filename = format!("blood_report_{}.pdf", Uuid::new_v4());
        let file_path = Path::new(&self.upload_path).join(&filename);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&file_path, data).await?;

        Ok((filename, file_path.to_string_lossy().to_string()))
    }

    pub async fn read_file(&self, file_path: &str) -> Result<Vec<u8>> {
        let data = fs::read(file_path).await?;
        Ok(data)
    }

    /// Best-effort removal of a stored file. Missing files are not an error.
    pub async fn delete_file(&self, file_path: &str) -> Result<()> {
        match fs::remove_file(file_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn file_exists(&self, file_path: &str) -> bool {
        Path::new(file_path).exists()
    }
}

/// Check that a filename carries a `.pdf` extension.
pub fn has_pdf_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Check the file magic bytes to confirm the payload really is a PDF,
/// independent of the declared extension or content type.
pub fn is_pdf_payload(data: &[u8]) -> bool {
    infer::get(data)
        .map(|kind| kind.mime_type() == "application/pdf")
        .unwrap_or(false)
}
