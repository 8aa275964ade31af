// 📤 Document Publisher - where rendered documents land on disk
//
// <output_root>/<client>/<client>_<business>_<YYYYmmdd_HHMMSS>.txt

use crate::error::GenerationError;
use crate::renderer::TemplateDocument;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tracing::info;

pub const OUTPUT_EXTENSION: &str = "txt";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone)]
pub struct DocumentPublisher {
    output_root: PathBuf,
}

/// Names become path components; separators would escape the client folder
fn path_component(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect()
}

impl DocumentPublisher {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        DocumentPublisher {
            output_root: output_root.into(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn client_dir(&self, client_name: &str) -> PathBuf {
        self.output_root.join(path_component(client_name))
    }

    pub fn destination(
        &self,
        client_name: &str,
        business_type: &str,
        generated_at: NaiveDateTime,
    ) -> PathBuf {
        let client = path_component(client_name);
        let file_name = format!(
            "{}_{}_{}.{}",
            client,
            path_component(business_type),
            generated_at.format(TIMESTAMP_FORMAT),
            OUTPUT_EXTENSION
        );
        self.output_root.join(client).join(file_name)
    }

    /// Write the document, creating the client directory if needed. No retry.
    pub fn publish(
        &self,
        client_name: &str,
        business_type: &str,
        document: &TemplateDocument,
        generated_at: NaiveDateTime,
    ) -> Result<PathBuf, GenerationError> {
        let dir = self.client_dir(client_name);
        std::fs::create_dir_all(&dir).map_err(|source| GenerationError::PersistFailure {
            path: dir.clone(),
            source,
        })?;

        let path = self.destination(client_name, business_type, generated_at);
        std::fs::write(&path, document.to_text()).map_err(|source| {
            GenerationError::PersistFailure {
                path: path.clone(),
                source,
            }
        })?;

        info!(path = %path.display(), "document written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    #[test]
    fn test_destination_layout() {
        let publisher = DocumentPublisher::new("/data/clients");
        let path = publisher.destination("A Tech Co", "Address Change", at());

        assert_eq!(
            path,
            PathBuf::from("/data/clients/A Tech Co/A Tech Co_Address Change_20240309_140507.txt")
        );
    }

    #[test]
    fn test_separators_replaced() {
        let publisher = DocumentPublisher::new("/out");
        let path = publisher.destination("A/B Co", "Merge\\Split", at());

        assert_eq!(path.parent().unwrap(), Path::new("/out/A_B Co"));
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "A_B Co_Merge_Split_20240309_140507.txt"
        );
    }

    #[test]
    fn test_publish_creates_client_dir() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = DocumentPublisher::new(dir.path().join("clients"));
        let doc = TemplateDocument::from_blocks(["Company: A Tech Co"]);

        let path = publisher.publish("A Tech Co", "Address Change", &doc, at()).unwrap();

        assert!(path.starts_with(dir.path().join("clients").join("A Tech Co")));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Company: A Tech Co\n");
    }

    #[test]
    fn test_publish_failure_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        // a regular file where the output root should be a directory
        let blocker = dir.path().join("clients");
        std::fs::write(&blocker, "not a dir").unwrap();

        let publisher = DocumentPublisher::new(&blocker);
        let err = publisher
            .publish("A Tech Co", "Address Change", &TemplateDocument::default(), at())
            .unwrap_err();

        match err {
            GenerationError::PersistFailure { path, .. } => {
                assert_eq!(path, blocker.join("A Tech Co"));
            }
            other => panic!("expected PersistFailure, got {:?}", other),
        }
    }
}
