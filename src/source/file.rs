//! File-backed sample source (health.sample.v1 exports)

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{SampleQuery, SampleSource};
use crate::error::HealthError;
use crate::schema::{RecordAdapter, RecordFormat};
use crate::types::Sample;

/// Source that re-reads an export file on every fetch
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    format: RecordFormat,
}

impl FileSource {
    /// Format is guessed from the file extension
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = RecordFormat::from_path(&path);
        Self { path, format }
    }

    pub fn with_format(mut self, format: RecordFormat) -> Self {
        self.format = format;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SampleSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch(&self, query: &SampleQuery) -> Result<Vec<Sample>, HealthError> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let records = RecordAdapter::parse(&contents, self.format)?;
        let samples = query.apply(RecordAdapter::to_samples(&records));

        debug!(
            path = %self.path.display(),
            records = records.len(),
            selected = samples.len(),
            "loaded samples from file"
        );

        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;
    use std::io::Write;

    #[tokio::test]
    async fn test_fetch_ndjson_file() {
        let mut file = tempfile::Builder::new().suffix(".ndjson").tempfile().unwrap();
        writeln!(
            file,
            r#"{{"category":"in_bed","start":"2023-05-01T22:30:00Z","end":"2023-05-02T06:30:00Z"}}"#
        )
        .unwrap();
        writeln!(
            file,
            r#"{{"category":"step_count","start":"2023-05-02T09:00:00Z","end":"2023-05-02T10:00:00Z","value":900}}"#
        )
        .unwrap();

        let source = FileSource::new(file.path());
        let samples = source.fetch(&SampleQuery::sleep()).await.unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].category, Category::InBed);
    }

    #[tokio::test]
    async fn test_fetch_json_array_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[{{"category":"awake","start":"2023-05-02T03:00:00Z","end":"2023-05-02T03:15:00Z"}}]"#
        )
        .unwrap();

        let source = FileSource::new(file.path());
        let samples = source.fetch(&SampleQuery::all()).await.unwrap();

        assert_eq!(samples.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let source = FileSource::new("/nonexistent/health-days/samples.ndjson");
        let result = source.fetch(&SampleQuery::all()).await;

        assert!(matches!(result, Err(HealthError::Io(_))));
    }
}
