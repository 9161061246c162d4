use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use super::EventBus;
use crate::error::{PipelineError, Result};

/// A file-backed bus: one `<topic>.ndjson` file per topic under `base_dir`.
/// The file is created empty on first touch and never truncated by the core.
pub struct FileBus {
    base_dir: PathBuf,
}

impl FileBus {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|source| PipelineError::BusFailure {
            topic: base_dir.display().to_string(),
            source,
        })?;
        Ok(Self { base_dir })
    }

    fn topic_path(&self, topic: &str) -> PathBuf {
        self.base_dir.join(format!("{topic}.ndjson"))
    }

    fn ensure_topic(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::write(path, "").map_err(|source| PipelineError::BusFailure {
                topic: path.display().to_string(),
                source,
            })?;
        }
        Ok(())
    }
}

impl EventBus for FileBus {
    fn publish_raw(&self, topic: &str, canonical_line: &str) -> Result<()> {
        let path = self.topic_path(topic);
        self.ensure_topic(&path)?;
        let mut file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|source| PipelineError::BusFailure { topic: topic.to_string(), source })?;
        writeln!(file, "{canonical_line}")
            .map_err(|source| PipelineError::BusFailure { topic: topic.to_string(), source })?;
        Ok(())
    }

    fn read_raw(&self, topic: &str) -> Result<Vec<String>> {
        let path = self.topic_path(topic);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&path)
            .map_err(|source| PipelineError::BusFailure { topic: topic.to_string(), source })?;
        let reader = BufReader::new(file);
        let mut lines = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|source| PipelineError::BusFailure { topic: topic.to_string(), source })?;
            if !line.trim().is_empty() {
                lines.push(line);
            }
        }
        Ok(lines)
    }
}
