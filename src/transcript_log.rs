//! The on-disk record of each run.
//!
//! A log is the request transcript in the same delimited form the parser
//! reads, followed by an assistant separator and the streamed response, so a
//! log file can be edited and piped straight back into `gpt`.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use time::format_description::FormatItem;
use time::macros::format_description;

use crate::error::{Error, Result};
use crate::transcript::{CONTINUE_SEPARATOR, render};
use crate::types::ChatMessage;

/// Suffix of every log file name.
pub const LOG_SUFFIX: &str = ".gpt.txt";

const STAMP: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]-[minute]-[second]");

/// `2006-01-02T15-04-05.gpt.txt` for the given instant.
pub fn log_file_name(at: OffsetDateTime) -> Result<String> {
    let stamp = at.format(STAMP).map_err(|e| {
        Error::encoding(format!("failed to format log timestamp: {e}"), Some(Box::new(e)))
    })?;
    Ok(format!("{stamp}{LOG_SUFFIX}"))
}

/// An append-only transcript log.
#[derive(Debug)]
pub struct TranscriptLog<W: Write> {
    writer: W,
    path: Option<PathBuf>,
}

impl TranscriptLog<File> {
    /// Create a fresh log file in `dir`, named after the current local time
    /// (UTC if the local offset cannot be determined).
    pub fn create(dir: &Path) -> Result<Self> {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let path = dir.join(log_file_name(now)?);
        let file = File::create(&path)
            .map_err(|e| Error::io(format!("failed to create {}: {e}", path.display()), e))?;
        tracing::debug!(path = %path.display(), "created transcript log");
        Ok(Self {
            writer: file,
            path: Some(path),
        })
    }
}

impl<W: Write> TranscriptLog<W> {
    /// Log to an arbitrary writer.
    pub fn new(writer: W) -> Self {
        Self { writer, path: None }
    }

    /// The file being written, when logging to disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the request messages and the separator that introduces the
    /// response.
    pub fn write_header(&mut self, messages: &[ChatMessage]) -> Result<()> {
        self.writer.write_all(render(messages).as_bytes())?;
        writeln!(self.writer, "{CONTINUE_SEPARATOR}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Append one fragment of the response.
    pub fn append(&mut self, fragment: &str) -> Result<()> {
        self.writer.write_all(fragment.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

    /// Terminate the response.
    pub fn finish(&mut self) -> Result<()> {
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Give back the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn file_name_format() {
        let name = log_file_name(datetime!(2023-03-14 09:05:07 UTC)).unwrap();
        assert_eq!(name, "2023-03-14T09-05-07.gpt.txt");
    }

    #[test]
    fn log_layout() {
        let mut log = TranscriptLog::new(Vec::new());
        log.write_header(&[ChatMessage::system("s"), ChatMessage::user("q")])
            .unwrap();
        log.append("an").unwrap();
        log.append("swer").unwrap();
        log.finish().unwrap();
        let text = String::from_utf8(log.into_inner()).unwrap();
        assert_eq!(text, "s\n\n\t>>>>>>\nq\n\n\t<<<<<<\nanswer\n");
    }

    #[test]
    fn create_writes_into_dir() {
        let dir = std::env::temp_dir().join(format!("gpt-pipe-log-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut log = TranscriptLog::create(&dir).unwrap();
        let path = log.path().unwrap().to_path_buf();
        assert!(path.starts_with(&dir));
        assert!(path.to_string_lossy().ends_with(LOG_SUFFIX));
        log.write_header(&[ChatMessage::user("hi")]).unwrap();
        log.finish().unwrap();
        drop(log);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "\t>>>>>>\nhi\n\n\t<<<<<<\n\n"
        );
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
