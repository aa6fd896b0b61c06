use std::fs::{self, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::RecorderError;
use crate::summary::SessionSummary;

const MAX_NAME_ATTEMPTS: usize = 100;

/// Writes one JSON file per finished session into a directory created on demand.
#[derive(Debug, Clone)]
pub struct SessionRecorder {
    dir: PathBuf,
}

impl SessionRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persists `summary` under a timestamped name and returns its path.
    /// Existing records are never overwritten.
    pub fn save(&self, summary: &SessionSummary) -> Result<PathBuf, RecorderError> {
        fs::create_dir_all(&self.dir).map_err(|source| RecorderError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let stem = format!("session_{}", summary.timestamp.format("%Y%m%d_%H%M%S_%3f"));
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = match attempt {
                0 => format!("{stem}.json"),
                n => format!("{stem}_{n}.json"),
            };
            let path = self.dir.join(name);
            let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(RecorderError::Io { path, source }),
            };

            write_or_discard(&path, BufWriter::new(file), summary)?;
            info!("session saved to {}", path.display());
            return Ok(path);
        }
        Err(RecorderError::NameExhausted(self.dir.clone()))
    }
}

/// Writes `summary` through `writer`, removing `path` if the record did not
/// make it out whole so no truncated file is left behind.
fn write_or_discard<W: Write>(
    path: &Path,
    mut writer: W,
    summary: &SessionSummary,
) -> Result<(), RecorderError> {
    let result = match serde_json::to_writer_pretty(&mut writer, summary) {
        Err(source) => Err(RecorderError::Serialize {
            path: path.to_path_buf(),
            source,
        }),
        Ok(()) => writer.flush().map_err(|source| RecorderError::Io {
            path: path.to_path_buf(),
            source,
        }),
    };
    drop(writer);

    if result.is_err() {
        if let Err(e) = fs::remove_file(path) {
            warn!("could not remove partial record {}: {e}", path.display());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use intero_scoring::score_session;

    fn summary() -> SessionSummary {
        SessionSummary::new(Local::now(), vec![25], Vec::new(), &score_session(&[], None))
    }

    #[test]
    fn creates_directory_and_unique_files() {
        let tmp = tempfile::tempdir().unwrap();
        let recorder = SessionRecorder::new(tmp.path().join("session_data"));
        let summary = summary();

        let first = recorder.save(&summary).unwrap();
        let second = recorder.save(&summary).unwrap();
        assert_ne!(first, second);
        assert!(first.starts_with(recorder.dir()));

        let name = first.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("session_") && name.ends_with(".json"));

        let text = fs::read_to_string(&second).unwrap();
        let back: SessionSummary = serde_json::from_str(&text).unwrap();
        assert_eq!(back.trial_lengths, vec![25]);
        assert_eq!(back.errors, summary.errors);
    }

    /// Accepts a few bytes, then reports a full disk.
    struct FullDisk {
        room: usize,
    }

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.room == 0 {
                return Err(std::io::Error::other("no space left on device"));
            }
            let n = buf.len().min(self.room);
            self.room -= n;
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_leaves_no_partial_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("session_test.json");
        fs::write(&path, b"").unwrap();

        let err = write_or_discard(&path, FullDisk { room: 16 }, &summary()).unwrap_err();
        assert!(matches!(err, RecorderError::Serialize { .. }));
        assert!(!path.exists());

        // buffered: serialization succeeds and the flush fails
        fs::write(&path, b"").unwrap();
        let writer = BufWriter::with_capacity(1 << 16, FullDisk { room: 0 });
        let err = write_or_discard(&path, writer, &summary()).unwrap_err();
        assert!(matches!(err, RecorderError::Io { .. }));
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn unwritable_location_propagates() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not_a_dir");
        fs::write(&blocker, b"x").unwrap();

        let recorder = SessionRecorder::new(blocker.join("session_data"));
        assert!(matches!(
            recorder.save(&summary()),
            Err(RecorderError::CreateDir { .. })
        ));
    }
}
