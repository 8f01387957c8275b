use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::render::domain::transcript_writer::TranscriptWriter;

/// Writes transcripts through a sibling `.part` file and a rename, so a
/// failed write never leaves a truncated transcript behind.
#[derive(Debug, Default, Clone, Copy)]
pub struct AtomicFileWriter;

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

impl TranscriptWriter for AtomicFileWriter {
    fn write(&self, path: &Path, contents: &str) -> Result<(), Box<dyn std::error::Error>> {
        let part = part_path(path);
        let result = (|| -> std::io::Result<()> {
            let mut file = fs::File::create(&part)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
            fs::rename(&part, path)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&part);
            return Err(format!("failed to write {}: {e}", path.display()).into());
        }
        log::debug!("Wrote {} bytes to {}", contents.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("talk.mp3.vtt");
        AtomicFileWriter.write(&path, "1\nhello\n\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "1\nhello\n\n");
        assert!(!part_path(&path).exists());
    }

    #[test]
    fn test_overwrites_previous_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("talk.mp3.txt");
        AtomicFileWriter.write(&path, "old").unwrap();
        AtomicFileWriter.write(&path, "new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_failed_write_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("talk.mp3.vtt");
        assert!(AtomicFileWriter.write(&path, "data").is_err());
        assert!(!path.exists());
        assert!(!part_path(&path).exists());
    }

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("/a/b.vtt")),
            PathBuf::from("/a/b.vtt.part")
        );
    }
}
