//! Output files that appear together or not at all.

use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Write every `(path, contents)` pair, or none of them.
///
/// Each file is staged as a temporary file beside its destination. Only
/// once all of them are written are they renamed into place, so a failure
/// while staging leaves no output behind.
///
/// # Errors
///
/// Returns the first I/O error met while staging or renaming.
pub fn write_all_or_nothing(outputs: &[(&Path, &[u8])]) -> io::Result<()> {
    let mut staged = Vec::with_capacity(outputs.len());
    for &(path, contents) in outputs {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(contents)?;
        temp.flush()?;
        staged.push((temp, path));
    }

    for (temp, path) in staged {
        temp.persist(path).map_err(|e| e.error)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_writes_every_output() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a.fa");
        let second = dir.path().join("b.tsv");

        write_all_or_nothing(&[(&first, b">a\nAC\n"), (&second, b"column\n")]).unwrap();

        assert_eq!(std::fs::read_to_string(&first).unwrap(), ">a\nAC\n");
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "column\n");
    }

    #[test]
    fn test_failure_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a.fa");
        let unreachable = dir.path().join("missing").join("b.tsv");

        assert!(write_all_or_nothing(&[(&first, b">a\nAC\n"), (&unreachable, b"x")]).is_err());
        assert!(!first.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
