//! Writes generated documents to disk. Every write replaces the target file
//! as a whole: the contents go to a temporary file in the target's directory
//! which is then renamed over the target, so a failure part way through
//! leaves the previous file untouched.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// Atomically replaces the file at `path` with `contents`. The parent
/// directory must already exist.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let annotate = |err: io::Error| Error {
        path: path.to_owned(),
        err,
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(annotate)?;
    tmp.write_all(contents).map_err(annotate)?;
    tmp.flush().map_err(annotate)?;
    // Temporary files are created owner-only; the output must stay as
    // readable as the file it replaces.
    copy_permissions(&tmp, path).map_err(annotate)?;
    tmp.as_file().sync_all().map_err(annotate)?;
    tmp.persist(path).map_err(|e| annotate(e.error))?;
    Ok(())
}

/// The mode given to an output file that doesn't exist yet.
#[cfg(unix)]
pub const NEW_FILE_MODE: u32 = 0o644;

/// Gives `tmp` the permissions of the existing file at `path`, or
/// [`NEW_FILE_MODE`] if there is none.
fn copy_permissions(tmp: &NamedTempFile, path: &Path) -> io::Result<()> {
    match std::fs::metadata(path) {
        Ok(metadata) => tmp.as_file().set_permissions(metadata.permissions()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => set_new_file_permissions(tmp.as_file()),
        Err(err) => Err(err),
    }
}

#[cfg(unix)]
fn set_new_file_permissions(file: &File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(NEW_FILE_MODE))
}

#[cfg(not(unix))]
fn set_new_file_permissions(_file: &File) -> io::Result<()> {
    Ok(())
}

/// The result of a fallible write.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure writing an output file.
#[derive(Debug)]
pub struct Error {
    /// The file that was being written.
    pub path: PathBuf,

    /// The underlying I/O error.
    pub err: io::Error,
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Writing '{}'", self.path.display())
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_replaces_whole_file() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = dir.path().join("out.html");
        std::fs::write(&path, "a much longer previous version of the file")?;

        write_atomic(&path, b"new")?;

        assert_eq!("new", std::fs::read_to_string(&path)?);
        assert_eq!(1, std::fs::read_dir(dir.path())?.count());
        Ok(())
    }

    #[cfg(unix)]
    fn mode(path: &Path) -> io::Result<u32> {
        use std::os::unix::fs::PermissionsExt;
        Ok(std::fs::metadata(path)?.permissions().mode() & 0o777)
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_keeps_permissions() -> std::result::Result<(), Box<dyn std::error::Error>> {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new()?;
        for &expected in &[0o644, 0o640, 0o664] {
            let path = dir.path().join(format!("out-{:o}.xml", expected));
            std::fs::write(&path, "old")?;
            std::fs::set_permissions(&path, Permissions::from_mode(expected))?;

            write_atomic(&path, b"new")?;

            assert_eq!(expected, mode(&path)?);
            assert_eq!("new", std::fs::read_to_string(&path)?);
        }

        let path = dir.path().join("fresh.xml");
        write_atomic(&path, b"new")?;
        assert_eq!(NEW_FILE_MODE, mode(&path)?);
        Ok(())
    }

    #[test]
    fn test_write_atomic_missing_directory_leaves_nothing() -> io::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("missing").join("out.html");

        let err = write_atomic(&path, b"new").unwrap_err();

        assert_eq!(path, err.path);
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_write_atomic_keeps_previous_file_on_failure() -> io::Result<()> {
        let dir = TempDir::new()?;
        // A directory can't be replaced by a file, so the final rename fails.
        let path = dir.path().join("taken");
        std::fs::create_dir(&path)?;
        std::fs::write(path.join("keep.txt"), "kept")?;

        assert!(write_atomic(&path, b"new").is_err());

        assert!(path.is_dir());
        assert_eq!("kept", std::fs::read_to_string(path.join("keep.txt"))?);
        assert_eq!(1, std::fs::read_dir(dir.path())?.count());
        Ok(())
    }
}
