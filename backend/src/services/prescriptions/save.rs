use crate::error::PrescriptionError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Writes a local copy of a rendered PDF into `dir`, replacing any file of the same name.
///
/// Names come from free-text patient names, so anything that could leave
/// `dir` is refused.
pub fn write_copy(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, PrescriptionError> {
    if file_name.contains(['/', '\\', '\0']) {
        return Err(PrescriptionError::Storage(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{}' is not a plain file name", file_name),
        )));
    }

    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    fs::write(&path, bytes)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested");

        let path = write_copy(&target, "Jane_Doe_Prescription.pdf", b"first").unwrap();
        assert_eq!(path, target.join("Jane_Doe_Prescription.pdf"));
        write_copy(&target, "Jane_Doe_Prescription.pdf", b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn refuses_path_separators() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["../evil_Prescription.pdf", "a\\b_Prescription.pdf"] {
            let err = write_copy(dir.path(), name, b"x").unwrap_err();
            assert!(matches!(err, PrescriptionError::Storage(_)), "{name}");
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
