//! Writing issuance artifacts
//!
//! Every file is first staged as a synced temporary file in its target
//! directory. Only when all of them are staged are they renamed into place,
//! so a failed write leaves the previous output untouched and no temporary
//! files behind.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::{
    error::{PkiError, Result},
    issuance::Artifact,
};

/// Mode for private keys
pub const SECRET_FILE_MODE: u32 = 0o600;
/// Mode for certificates, chains and records
pub const PUBLIC_FILE_MODE: u32 = 0o644;

/// Write every artifact into `dir`, creating it if needed.
///
/// Existing files of the same name are replaced.
///
/// # Returns
/// Returns the written paths in order
pub fn write_artifacts(dir: &Path, artifacts: &[Artifact]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| PkiError::io(dir, e))?;

    let staged = artifacts
        .iter()
        .map(|artifact| {
            let path = dir.join(artifact.file_name);
            let file = stage(&path, &artifact.contents, artifact.secret)?;
            Ok((path, file, artifact.secret))
        })
        .collect::<Result<Vec<_>>>()?;

    staged
        .into_iter()
        .map(|(path, file, secret)| {
            file.persist(&path).map_err(|e| PkiError::io(&path, e.error))?;
            tracing::info!(path = %path.display(), secret, "wrote file");
            Ok(path)
        })
        .collect()
}

fn stage(path: &Path, contents: &[u8], secret: bool) -> Result<NamedTempFile> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir).map_err(|e| PkiError::io(dir, e))?;

    file.write_all(contents).map_err(|e| PkiError::io(path, e))?;
    set_mode(&file, if secret { SECRET_FILE_MODE } else { PUBLIC_FILE_MODE })
        .map_err(|e| PkiError::io(path, e))?;
    file.as_file().sync_all().map_err(|e| PkiError::io(path, e))?;

    Ok(file)
}

#[cfg(unix)]
fn set_mode(file: &NamedTempFile, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    file.as_file().set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &NamedTempFile, _mode: u32) -> std::io::Result<()> {
    Ok(())
}
