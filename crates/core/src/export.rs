//! Turning generated code into a downloadable file.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use tracing::info;

use crate::error::{LifecycleError, Result};

/// File name stem used when the suggested name sanitizes to nothing.
pub const DEFAULT_EXPORT_NAME: &str = "vibr_game";
/// Extension of exported games.
pub const EXPORT_EXTENSION: &str = "py";
/// Media type of exported games.
pub const EXPORT_MEDIA_TYPE: &str = "text/plain";

/// A ready-to-save export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Sanitized file name including the extension.
    pub file_name: String,
    /// MIME type of the contents.
    pub media_type: &'static str,
    /// File contents.
    pub contents: String,
}

impl Artifact {
    /// Write the artifact into `dir`, creating it if needed.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        let path = dir.join(&self.file_name);
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))
            .and_then(|_| {
                fs::write(&path, &self.contents)
                    .with_context(|| format!("failed to write {}", path.display()))
            })
            .map_err(LifecycleError::persistence)?;
        info!(path = %path.display(), bytes = self.contents.len(), "Game exported");
        Ok(path)
    }
}

/// Package `code` as a plain-text file named after `suggested_name`.
pub fn export(code: &str, suggested_name: &str) -> Artifact {
    Artifact {
        file_name: format!("{}.{EXPORT_EXTENSION}", sanitize_file_stem(suggested_name)),
        media_type: EXPORT_MEDIA_TYPE,
        contents: code.to_string(),
    }
}

/// Keep ASCII letters, digits, `-` and `_`; fall back to [`DEFAULT_EXPORT_NAME`].
pub fn sanitize_file_stem(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_') {
            result.push(ch);
        }
    }
    if result.is_empty() {
        DEFAULT_EXPORT_NAME.to_string()
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_name_uses_default() {
        let artifact = export("print(1)", "");
        assert_eq!(artifact.file_name, "vibr_game.py");
        assert_eq!(artifact.contents, "print(1)");
        assert_eq!(artifact.media_type, "text/plain");
    }

    #[test]
    fn strips_disallowed_characters() {
        assert_eq!(export("", "My Game!").file_name, "MyGame.py");
        assert_eq!(export("", "../../etc/passwd").file_name, "etcpasswd.py");
        assert_eq!(export("", "snake_v2-final").file_name, "snake_v2-final.py");
        assert_eq!(export("", "!!! ???").file_name, "vibr_game.py");
    }

    #[test]
    fn writes_into_export_directory() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let target = dir.path().join("exports");
        let path = export("import pygame\n", "Shooter").write_to(&target)?;
        assert_eq!(path, target.join("Shooter.py"));
        assert_eq!(fs::read_to_string(path)?, "import pygame\n");
        Ok(())
    }
}
