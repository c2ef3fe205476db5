//! Target path resolution
//!
//! A generator target is either a single file overwritten in place (a routes
//! file, for example) or a directory receiving one file per generated name.
//! Resolution decides which, creates the directory when needed and returns
//! the final path. It runs exactly once per generated file so planning and
//! writing always agree on the destination.

use crate::client::GeneratedFile;
use crate::config::TargetKind;
use crate::error::{FileOperation, WriteError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Destination of one generated file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub target_path: PathBuf,
    pub is_directory_target: bool,
}

/// Resolve where `file` goes under `target_root`, creating directories for
/// directory-style targets.
pub fn resolve(
    target_root: &Path,
    file: &GeneratedFile,
    create_directories: bool,
    kind: TargetKind,
) -> Result<ResolvedTarget, WriteError> {
    if kind == TargetKind::File {
        return Ok(ResolvedTarget {
            target_path: target_root.to_path_buf(),
            is_directory_target: false,
        });
    }

    let base_path = if create_directories && !file.dir.is_empty() {
        target_root.join(&file.dir)
    } else {
        target_root.to_path_buf()
    };

    let is_directory_target = kind == TargetKind::Directory
        || (!names_file(&base_path, &file.name) && !base_path.is_file());

    if !is_directory_target {
        return Ok(ResolvedTarget {
            target_path: base_path,
            is_directory_target,
        });
    }

    if !base_path.is_dir() {
        debug!("Creating target directory {}", base_path.display());
        std::fs::create_dir_all(&base_path)
            .map_err(|e| WriteError::new(FileOperation::CreateDir, base_path.clone(), e))?;
    }

    Ok(ResolvedTarget {
        target_path: base_path.join(&file.name),
        is_directory_target,
    })
}

fn names_file(base_path: &Path, name: &str) -> bool {
    !name.is_empty() && base_path.to_string_lossy().ends_with(name)
}

/// Render `path` for status output, relative to `cwd` when it lies beneath it.
/// Presentation only; never feed the result back into file I/O.
pub fn display_path(path: &Path, cwd: &Path) -> String {
    match path.strip_prefix(cwd) {
        Ok(relative) if !relative.as_os_str().is_empty() => relative.display().to_string(),
        _ => path.display().to_string(),
    }
}
