use std::path::{Component, Path};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("{path:?} is not under upload root {root:?}")]
    OutsideRoot {
        path: std::path::PathBuf,
        root: std::path::PathBuf,
    },
    #[error("local path contains unsupported component")]
    UnsupportedComponent,
    #[error("local path has no file name")]
    MissingFileName,
}

/// Root-to-leaf folder names a local file's parent maps to remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryChain(Vec<String>);

impl DirectoryChain {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn chain_for(root: &Path, file: &Path) -> Result<DirectoryChain, PathError> {
    let relative = file
        .strip_prefix(root)
        .map_err(|_| PathError::OutsideRoot {
            path: file.to_path_buf(),
            root: root.to_path_buf(),
        })?;
    let parent = relative.parent().unwrap_or(Path::new(""));

    let mut segments = Vec::new();
    for component in parent.components() {
        match component {
            // Backslash-separated names coming from Windows trees are split too.
            Component::Normal(part) => segments.extend(
                part.to_string_lossy()
                    .split(['/', '\\'])
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            ),
            Component::CurDir => continue,
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(PathError::UnsupportedComponent);
            }
        }
    }
    Ok(DirectoryChain(segments))
}

pub fn remote_file_name(file: &Path) -> Result<String, PathError> {
    file.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or(PathError::MissingFileName)
}
