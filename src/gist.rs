//! Gist file sets

use crate::error::{GistError, GistResult};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};
use tokio::fs;
use tracing::debug;

/// A named source file. Filenames are POSIX-style relative paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub filename: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    /// Extension without the dot, if any
    pub fn extension(&self) -> Option<&str> {
        extension(&self.filename)
    }
}

/// Extension of a POSIX path, ignoring dots in directory names
pub fn extension(filename: &str) -> Option<&str> {
    let base = filename.rsplit('/').next().unwrap_or(filename);
    match base.rfind('.') {
        Some(0) | None => None,
        Some(i) => Some(&base[i + 1..]),
    }
}

/// A gist as loaded from its source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gist {
    pub description: String,
    pub files: Vec<SourceFile>,
}

impl Gist {
    pub fn new(description: impl Into<String>, files: Vec<SourceFile>) -> Self {
        Self {
            description: description.into(),
            files,
        }
    }

    /// Find a file by exact name
    pub fn file(&self, filename: &str) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.filename == filename)
    }

    /// Load a project directory as a gist.
    ///
    /// Skips dot entries, `node_modules`, non-UTF-8 files and anything
    /// under `exclude`. Files are sorted by name for a stable order.
    pub async fn load_dir(dir: &Path, exclude: Option<&Path>) -> GistResult<Self> {
        if !dir.is_dir() {
            return Err(GistError::PathNotFound(dir.to_path_buf()));
        }

        let mut files = vec![];
        let mut pending = vec![dir.to_path_buf()];

        while let Some(current) = pending.pop() {
            let mut entries = fs::read_dir(&current)
                .await
                .map_err(|e| GistError::io(format!("reading {}", current.display()), e))?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| GistError::io(format!("reading entry in {}", current.display()), e))?
            {
                let path = entry.path();
                let name = entry.file_name();
                let name = name.to_string_lossy();

                if name.starts_with('.') || name == "node_modules" {
                    continue;
                }
                if exclude.is_some_and(|ex| path.starts_with(ex)) {
                    continue;
                }

                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| GistError::io(format!("inspecting {}", path.display()), e))?;

                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    let bytes = fs::read(&path)
                        .await
                        .map_err(|e| GistError::io(format!("reading {}", path.display()), e))?;
                    match String::from_utf8(bytes) {
                        Ok(content) => files.push(SourceFile::new(posix_relative(dir, &path)?, content)),
                        Err(_) => debug!("Skipping non-UTF-8 file {}", path.display()),
                    }
                }
            }
        }

        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        debug!("Loaded {} files from {}", files.len(), dir.display());

        let description = dir
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_default();

        Ok(Self::new(description, files))
    }
}

fn posix_relative(root: &Path, path: &Path) -> GistResult<String> {
    let rel = path.strip_prefix(root).map_err(|_| GistError::PathInvalid {
        path: path.to_path_buf(),
        reason: format!("not under {}", root.display()),
    })?;

    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn extension_of_posix_paths() {
        assert_eq!(extension("src/app.js"), Some("js"));
        assert_eq!(extension("src/my-app.html.js"), Some("js"));
        assert_eq!(extension("src.d/README"), None);
        assert_eq!(extension(".babelrc"), None);
    }

    #[tokio::test]
    async fn load_dir_collects_sorted_files() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/vue")).unwrap();
        std::fs::create_dir_all(root.join("out")).unwrap();
        std::fs::write(root.join("index.html"), "<html></html>").unwrap();
        std::fs::write(root.join("src/main.js"), "main").unwrap();
        std::fs::write(root.join(".env"), "SECRET=1").unwrap();
        std::fs::write(root.join("node_modules/vue/index.js"), "vue").unwrap();
        std::fs::write(root.join("out/index.html"), "old").unwrap();
        std::fs::write(root.join("src/logo.png"), [0xffu8, 0xfe, 0x00]).unwrap();

        let gist = Gist::load_dir(root, Some(&root.join("out"))).await.unwrap();
        let names: Vec<_> = gist.files.iter().map(|f| f.filename.as_str()).collect();

        assert_eq!(names, vec!["index.html", "src/main.js"]);
        assert_eq!(gist.file("src/main.js").unwrap().content, "main");
    }

    #[tokio::test]
    async fn load_dir_missing() {
        let temp = TempDir::new().unwrap();
        let err = Gist::load_dir(&temp.path().join("nope"), None).await.unwrap_err();
        assert!(matches!(err, GistError::PathNotFound(_)));
    }
}
