use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Ordered image identifiers plus the directory relative ones resolve
/// against. `root` is `None` for identifiers given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageList {
    pub root: Option<PathBuf>,
    pub images: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ManifestFile {
    images: Vec<String>,
}

impl ImageList {
    pub fn from_args(images: &[String]) -> Self {
        Self {
            root: None,
            images: images.to_vec(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read image manifest {}", path.display()))?;
        let manifest: ManifestFile = toml::from_str(&text)
            .with_context(|| format!("failed to parse image manifest {}", path.display()))?;
        let root = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        tracing::debug!(
            manifest = %path.display(),
            images = manifest.images.len(),
            "loaded image manifest"
        );
        Ok(Self {
            root: Some(root),
            images: manifest.images,
        })
    }

    /// Manifest when given, otherwise the positional identifiers.
    pub fn resolve(manifest: Option<&Path>, images: &[String]) -> Result<Self> {
        match manifest {
            Some(path) => Self::load(path),
            None => Ok(Self::from_args(images)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn manifest_images_resolve_next_to_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("show.toml");
        fs::write(&path, "images = [\"a.png\", \"b.png\", \"a.png\"]\n").unwrap();

        let list = ImageList::load(&path).unwrap();
        assert_eq!(list.root.as_deref(), Some(dir.path()));
        assert_eq!(list.images, ["a.png", "b.png", "a.png"]);
    }

    #[test]
    fn manifest_without_images_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.toml");
        fs::write(&path, "").unwrap();
        assert!(ImageList::load(&path).unwrap().images.is_empty());
    }

    #[test]
    fn broken_manifest_reports_the_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "images = 3").unwrap();
        let err = ImageList::load(&path).unwrap_err();
        assert!(format!("{err}").contains("broken.toml"));
    }

    #[test]
    fn positional_images_have_no_root() {
        let list = ImageList::resolve(None, &["x.jpg".to_string()]).unwrap();
        assert_eq!(list.root, None);
        assert_eq!(list.images, ["x.jpg"]);
    }
}
