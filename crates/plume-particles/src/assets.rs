//! Texture resolution at reload time

use plume_core::{PlumeError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Opaque handle to a loaded texture. `TextureHandle::NONE` means untextured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

impl TextureHandle {
    pub const NONE: Self = Self(0);

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

/// Resolves texture paths named by definitions
pub trait AssetLoader {
    fn load_texture(&mut self, path: &Path) -> Result<TextureHandle>;
}

/// Deduplicating loader that hands out one handle per distinct path
#[derive(Debug, Default)]
pub struct TextureCache {
    root: Option<PathBuf>,
    require_files: bool,
    handles: HashMap<PathBuf, TextureHandle>,
    paths: Vec<PathBuf>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `root` and require the files to exist
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            require_files: true,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn path(&self, handle: TextureHandle) -> Option<&Path> {
        let index = (handle.0 as usize).checked_sub(1)?;
        self.paths.get(index).map(PathBuf::as_path)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl AssetLoader for TextureCache {
    fn load_texture(&mut self, path: &Path) -> Result<TextureHandle> {
        if path.as_os_str().is_empty() {
            return Ok(TextureHandle::NONE);
        }
        let resolved = self.resolve(path);
        if let Some(handle) = self.handles.get(&resolved) {
            return Ok(*handle);
        }
        if self.require_files && !resolved.is_file() {
            return Err(PlumeError::AssetError(format!(
                "texture not found: {}",
                resolved.display()
            )));
        }
        self.paths.push(resolved.clone());
        let handle = TextureHandle(self.paths.len() as u32);
        log::debug!("texture {} -> {:?}", resolved.display(), handle);
        self.handles.insert(resolved, handle);
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_is_untextured() {
        let mut cache = TextureCache::new();
        let handle = cache.load_texture(Path::new("")).unwrap();
        assert!(handle.is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn same_path_same_handle() {
        let mut cache = TextureCache::new();
        let a = cache.load_texture(Path::new("fx/spark.png")).unwrap();
        let b = cache.load_texture(Path::new("fx/spark.png")).unwrap();
        let c = cache.load_texture(Path::new("fx/smoke.png")).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.path(c), Some(Path::new("fx/smoke.png")));
    }

    #[test]
    fn rooted_cache_requires_existing_files() {
        let mut cache = TextureCache::with_root(std::env::temp_dir());
        let err = cache
            .load_texture(Path::new("plume-no-such-texture.png"))
            .unwrap_err();
        assert!(matches!(err, PlumeError::AssetError(_)));
    }
}
