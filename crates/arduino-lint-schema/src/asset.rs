//! # Schema Assets
//!
//! The schema layer never touches the filesystem itself. It asks an
//! [`AssetLoader`] for a schema document by logical name (e.g.
//! `arduino-library-properties-schema.json`) and gets raw bytes back.
//!
//! - [`EmbeddedAssets`]: a static name → bytes table, typically built with
//!   `include_bytes!` so the schemas ship inside the binary.
//! - [`DirectoryAssets`]: files under a root directory.
//! - `HashMap<String, Vec<u8>>`: in-memory assets, handy in tests.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// Supplies raw schema documents by name.
pub trait AssetLoader: Send + Sync {
    /// Returns the bytes of the named asset, or `None` if there is none.
    fn load(&self, name: &str) -> Option<Cow<'_, [u8]>>;
}

/// Assets compiled into the binary.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedAssets {
    assets: &'static [(&'static str, &'static [u8])],
}

impl EmbeddedAssets {
    /// Wraps a static name → bytes table.
    pub const fn new(assets: &'static [(&'static str, &'static [u8])]) -> Self {
        Self { assets }
    }

    /// Names of all embedded assets, in table order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.assets.iter().map(|(name, _)| *name)
    }
}

impl AssetLoader for EmbeddedAssets {
    fn load(&self, name: &str) -> Option<Cow<'_, [u8]>> {
        self.assets
            .iter()
            .find(|(asset_name, _)| *asset_name == name)
            .map(|(_, bytes)| Cow::Borrowed(*bytes))
    }
}

/// Assets read from files under a root directory.
///
/// Names are relative paths; names that would escape the root are treated
/// as missing.
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    /// Serves assets from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetLoader for DirectoryAssets {
    fn load(&self, name: &str) -> Option<Cow<'_, [u8]>> {
        let relative = Path::new(name);
        if !relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
        {
            tracing::warn!(asset = name, "rejecting asset name outside the asset root");
            return None;
        }

        let path = self.root.join(relative);
        match std::fs::read(&path) {
            Ok(bytes) => Some(Cow::Owned(bytes)),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "asset not readable");
                None
            }
        }
    }
}

impl AssetLoader for HashMap<String, Vec<u8>> {
    fn load(&self, name: &str) -> Option<Cow<'_, [u8]>> {
        self.get(name).map(|bytes| Cow::Borrowed(bytes.as_slice()))
    }
}
