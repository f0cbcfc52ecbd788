//! Source tree layout.
//!
//! ```text
//! data/                              stores/
//! └── Prusament/          brand.json └── prusa_store/  store.json (+ logo)
//!     └── PLA/            material.json
//!         └── Prusament PLA/  filament.json
//!             └── Galaxy Black/  variant.json + sizes.json
//! ```
//!
//! Every level below a root is a directory holding one manifest. Hidden
//! entries and plain files are never entities. Siblings are visited in
//! lexicographic order, which makes crawl and validation output
//! deterministic.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const SIZES_FILE: &str = "sizes.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Brand,
    Material,
    Filament,
    Variant,
    Store,
}

impl Level {
    /// Manifest file required in a directory of this level.
    pub fn manifest(self) -> &'static str {
        match self {
            Level::Brand => "brand.json",
            Level::Material => "material.json",
            Level::Filament => "filament.json",
            Level::Variant => "variant.json",
            Level::Store => "store.json",
        }
    }

    /// Schema name used to validate this level's manifest.
    pub fn schema(self) -> &'static str {
        match self {
            Level::Brand => "brand",
            Level::Material => "material",
            Level::Filament => "filament",
            Level::Variant => "variant",
            Level::Store => "store",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Level::Brand => "Brand",
            Level::Material => "Material",
            Level::Filament => "Filament",
            Level::Variant => "Variant",
            Level::Store => "Store",
        }
    }

    /// Manifest key whose value names the folder.
    pub fn folder_key(self) -> &'static str {
        match self {
            Level::Material => "material",
            _ => "id",
        }
    }

    /// Manifest key consulted when [`Level::folder_key`] is absent.
    pub fn display_key(self) -> &'static str {
        match self {
            Level::Material => "material",
            Level::Variant => "color_name",
            _ => "name",
        }
    }

    fn child(self) -> Option<Level> {
        match self {
            Level::Brand => Some(Level::Material),
            Level::Material => Some(Level::Filament),
            Level::Filament => Some(Level::Variant),
            Level::Variant | Level::Store => None,
        }
    }
}

/// One entity directory found in a source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDir {
    pub level: Level,
    pub path: PathBuf,
}

impl EntityDir {
    pub fn manifest_path(&self) -> PathBuf {
        self.path.join(self.level.manifest())
    }

    pub fn name(&self) -> String {
        dir_name(&self.path)
    }
}

pub fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with('.'))
}

/// Visible subdirectories of `path`, sorted by name.
pub fn subdirectories(path: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(path)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir() && !is_hidden(p))
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Every brand, material, filament and variant directory under `data_root`,
/// parents before children. A missing root yields nothing.
pub fn data_dirs(data_root: &Path) -> io::Result<Vec<EntityDir>> {
    let mut found = Vec::new();
    if data_root.is_dir() {
        collect(data_root, Level::Brand, &mut found)?;
    }
    Ok(found)
}

/// Every store directory under `stores_root`. A missing root yields nothing.
pub fn store_dirs(stores_root: &Path) -> io::Result<Vec<EntityDir>> {
    if !stores_root.is_dir() {
        return Ok(Vec::new());
    }
    Ok(subdirectories(stores_root)?
        .into_iter()
        .map(|path| EntityDir {
            level: Level::Store,
            path,
        })
        .collect())
}

fn collect(parent: &Path, level: Level, found: &mut Vec<EntityDir>) -> io::Result<()> {
    for path in subdirectories(parent)? {
        found.push(EntityDir {
            level,
            path: path.clone(),
        });
        if let Some(child) = level.child() {
            collect(&path, child, found)?;
        }
    }
    Ok(())
}
