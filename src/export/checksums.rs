//! `manifest.json`: a sha256 inventory of the output tree.

use super::{ExportError, ExportMeta, write_pretty};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Relative to the output directory, `/`-separated.
    pub path: String,
    pub sha256: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub dataset_version: String,
    pub generated_at: String,
    pub artifact_count: usize,
    pub artifacts: Vec<Artifact>,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Hash every file under `out_dir` except the manifest, sorted by path.
pub fn collect_artifacts(out_dir: &Path) -> Result<Vec<Artifact>, ExportError> {
    let mut artifacts = Vec::new();
    for entry in WalkDir::new(out_dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(out_dir) else {
            continue;
        };
        let path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if path == MANIFEST_FILE {
            continue;
        }
        let bytes = fs::read(entry.path())?;
        artifacts.push(Artifact {
            path,
            sha256: sha256_hex(&bytes),
            size: bytes.len() as u64,
        });
    }
    artifacts.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(artifacts)
}

/// Write `out_dir/manifest.json` describing the current tree.
pub fn write_manifest(out_dir: &Path, meta: &ExportMeta) -> Result<Manifest, ExportError> {
    let artifacts = collect_artifacts(out_dir)?;
    let manifest = Manifest {
        dataset_version: meta.version.clone(),
        generated_at: meta.generated_at.clone(),
        artifact_count: artifacts.len(),
        artifacts,
    };
    write_pretty(&out_dir.join(MANIFEST_FILE), &manifest)?;
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::write_file;
    use tempfile::TempDir;

    fn meta() -> ExportMeta {
        ExportMeta {
            version: "v1".to_string(),
            generated_at: "2026-01-02T03:04:05Z".to_string(),
        }
    }

    #[test]
    fn known_digest() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn manifest_lists_sorted_nested_files() {
        let tmp = TempDir::new().unwrap();
        write_file(&tmp.path().join("json/all.json"), b"{}").unwrap();
        write_file(&tmp.path().join("csv/brands.csv"), b"id\n").unwrap();
        write_file(&tmp.path().join("api/v1/index.json"), b"[]").unwrap();

        let manifest = write_manifest(tmp.path(), &meta()).unwrap();
        let paths: Vec<&str> = manifest.artifacts.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(paths, ["api/v1/index.json", "csv/brands.csv", "json/all.json"]);
        assert_eq!(manifest.artifact_count, 3);
        assert_eq!(manifest.artifacts[1].size, 3);
        assert_eq!(manifest.artifacts[0].sha256, sha256_hex(b"[]"));
    }

    #[test]
    fn rerun_does_not_list_previous_manifest() {
        let tmp = TempDir::new().unwrap();
        write_file(&tmp.path().join("a.txt"), b"a").unwrap();
        write_manifest(tmp.path(), &meta()).unwrap();
        let manifest = write_manifest(tmp.path(), &meta()).unwrap();
        assert_eq!(manifest.artifact_count, 1);

        let text = fs::read_to_string(tmp.path().join(MANIFEST_FILE)).unwrap();
        let on_disk: Manifest = serde_json::from_str(&text).unwrap();
        assert_eq!(on_disk, manifest);
    }
}
