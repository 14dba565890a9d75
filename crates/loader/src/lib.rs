//! Manifest and settings loading.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use plotshelf_core::{Manifest, Settings};

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads and parses the manifest once.
pub fn load_manifest(path: impl AsRef<Path>) -> Result<Manifest, ManifestError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let manifest = parse_manifest(&raw).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(
        path = %path.display(),
        timeseries = manifest.timeseries_graphs.len(),
        seasonal = manifest.seasonal_correlations.len(),
        correlation_vars = manifest.correlation_graphs.len(),
        "manifest loaded"
    );
    Ok(manifest)
}

pub fn parse_manifest(raw: &str) -> Result<Manifest, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Loads `config.json` from `config_dir`; a missing file yields defaults.
pub fn load_settings(config_dir: &Path) -> anyhow::Result<Settings> {
    let path = config_dir.join("config.json");
    let mut settings = if path.is_file() {
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("read settings {}", path.display()))?;
        serde_json::from_str::<Settings>(&raw)
            .with_context(|| format!("parse settings {}", path.display()))?
    } else {
        Settings::default()
    };
    settings.normalize();
    Ok(settings)
}
