//! Core domain types for Plotshelf.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use icu_collator::options::{CollatorOptions, Strength};
use icu_collator::{Collator, CollatorBorrowed};
use serde::Deserialize;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp"];

/// One chart image entry of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawGraphItem")]
pub struct GraphItem {
    pub path: String,
    pub csv_source: Option<String>,
}

// The index generator writes bare path strings; hand-written manifests use objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawGraphItem {
    Path(String),
    Entry {
        path: String,
        #[serde(default)]
        csv_source: Option<String>,
    },
}

impl From<RawGraphItem> for GraphItem {
    fn from(raw: RawGraphItem) -> Self {
        match raw {
            RawGraphItem::Path(path) => Self {
                path,
                csv_source: None,
            },
            RawGraphItem::Entry { path, csv_source } => Self { path, csv_source },
        }
    }
}

impl GraphItem {
    pub fn new(path: impl Into<String>, csv_source: Option<&str>) -> Self {
        Self {
            path: path.into(),
            csv_source: csv_source.map(str::to_string),
        }
    }

    pub fn label(&self) -> String {
        format_filename(&self.path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub timeseries_graphs: Vec<GraphItem>,
    pub seasonal_correlations: Vec<GraphItem>,
    pub correlation_graphs: BTreeMap<String, Vec<GraphItem>>,
}

impl Manifest {
    pub fn items(&self) -> impl Iterator<Item = &GraphItem> {
        self.timeseries_graphs
            .iter()
            .chain(self.seasonal_correlations.iter())
            .chain(self.correlation_graphs.values().flatten())
    }

    pub fn item_count(&self) -> usize {
        self.items().count()
    }

    /// Distinct lowercase category tags, sorted.
    pub fn categories(&self) -> Vec<String> {
        self.items()
            .filter_map(|item| item.csv_source.as_deref())
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty() && tag != CategoryFilter::ALL_TAG)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// An image load the viewer asked for, tagged with its request generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub generation: u64,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Tag(String),
}

impl CategoryFilter {
    pub const ALL_TAG: &'static str = "all";

    pub fn as_str(&self) -> &str {
        match self {
            CategoryFilter::All => Self::ALL_TAG,
            CategoryFilter::Tag(tag) => tag,
        }
    }

    pub fn matches(&self, csv_source: Option<&str>) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Tag(wanted) => {
                csv_source.is_some_and(|source| source.to_lowercase() == *wanted)
            }
        }
    }
}

impl std::fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CategoryFilter {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let tag = value.trim().to_lowercase();
        match tag.as_str() {
            "" => Err("empty category tag"),
            CategoryFilter::ALL_TAG => Ok(CategoryFilter::All),
            _ => Ok(CategoryFilter::Tag(tag)),
        }
    }
}

/// Replaces `_` and `-` with spaces and uppercases the first letter of each word.
pub fn format_label(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for ch in text.chars() {
        let ch = if ch == '_' || ch == '-' { ' ' } else { ch };
        if ch.is_alphanumeric() && !in_word {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        in_word = ch.is_alphanumeric();
    }
    out
}

pub fn format_filename(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    format_label(strip_image_extension(name))
}

// A bare extension such as ".png" strips to an empty label.
fn strip_image_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if IMAGE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)) =>
        {
            stem
        }
        _ => name,
    }
}

/// Root-locale collator at tertiary strength: base letters first, then
/// accents, then case with lowercase ahead of uppercase.
static LABEL_COLLATOR: LazyLock<Option<CollatorBorrowed<'static>>> = LazyLock::new(|| {
    let mut options = CollatorOptions::default();
    options.strength = Some(Strength::Tertiary);
    Collator::try_new(Default::default(), options)
        .inspect_err(|err| {
            tracing::warn!(%err, "label collator unavailable; sorting by code point");
        })
        .ok()
});

/// Locale-aware label ordering used for leaf sorting.
///
/// Labels the collator considers equal fall back to code point order so the
/// result is total.
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    let collated = match LABEL_COLLATOR.as_ref() {
        Some(collator) => collator.compare(a, b),
        None => a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| b.cmp(a)),
    };
    collated.then_with(|| a.cmp(b))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub manifest_path: String,
    pub asset_root: String,
    pub categories: Vec<String>,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            manifest_path: Settings::DEFAULT_MANIFEST_PATH.to_string(),
            asset_root: ".".to_string(),
            categories: Vec::new(),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    pub const DEFAULT_MANIFEST_PATH: &'static str = "src/website/index.json";

    pub fn normalize(&mut self) {
        self.manifest_path = self.manifest_path.trim().to_string();
        if self.manifest_path.is_empty() {
            self.manifest_path = Settings::DEFAULT_MANIFEST_PATH.to_string();
        }

        self.asset_root = self.asset_root.trim().to_string();
        if self.asset_root.is_empty() {
            self.asset_root = ".".to_string();
        }

        self.categories = self
            .categories
            .iter()
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty() && tag != CategoryFilter::ALL_TAG)
            .collect();
        self.categories.sort();
        self.categories.dedup();

        self.log_level = self.log_level.trim().to_ascii_lowercase();
        if self.log_level.is_empty() {
            self.log_level = "info".to_string();
        }
    }

    pub fn manifest_path(&self, cwd: &Path) -> PathBuf {
        resolve_against(cwd, &self.manifest_path)
    }

    /// Resolves a manifest image path against the asset root.
    pub fn asset_path(&self, cwd: &Path, path: &str) -> PathBuf {
        let path_buf = PathBuf::from(path);
        if path_buf.is_absolute() {
            return path_buf;
        }
        resolve_against(cwd, &self.asset_root).join(path_buf)
    }
}

fn resolve_against(cwd: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}
