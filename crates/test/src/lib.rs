//! Test helpers and fixtures.

use plotshelf_core::{GraphItem, Manifest, Settings};

pub fn make_settings() -> Settings {
    Settings {
        manifest_path: "index.json".to_string(),
        asset_root: ".".to_string(),
        categories: Vec::new(),
        log_level: "debug".to_string(),
    }
}

pub fn item(path: &str) -> GraphItem {
    GraphItem::new(path, None)
}

pub fn tagged(path: &str, csv_source: &str) -> GraphItem {
    GraphItem::new(path, Some(csv_source))
}

pub fn manifest_with(
    timeseries: Vec<GraphItem>,
    seasonal: Vec<GraphItem>,
    correlations: Vec<(&str, Vec<GraphItem>)>,
) -> Manifest {
    Manifest {
        timeseries_graphs: timeseries,
        seasonal_correlations: seasonal,
        correlation_graphs: correlations
            .into_iter()
            .map(|(key, items)| (key.to_string(), items))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_manifest() {
        let manifest = manifest_with(
            vec![tagged("t/a.png", "lake")],
            vec![item("s/b.png")],
            vec![("cpi", vec![item("c/c.png")])],
        );
        assert_eq!(manifest.item_count(), 3);
        assert_eq!(manifest.categories(), vec!["lake".to_string()]);
    }
}
