//! Application orchestration layer for Plotshelf.

mod controls;
mod tree;
mod viewer;

pub use controls::{BrowseState, FilterControls};
pub use tree::{
    Activation, CORRELATION_LABEL, Leaf, NavTree, Row, SEASONAL_LABEL, Section, SectionBody,
    SectionId, TIMESERIES_LABEL, build_tree, leaf_list,
};
pub use plotshelf_core::LoadRequest;
pub use viewer::{ViewStatus, Viewer};

use plotshelf_core::{GraphItem, Manifest, Settings};

#[derive(Debug, Clone)]
pub struct AppContext {
    pub settings: Settings,
    pub manifest: Manifest,
    pub load_error: Option<String>,
    pub controls: FilterControls,
    pub tree: NavTree,
    pub viewer: Viewer,
    pub selected_row: usize,
}

impl AppContext {
    pub fn new(settings: Settings) -> Self {
        let controls = FilterControls::new(settings.categories.clone());
        Self {
            settings,
            manifest: Manifest::default(),
            load_error: None,
            controls,
            tree: NavTree::default(),
            viewer: Viewer::default(),
            selected_row: 0,
        }
    }

    pub fn with_manifest(mut self, manifest: Manifest) -> Self {
        let categories = if self.settings.categories.is_empty() {
            manifest.categories()
        } else {
            self.settings.categories.clone()
        };
        self.controls = FilterControls::new(categories);
        self.manifest = manifest;
        self.load_error = None;
        self.rebuild();
        self
    }

    /// Leaves the tree empty and records the error for display.
    pub fn with_load_error(mut self, error: impl Into<String>) -> Self {
        self.manifest = Manifest::default();
        self.load_error = Some(error.into());
        self.rebuild();
        self
    }

    /// Discards the tree and builds a fresh, fully expanded one.
    pub fn rebuild(&mut self) {
        self.tree = build_tree(&self.manifest, self.controls.state());
        let rows = self.tree.rows().len();
        self.selected_row = self.selected_row.min(rows.saturating_sub(1));
        tracing::debug!(
            leaves = self.tree.leaf_count(),
            filter = %self.controls.state().filter,
            search = %self.controls.search(),
            "navigation tree rebuilt"
        );
    }

    /// First timeseries item passing the current filter and search.
    pub fn first_graph(&self) -> Option<&GraphItem> {
        let state = self.controls.state();
        self.manifest
            .timeseries_graphs
            .iter()
            .find(|item| state.admits(item, &item.label()))
    }

    /// Initial selection after the manifest is in place.
    pub fn start(&mut self) -> Option<LoadRequest> {
        let path = self.first_graph()?.path.clone();
        if let Some(row) = self.tree.row_of_path(&path) {
            self.selected_row = row;
        }
        Some(self.viewer.show(&path))
    }

    pub fn select_category(&mut self, index: usize) {
        if self.controls.select_category(index) {
            self.rebuild();
        }
    }

    pub fn cycle_category(&mut self, delta: isize) {
        if self.controls.cycle_category(delta) {
            self.rebuild();
        }
    }

    pub fn push_search_char(&mut self, ch: char) {
        if self.controls.push_search_char(ch) {
            self.rebuild();
        }
    }

    pub fn pop_search_char(&mut self) {
        if self.controls.pop_search_char() {
            self.rebuild();
        }
    }

    pub fn clear_search(&mut self) {
        if self.controls.clear_search() {
            self.rebuild();
        }
    }

    pub fn set_search(&mut self, text: &str) {
        if self.controls.set_search(text) {
            self.rebuild();
        }
    }

    pub fn select_next_row(&mut self) {
        let rows = self.tree.rows().len();
        if self.selected_row + 1 < rows {
            self.selected_row += 1;
        }
    }

    pub fn select_prev_row(&mut self) {
        self.selected_row = self.selected_row.saturating_sub(1);
    }

    /// Activates the selected row; a leaf yields the load the engine must run.
    pub fn activate_selected(&mut self) -> Option<LoadRequest> {
        match self.tree.activate(self.selected_row)? {
            Activation::Toggled { id, collapsed } => {
                tracing::debug!(?id, collapsed, "section toggled");
                None
            }
            Activation::Selected(path) => Some(self.viewer.show(&path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plotshelf_test::{item, make_settings, manifest_with, tagged};

    fn weather_manifest() -> Manifest {
        manifest_with(vec![tagged("x/temp_avg.png", "weather")], vec![], vec![])
    }

    #[test]
    fn start_shows_first_timeseries_graph() {
        let mut ctx = AppContext::new(make_settings()).with_manifest(weather_manifest());
        let request = ctx.start().expect("first graph");
        assert_eq!(request.path, "x/temp_avg.png");
        assert_eq!(ctx.viewer.title(), "Temp Avg");
        assert!(ctx.viewer.is_loading());
        assert_eq!(ctx.selected_row, 1);
    }

    #[test]
    fn start_without_timeseries_shows_nothing() {
        let manifest = manifest_with(vec![], vec![item("s/a.png")], vec![]);
        let mut ctx = AppContext::new(make_settings()).with_manifest(manifest);
        assert!(ctx.start().is_none());
        assert_eq!(ctx.viewer.path(), None);
    }

    #[test]
    fn first_graph_uses_manifest_order() {
        let manifest = manifest_with(vec![item("t/zeta.png"), item("t/alpha.png")], vec![], vec![]);
        let ctx = AppContext::new(make_settings()).with_manifest(manifest);
        assert_eq!(ctx.first_graph().map(|i| i.path.as_str()), Some("t/zeta.png"));
    }

    #[test]
    fn categories_come_from_manifest_when_unconfigured() {
        let ctx = AppContext::new(make_settings()).with_manifest(weather_manifest());
        assert_eq!(ctx.controls.tags(), ["all", "weather"]);

        let mut settings = make_settings();
        settings.categories = vec!["rainfall".to_string()];
        let ctx = AppContext::new(settings).with_manifest(weather_manifest());
        assert_eq!(ctx.controls.tags(), ["all", "rainfall"]);
    }

    #[test]
    fn filtering_to_unknown_category_empties_timeseries() {
        let mut settings = make_settings();
        settings.categories = vec!["rainfall".to_string()];
        let mut ctx = AppContext::new(settings).with_manifest(weather_manifest());
        ctx.select_category(1);
        assert!(ctx.tree.sections()[0].leaves().is_empty());
    }

    #[test]
    fn filter_change_keeps_viewer_and_resets_collapse() {
        let mut ctx = AppContext::new(make_settings()).with_manifest(weather_manifest());
        ctx.start();
        ctx.selected_row = 0;
        assert!(ctx.activate_selected().is_none());
        assert!(ctx.tree.sections()[0].collapsed);

        ctx.push_search_char('t');
        assert!(ctx.tree.sections().iter().all(|s| !s.collapsed));
        assert_eq!(ctx.viewer.path(), Some("x/temp_avg.png"));
        assert_eq!(ctx.viewer.generation(), 1);
    }

    #[test]
    fn activating_leaf_requests_load() {
        let manifest = manifest_with(vec![item("t/a.png"), item("t/b.png")], vec![], vec![]);
        let mut ctx = AppContext::new(make_settings()).with_manifest(manifest);
        ctx.select_next_row();
        ctx.select_next_row();
        let request = ctx.activate_selected().expect("leaf load");
        assert_eq!(request.path, "t/b.png");
        assert_eq!(ctx.viewer.title(), "B");
        assert!(!ctx.tree.sections()[0].collapsed);
    }

    #[test]
    fn selection_is_clamped_after_rebuild() {
        let manifest = manifest_with(vec![item("t/a.png"), item("t/b.png")], vec![], vec![]);
        let mut ctx = AppContext::new(make_settings()).with_manifest(manifest);
        ctx.selected_row = 4;
        ctx.set_search("zzz");
        assert_eq!(ctx.tree.rows().len(), 3);
        assert_eq!(ctx.selected_row, 2);
    }

    #[test]
    fn load_error_leaves_tree_empty() {
        let ctx = AppContext::new(make_settings()).with_load_error("boom");
        assert_eq!(ctx.load_error.as_deref(), Some("boom"));
        assert_eq!(ctx.tree.leaf_count(), 0);
    }
}
