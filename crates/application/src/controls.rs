use plotshelf_core::{CategoryFilter, GraphItem};

/// Category filter and search text shared by every tree rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowseState {
    pub filter: CategoryFilter,
    pub search: String,
}

impl BrowseState {
    pub fn admits(&self, item: &GraphItem, label: &str) -> bool {
        self.filter.matches(item.csv_source.as_deref()) && self.search_matches(label)
    }

    pub fn search_matches(&self, label: &str) -> bool {
        self.search.is_empty() || label.to_lowercase().contains(&self.search.to_lowercase())
    }
}

/// Mutually exclusive category chips plus the search input.
///
/// Every mutator returns `true` when the navigation tree has to be rebuilt.
#[derive(Debug, Clone)]
pub struct FilterControls {
    tags: Vec<String>,
    active: usize,
    state: BrowseState,
}

impl Default for FilterControls {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FilterControls {
    pub fn new(categories: Vec<String>) -> Self {
        let mut tags = vec![CategoryFilter::ALL_TAG.to_string()];
        for tag in categories {
            let tag = tag.trim().to_lowercase();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        Self {
            tags,
            active: 0,
            state: BrowseState::default(),
        }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn state(&self) -> &BrowseState {
        &self.state
    }

    pub fn search(&self) -> &str {
        &self.state.search
    }

    pub fn select_category(&mut self, index: usize) -> bool {
        let Some(tag) = self.tags.get(index) else {
            return false;
        };
        let Ok(filter) = tag.parse::<CategoryFilter>() else {
            return false;
        };
        self.active = index;
        self.state.filter = filter;
        tracing::debug!(filter = %self.state.filter, "category selected");
        true
    }

    pub fn cycle_category(&mut self, delta: isize) -> bool {
        let len = self.tags.len() as isize;
        let next = (self.active as isize + delta).rem_euclid(len);
        self.select_category(next as usize)
    }

    pub fn set_search(&mut self, text: &str) -> bool {
        text.clone_into(&mut self.state.search);
        tracing::debug!(search = %self.state.search, "search updated");
        true
    }

    pub fn push_search_char(&mut self, ch: char) -> bool {
        let mut text = self.state.search.clone();
        text.push(ch);
        self.set_search(&text)
    }

    pub fn pop_search_char(&mut self) -> bool {
        let mut text = self.state.search.clone();
        if text.pop().is_none() {
            return false;
        }
        self.set_search(&text)
    }

    pub fn clear_search(&mut self) -> bool {
        if self.state.search.is_empty() {
            return false;
        }
        self.set_search("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_first_and_active() {
        let controls = FilterControls::new(vec!["weather".to_string(), "Lake".to_string()]);
        assert_eq!(controls.tags(), ["all", "weather", "lake"]);
        assert_eq!(controls.active(), 0);
        assert_eq!(controls.state().filter, CategoryFilter::All);
    }

    #[test]
    fn duplicate_and_all_tags_are_dropped() {
        let controls = FilterControls::new(vec![
            "ALL".to_string(),
            "lake".to_string(),
            " lake ".to_string(),
        ]);
        assert_eq!(controls.tags(), ["all", "lake"]);
    }

    #[test]
    fn selecting_category_sets_filter() {
        let mut controls = FilterControls::new(vec!["weather".to_string()]);
        assert!(controls.select_category(1));
        assert_eq!(controls.active(), 1);
        assert_eq!(
            controls.state().filter,
            CategoryFilter::Tag("weather".to_string())
        );
        assert!(!controls.select_category(5));
        assert_eq!(controls.active(), 1);
        assert!(controls.select_category(0));
        assert_eq!(controls.state().filter, CategoryFilter::All);
    }

    #[test]
    fn cycle_wraps_both_ways() {
        let mut controls = FilterControls::new(vec!["a".to_string(), "b".to_string()]);
        controls.cycle_category(-1);
        assert_eq!(controls.active(), 2);
        controls.cycle_category(1);
        assert_eq!(controls.active(), 0);
        controls.cycle_category(4);
        assert_eq!(controls.active(), 1);
    }

    #[test]
    fn search_edits_report_rebuilds() {
        let mut controls = FilterControls::default();
        assert!(controls.push_search_char('t'));
        assert!(controls.push_search_char('E'));
        assert_eq!(controls.search(), "tE");
        assert!(controls.pop_search_char());
        assert_eq!(controls.search(), "t");
        assert!(controls.clear_search());
        assert!(!controls.clear_search());
        assert!(!controls.pop_search_char());
        assert!(controls.set_search("hum"));
        assert_eq!(controls.search(), "hum");
    }

    #[test]
    fn empty_search_admits_everything() {
        let state = BrowseState::default();
        assert!(state.search_matches("Anything"));
        let state = BrowseState {
            filter: CategoryFilter::All,
            search: "Avg".to_string(),
        };
        assert!(state.search_matches("Temp avg"));
        assert!(!state.search_matches("Temp Max"));
    }
}
