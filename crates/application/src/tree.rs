//! Navigation tree built from the manifest and the current browse state.

use plotshelf_core::{GraphItem, Manifest, compare_labels, format_label};

use crate::BrowseState;

pub const TIMESERIES_LABEL: &str = "Timeseries Graphs";
pub const SEASONAL_LABEL: &str = "Seasonal Correlations";
pub const CORRELATION_LABEL: &str = "Correlation Graphs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionId {
    pub section: usize,
    pub subsection: Option<usize>,
}

impl SectionId {
    pub fn top(section: usize) -> Self {
        Self {
            section,
            subsection: None,
        }
    }

    pub fn nested(section: usize, subsection: usize) -> Self {
        Self {
            section,
            subsection: Some(subsection),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub label: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionBody {
    Leaves(Vec<Leaf>),
    Subsections(Vec<Section>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub label: String,
    pub collapsed: bool,
    pub body: SectionBody,
}

impl Section {
    fn with_leaves(label: impl Into<String>, leaves: Vec<Leaf>) -> Self {
        Self {
            label: label.into(),
            collapsed: false,
            body: SectionBody::Leaves(leaves),
        }
    }

    fn with_subsections(label: impl Into<String>, subsections: Vec<Section>) -> Self {
        Self {
            label: label.into(),
            collapsed: false,
            body: SectionBody::Subsections(subsections),
        }
    }

    pub fn leaves(&self) -> Vec<&Leaf> {
        match &self.body {
            SectionBody::Leaves(leaves) => leaves.iter().collect(),
            SectionBody::Subsections(subsections) => {
                subsections.iter().flat_map(|sub| sub.leaves()).collect()
            }
        }
    }
}

/// One visible line of the flattened tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row<'a> {
    Header {
        id: SectionId,
        depth: usize,
        label: &'a str,
        collapsed: bool,
    },
    Leaf {
        depth: usize,
        leaf: &'a Leaf,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    Toggled { id: SectionId, collapsed: bool },
    Selected(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavTree {
    sections: Vec<Section>,
}

impl NavTree {
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, id: SectionId) -> Option<&Section> {
        let top = self.sections.get(id.section)?;
        match id.subsection {
            None => Some(top),
            Some(idx) => match &top.body {
                SectionBody::Subsections(subsections) => subsections.get(idx),
                SectionBody::Leaves(_) => None,
            },
        }
    }

    fn section_mut(&mut self, id: SectionId) -> Option<&mut Section> {
        let top = self.sections.get_mut(id.section)?;
        match id.subsection {
            None => Some(top),
            Some(idx) => match &mut top.body {
                SectionBody::Subsections(subsections) => subsections.get_mut(idx),
                SectionBody::Leaves(_) => None,
            },
        }
    }

    /// Flips the collapsed flag of one section; returns the new value.
    pub fn toggle(&mut self, id: SectionId) -> Option<bool> {
        let section = self.section_mut(id)?;
        section.collapsed = !section.collapsed;
        Some(section.collapsed)
    }

    pub fn rows(&self) -> Vec<Row<'_>> {
        let mut rows = Vec::new();
        for (idx, section) in self.sections.iter().enumerate() {
            push_section_rows(&mut rows, section, SectionId::top(idx), 0);
        }
        rows
    }

    /// Resolves a row to exactly one target: a header toggles, a leaf selects.
    pub fn activate(&mut self, row: usize) -> Option<Activation> {
        enum Target {
            Header(SectionId),
            Leaf(String),
        }

        let target = match self.rows().get(row)? {
            Row::Header { id, .. } => Target::Header(*id),
            Row::Leaf { leaf, .. } => Target::Leaf(leaf.path.clone()),
        };

        match target {
            Target::Header(id) => {
                let collapsed = self.toggle(id)?;
                Some(Activation::Toggled { id, collapsed })
            }
            Target::Leaf(path) => Some(Activation::Selected(path)),
        }
    }

    /// Leaf labels in display order, regardless of collapsed state.
    pub fn visible_leaf_labels(&self) -> Vec<&str> {
        self.sections
            .iter()
            .flat_map(|section| section.leaves())
            .map(|leaf| leaf.label.as_str())
            .collect()
    }

    pub fn leaf_count(&self) -> usize {
        self.sections.iter().map(|s| s.leaves().len()).sum()
    }

    pub fn row_of_path(&self, path: &str) -> Option<usize> {
        self.rows()
            .iter()
            .position(|row| matches!(row, Row::Leaf { leaf, .. } if leaf.path == path))
    }
}

fn push_section_rows<'a>(rows: &mut Vec<Row<'a>>, section: &'a Section, id: SectionId, depth: usize) {
    rows.push(Row::Header {
        id,
        depth,
        label: &section.label,
        collapsed: section.collapsed,
    });
    if section.collapsed {
        return;
    }
    match &section.body {
        SectionBody::Leaves(leaves) => {
            rows.extend(leaves.iter().map(|leaf| Row::Leaf {
                depth: depth + 1,
                leaf,
            }));
        }
        SectionBody::Subsections(subsections) => {
            for (idx, sub) in subsections.iter().enumerate() {
                push_section_rows(rows, sub, SectionId::nested(id.section, idx), depth + 1);
            }
        }
    }
}

pub fn build_tree(manifest: &Manifest, state: &BrowseState) -> NavTree {
    let correlations = manifest
        .correlation_graphs
        .iter()
        .map(|(key, items)| Section::with_leaves(format_label(key), leaf_list(items, state)))
        .collect();

    NavTree {
        sections: vec![
            Section::with_leaves(TIMESERIES_LABEL, leaf_list(&manifest.timeseries_graphs, state)),
            Section::with_leaves(
                SEASONAL_LABEL,
                leaf_list(&manifest.seasonal_correlations, state),
            ),
            Section::with_subsections(CORRELATION_LABEL, correlations),
        ],
    }
}

/// Filters by category and search, then sorts by formatted filename.
pub fn leaf_list(items: &[GraphItem], state: &BrowseState) -> Vec<Leaf> {
    let mut leaves: Vec<Leaf> = items
        .iter()
        .filter_map(|item| {
            let label = item.label();
            state.admits(item, &label).then(|| Leaf {
                label,
                path: item.path.clone(),
            })
        })
        .collect();
    leaves.sort_by(|a, b| compare_labels(&a.label, &b.label));
    leaves
}
