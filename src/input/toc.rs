//! Table of contents panel.

use std::collections::HashSet;

use crate::action::ViewerAction;
use crate::model::TocEntry;

/// One visible line of the flattened tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocRow {
    /// Child indices from the root down to this entry.
    pub path: Vec<usize>,
    pub title: String,
    pub page_index: usize,
    pub depth: usize,
    pub active: bool,
    pub has_children: bool,
    pub expanded: bool,
}

/// Entries start expanded; collapsing is remembered per entry.
#[derive(Debug, Clone, Default)]
pub struct TocPanel {
    entries: Vec<TocEntry>,
    collapsed: HashSet<Vec<usize>>,
}

impl TocPanel {
    pub fn new(entries: Vec<TocEntry>) -> Self {
        Self {
            entries,
            collapsed: HashSet::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    /// Visible rows in display order. Children of collapsed entries are hidden.
    pub fn rows(&self, current_page: usize) -> Vec<TocRow> {
        let mut rows = Vec::new();
        let mut path = Vec::new();
        self.flatten(&self.entries, current_page, &mut path, &mut rows);
        rows
    }

    fn flatten(
        &self,
        entries: &[TocEntry],
        current_page: usize,
        path: &mut Vec<usize>,
        rows: &mut Vec<TocRow>,
    ) {
        for (i, entry) in entries.iter().enumerate() {
            path.push(i);
            let expanded = !self.collapsed.contains(path.as_slice());
            rows.push(TocRow {
                path: path.clone(),
                title: entry.title.clone(),
                page_index: entry.page_index,
                depth: path.len() - 1,
                active: entry.page_index == current_page,
                has_children: !entry.children.is_empty(),
                expanded,
            });
            if expanded {
                self.flatten(&entry.children, current_page, path, rows);
            }
            path.pop();
        }
    }

    fn entry(&self, path: &[usize]) -> Option<&TocEntry> {
        let (first, rest) = path.split_first()?;
        let mut entry = self.entries.get(*first)?;
        for &i in rest {
            entry = entry.children.get(i)?;
        }
        Some(entry)
    }

    /// Expand or collapse an entry. Entries without children are left alone.
    pub fn toggle(&mut self, path: &[usize]) -> bool {
        match self.entry(path) {
            Some(entry) if !entry.children.is_empty() => {
                if !self.collapsed.remove(path) {
                    self.collapsed.insert(path.to_vec());
                }
                true
            }
            _ => false,
        }
    }

    /// Navigation for a click on an entry.
    pub fn select(&self, path: &[usize]) -> Option<ViewerAction> {
        self.entry(path)
            .map(|entry| ViewerAction::GoToPage(entry.page_index))
    }
}
