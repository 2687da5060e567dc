use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::model::{Task, TaskId};

/// Case-insensitive substring query over task title and description.
///
/// A blank term matches everything and dims nothing.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    re: Option<Regex>,
}

impl SearchQuery {
    pub fn new(term: &str) -> Self {
        let term = term.trim();
        if term.is_empty() {
            return SearchQuery { re: None };
        }
        // An escaped literal always compiles
        let re = RegexBuilder::new(&regex::escape(term))
            .case_insensitive(true)
            .build()
            .ok();
        SearchQuery { re }
    }

    /// True when a non-blank term is active
    pub fn is_active(&self) -> bool {
        self.re.is_some()
    }

    pub fn matches(&self, task: &Task) -> bool {
        match &self.re {
            None => true,
            Some(re) => {
                re.is_match(&task.title)
                    || task.description.as_deref().is_some_and(|d| re.is_match(d))
            }
        }
    }
}

/// Presentation flags for one node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeFlags {
    pub is_selected: bool,
    pub is_critical: bool,
    pub is_search_match: bool,
    pub is_dimmed: bool,
    pub is_link_source: bool,
    pub is_link_target: bool,
}

/// The view-side inputs to annotation
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub selected: Option<TaskId>,
    pub critical: HashSet<TaskId>,
    pub search: String,
    /// Source task while link mode is active
    pub link_source: Option<TaskId>,
}

/// Computes per-node flags for one view state. Build once per projection.
#[derive(Debug)]
pub struct Annotator<'a> {
    view: &'a ViewState,
    query: SearchQuery,
}

impl<'a> Annotator<'a> {
    pub fn new(view: &'a ViewState) -> Self {
        Annotator {
            view,
            query: SearchQuery::new(&view.search),
        }
    }

    pub fn flags(&self, task: &Task) -> NodeFlags {
        let is_search_match = self.query.matches(task);
        let is_link_source = self.view.link_source == Some(task.id);
        NodeFlags {
            is_selected: self.view.selected == Some(task.id),
            is_critical: self.is_critical(task.id),
            is_search_match,
            is_dimmed: self.query.is_active() && !is_search_match,
            is_link_source,
            is_link_target: self.view.link_source.is_some() && !is_link_source,
        }
    }

    pub fn is_critical(&self, id: TaskId) -> bool {
        self.view.critical.contains(&id)
    }
}
