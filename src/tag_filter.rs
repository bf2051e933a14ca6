//! Tag-based list filtering.
//!
//! A filter group is a `.tag-filter` container holding a `.tag-filter-list` of
//! buttons, paired with a `.filtered-content` region. Selecting a tag shows the
//! items whose `data-tags` contain it, hides the rest, and derives the
//! visibility of year sections and the "no results" element from that.

use crate::dom::{ATTR_TAG, ATTR_TAGS, CLASS_ACTIVE, ElementLocator, Role};

/// Reserved tag value that shows every item.
pub const ALL_TAGS: &str = "all";

/// Comma-separated tag list, entries trimmed, empty entries dropped.
pub fn parse_tags(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn item_matches(raw_tags: &str, tag: &str) -> bool {
    tag == ALL_TAGS || parse_tags(raw_tags).contains(&tag)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOutcome {
    pub visible: usize,
    pub total: usize,
}

impl FilterOutcome {
    pub fn is_empty(&self) -> bool {
        self.visible == 0
    }
}

pub struct YearSection<N> {
    pub node: N,
    pub items: Vec<N>,
}

pub struct FilterGroup<N> {
    pub container: N,
    pub filter_list: N,
    pub content: N,
    pub buttons: Vec<N>,
    pub items: Vec<N>,
    pub year_sections: Vec<YearSection<N>>,
    pub no_results: Option<N>,
}

impl<N: Clone + PartialEq> FilterGroup<N> {
    /// Pairs a container with its content region. Returns `None` when the page
    /// has no filter list or no content region for it.
    pub fn discover<D>(dom: &D, container: &N) -> Option<Self>
    where
        D: ElementLocator<Node = N>,
    {
        let Some(filter_list) = dom.find_first(container, Role::FilterList) else {
            tracing::debug!("tag filter container without a filter list; skipping");
            return None;
        };

        let content = match dom.next_element_sibling(container) {
            Some(next) if dom.has_role(&next, Role::Content) => next,
            _ => {
                let fallback = dom.find_first(&dom.root(), Role::Content);
                if fallback.is_some() {
                    tracing::debug!("content region not adjacent; using first one on the page");
                }
                fallback?
            }
        };

        let buttons = dom.find_all(&filter_list, Role::FilterButton);
        let items = dom.find_all(&content, Role::Item);
        let year_sections = dom
            .find_all(&content, Role::YearSection)
            .into_iter()
            .map(|node| YearSection {
                items: dom.find_all(&node, Role::Item),
                node,
            })
            .collect();
        let no_results = dom.find_first(&content, Role::NoResults);

        tracing::debug!(
            buttons = buttons.len(),
            items = items.len(),
            "tag filter group initialized"
        );

        Some(Self {
            container: container.clone(),
            filter_list,
            content,
            buttons,
            items,
            year_sections,
            no_results,
        })
    }

    pub fn select_tag<D>(&self, dom: &D, tag: &str) -> FilterOutcome
    where
        D: ElementLocator<Node = N>,
    {
        let mut visible = 0usize;
        for item in &self.items {
            let raw = dom.attribute(item, ATTR_TAGS).unwrap_or_default();
            let is_match = item_matches(&raw, tag);
            dom.set_hidden(item, !is_match);
            if is_match {
                visible += 1;
            }
        }

        for section in &self.year_sections {
            let has_visible = section.items.iter().any(|item| !dom.is_hidden(item));
            dom.set_hidden(&section.node, !has_visible);
        }

        if let Some(no_results) = &self.no_results {
            dom.set_hidden(no_results, visible > 0);
        }

        FilterOutcome {
            visible,
            total: self.items.len(),
        }
    }

    /// Handles a click somewhere inside the filter list. Clicks that do not
    /// land on (or inside) one of the group's buttons are ignored.
    pub fn on_button_click<D>(&self, dom: &D, target: &N) -> Option<FilterOutcome>
    where
        D: ElementLocator<Node = N>,
    {
        let button = dom.closest(target, Role::FilterButton)?;
        if !self.buttons.contains(&button) {
            return None;
        }
        self.set_active_button(dom, &button);
        let tag = dom.attribute(&button, ATTR_TAG).unwrap_or_default();
        Some(self.select_tag(dom, &tag))
    }

    fn set_active_button<D>(&self, dom: &D, active: &N)
    where
        D: ElementLocator<Node = N>,
    {
        for button in &self.buttons {
            dom.set_class(button, CLASS_ACTIVE, button == active);
        }
    }

    pub fn find_button<D>(&self, dom: &D, tag: &str) -> Option<N>
    where
        D: ElementLocator<Node = N>,
    {
        self.buttons
            .iter()
            .find(|b| dom.attribute(b, ATTR_TAG).as_deref() == Some(tag))
            .cloned()
    }

    pub fn active_tag<D>(&self, dom: &D) -> Option<String>
    where
        D: ElementLocator<Node = N>,
    {
        self.buttons
            .iter()
            .find(|b| dom.has_class(b, CLASS_ACTIVE))
            .and_then(|b| dom.attribute(b, ATTR_TAG))
    }

    /// Distinct button tags, in button order.
    pub fn tags<D>(&self, dom: &D) -> Vec<String>
    where
        D: ElementLocator<Node = N>,
    {
        let mut out: Vec<String> = Vec::new();
        for button in &self.buttons {
            if let Some(tag) = dom.attribute(button, ATTR_TAG) {
                if !out.contains(&tag) {
                    out.push(tag);
                }
            }
        }
        out
    }
}

/// All filter groups found on a page.
pub struct TagFilterController<N> {
    groups: Vec<FilterGroup<N>>,
}

impl<N: Clone + PartialEq> TagFilterController<N> {
    pub fn init<D>(dom: &D) -> Self
    where
        D: ElementLocator<Node = N>,
    {
        let groups: Vec<_> = dom
            .find_all(&dom.root(), Role::FilterGroup)
            .iter()
            .filter_map(|container| FilterGroup::discover(dom, container))
            .collect();
        tracing::debug!(groups = groups.len(), "tag filters initialized");
        Self { groups }
    }

    pub fn groups(&self) -> &[FilterGroup<N>] {
        &self.groups
    }

    /// Routes a click to the group whose filter list contains `target`.
    pub fn click<D>(&self, dom: &D, target: &N) -> Option<FilterOutcome>
    where
        D: ElementLocator<Node = N>,
    {
        self.groups
            .iter()
            .find(|g| dom.contains(&g.filter_list, target))
            .and_then(|g| g.on_button_click(dom, target))
    }

    /// Clicks the button carrying `tag` in every group that has one.
    pub fn select_in_all<D>(&self, dom: &D, tag: &str) -> Vec<FilterOutcome>
    where
        D: ElementLocator<Node = N>,
    {
        self.groups
            .iter()
            .filter_map(|g| {
                let button = g.find_button(dom, tag)?;
                g.on_button_click(dom, &button)
            })
            .collect()
    }
}
