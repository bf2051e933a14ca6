//! Element locator capability over a parsed HTML tree.
//!
//! The filter and theme logic only talk to [`ElementLocator`]; [`HtmlDocument`]
//! is the kuchiki-backed implementation used by the page and the CLI.

use anyhow::Context as _;
use kuchiki::traits::TendrilSink as _;
use kuchiki::{NodeRef, Selectors};

pub const ATTR_TAGS: &str = "data-tags";
pub const ATTR_TAG: &str = "data-tag";
pub const ATTR_THEME: &str = "data-theme";
pub const ATTR_HIDDEN: &str = "hidden";
pub const CLASS_ACTIVE: &str = "active";

/// Structural markers of the page contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    FilterGroup,
    FilterList,
    FilterButton,
    Content,
    Item,
    YearSection,
    NoResults,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::FilterGroup,
        Role::FilterList,
        Role::FilterButton,
        Role::Content,
        Role::Item,
        Role::YearSection,
        Role::NoResults,
    ];

    pub fn selector(self) -> &'static str {
        match self {
            Role::FilterGroup => ".tag-filter",
            Role::FilterList => ".tag-filter-list",
            Role::FilterButton => ".tag-filter-btn",
            Role::Content => ".filtered-content",
            Role::Item => ".item[data-tags]",
            Role::YearSection => ".posts-year",
            Role::NoResults => ".no-results",
        }
    }
}

pub trait ElementLocator {
    type Node: Clone + PartialEq;

    fn root(&self) -> Self::Node;

    /// Matching descendants of `scope` in document order, `scope` excluded.
    fn find_all(&self, scope: &Self::Node, role: Role) -> Vec<Self::Node>;

    fn find_first(&self, scope: &Self::Node, role: Role) -> Option<Self::Node> {
        self.find_all(scope, role).into_iter().next()
    }

    fn has_role(&self, node: &Self::Node, role: Role) -> bool;

    fn next_element_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str);

    fn is_hidden(&self, node: &Self::Node) -> bool;

    fn set_hidden(&self, node: &Self::Node, hidden: bool);

    fn has_class(&self, node: &Self::Node, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    fn set_class(&self, node: &Self::Node, class: &str, on: bool);

    /// Nearest inclusive ancestor of `node` carrying `role`.
    fn closest(&self, node: &Self::Node, role: Role) -> Option<Self::Node> {
        let mut current = Some(node.clone());
        while let Some(n) = current {
            if self.has_role(&n, role) {
                return Some(n);
            }
            current = self.parent(&n);
        }
        None
    }

    fn contains(&self, ancestor: &Self::Node, node: &Self::Node) -> bool {
        let mut current = Some(node.clone());
        while let Some(n) = current {
            if &n == ancestor {
                return true;
            }
            current = self.parent(&n);
        }
        false
    }
}

pub struct HtmlDocument {
    root: NodeRef,
    roles: Vec<(Role, Selectors)>,
}

impl HtmlDocument {
    pub fn parse(html: &str) -> Self {
        let roles = Role::ALL
            .into_iter()
            .filter_map(|role| Selectors::compile(role.selector()).ok().map(|s| (role, s)))
            .collect();
        Self {
            root: kuchiki::parse_html().one(html),
            roles,
        }
    }

    fn role_selectors(&self, role: Role) -> Option<&Selectors> {
        self.roles.iter().find(|(r, _)| *r == role).map(|(_, s)| s)
    }

    /// The `<html>` element, where the theme attribute lives.
    pub fn document_element(&self) -> Option<NodeRef> {
        self.root
            .select_first("html")
            .ok()
            .map(|n| n.as_node().clone())
    }

    /// Elements matching an arbitrary CSS selector, in document order.
    pub fn select(&self, css: &str) -> Vec<NodeRef> {
        match self.root.select(css) {
            Ok(nodes) => nodes.map(|n| n.as_node().clone()).collect(),
            Err(()) => {
                tracing::warn!(selector = css, "invalid selector");
                Vec::new()
            }
        }
    }

    pub fn select_first(&self, css: &str) -> Option<NodeRef> {
        self.select(css).into_iter().next()
    }

    pub fn to_html(&self) -> anyhow::Result<String> {
        let mut out = Vec::new();
        self.root.serialize(&mut out).context("serialize document")?;
        String::from_utf8(out).context("document html not utf-8")
    }
}

impl ElementLocator for HtmlDocument {
    type Node = NodeRef;

    fn root(&self) -> NodeRef {
        self.root.clone()
    }

    fn find_all(&self, scope: &NodeRef, role: Role) -> Vec<NodeRef> {
        let Some(selectors) = self.role_selectors(role) else {
            return Vec::new();
        };
        scope
            .descendants()
            .filter_map(|n| n.into_element_ref())
            .filter(|e| selectors.matches(e))
            .map(|e| e.as_node().clone())
            .collect()
    }

    fn has_role(&self, node: &NodeRef, role: Role) -> bool {
        let Some(element) = node.clone().into_element_ref() else {
            return false;
        };
        self.role_selectors(role)
            .is_some_and(|s| s.matches(&element))
    }

    fn next_element_sibling(&self, node: &NodeRef) -> Option<NodeRef> {
        node.following_siblings().find(|n| n.as_element().is_some())
    }

    fn parent(&self, node: &NodeRef) -> Option<NodeRef> {
        node.parent()
    }

    fn attribute(&self, node: &NodeRef, name: &str) -> Option<String> {
        let element = node.as_element()?;
        element.attributes.borrow().get(name).map(|v| v.to_string())
    }

    fn set_attribute(&self, node: &NodeRef, name: &str, value: &str) {
        if let Some(element) = node.as_element() {
            element
                .attributes
                .borrow_mut()
                .insert(name, value.to_string());
        }
    }

    fn is_hidden(&self, node: &NodeRef) -> bool {
        node.as_element()
            .is_some_and(|e| e.attributes.borrow().contains(ATTR_HIDDEN))
    }

    fn set_hidden(&self, node: &NodeRef, hidden: bool) {
        let Some(element) = node.as_element() else {
            return;
        };
        let mut attrs = element.attributes.borrow_mut();
        if hidden {
            attrs.insert(ATTR_HIDDEN, String::new());
        } else {
            attrs.remove(ATTR_HIDDEN);
        }
    }

    fn set_class(&self, node: &NodeRef, class: &str, on: bool) {
        let Some(element) = node.as_element() else {
            return;
        };
        let mut attrs = element.attributes.borrow_mut();
        let current = attrs.get("class").unwrap_or("").to_string();
        let mut classes: Vec<&str> = current
            .split_whitespace()
            .filter(|c| *c != class)
            .collect();
        if on {
            classes.push(class);
        }
        if classes.is_empty() {
            attrs.remove("class");
        } else {
            attrs.insert("class", classes.join(" "));
        }
    }
}
