//! A loaded page: its document, tag filters and theme, wired the way the page
//! load event wires them.

use std::cell::RefCell;
use std::rc::Rc;

use kuchiki::NodeRef;

use crate::dom::HtmlDocument;
use crate::tag_filter::{FilterOutcome, TagFilterController};
use crate::theme::{PreferenceStore, SystemThemeSignal, Theme, ThemeController, ThemeTarget};

/// Id of the button that toggles the theme.
pub const THEME_TOGGLE_ID: &str = "theme-toggle";

pub struct Page<S> {
    document: Rc<HtmlDocument>,
    filters: TagFilterController<NodeRef>,
    theme: Rc<RefCell<ThemeController<S>>>,
}

impl<S: PreferenceStore + 'static> Page<S> {
    /// Parses `html`, initializes every tag filter group, applies the initial
    /// theme and starts following OS theme changes.
    pub fn load(html: &str, store: S, signal: SystemThemeSignal) -> Self {
        let document = Rc::new(HtmlDocument::parse(html));

        let controller = ThemeController::new(store, signal.clone());
        let theme = controller.init(&*document);
        tracing::debug!(%theme, "initial theme");
        let theme_ctl = Rc::new(RefCell::new(controller));

        let weak_doc = Rc::downgrade(&document);
        let weak_ctl = Rc::downgrade(&theme_ctl);
        signal.subscribe(move |is_dark| {
            let (Some(doc), Some(ctl)) = (weak_doc.upgrade(), weak_ctl.upgrade()) else {
                return;
            };
            ctl.borrow().on_system_preference_change(&*doc, is_dark);
        });

        let filters = TagFilterController::init(&*document);

        Self {
            document,
            filters,
            theme: theme_ctl,
        }
    }

    pub fn document(&self) -> &HtmlDocument {
        &self.document
    }

    pub fn filters(&self) -> &TagFilterController<NodeRef> {
        &self.filters
    }

    /// Dispatches a click on `target`: the theme toggle button, a filter
    /// button, or nothing.
    pub fn click(&self, target: &NodeRef) -> Option<FilterOutcome> {
        let on_toggle = target.inclusive_ancestors().any(|n| {
            n.as_element()
                .is_some_and(|e| e.attributes.borrow().get("id") == Some(THEME_TOGGLE_ID))
        });
        if on_toggle {
            self.toggle_theme();
            return None;
        }
        self.filters.click(&*self.document, target)
    }

    pub fn select_tag(&self, tag: &str) -> Vec<FilterOutcome> {
        self.filters.select_in_all(&*self.document, tag)
    }

    pub fn toggle_theme(&self) -> Theme {
        self.theme.borrow_mut().toggle_theme(&*self.document)
    }

    /// Simulates the OS reporting a new dark-mode preference.
    pub fn system_theme_changed(&self, is_dark: bool) {
        let signal = self.theme.borrow().signal().clone();
        signal.set_matches(is_dark);
    }

    pub fn theme(&self) -> Option<Theme> {
        self.document.theme_attribute()?.parse().ok()
    }

    /// The preference store, e.g. to carry a sticky theme to the next page.
    pub fn with_store<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(self.theme.borrow().store())
    }

    pub fn to_html(&self) -> anyhow::Result<String> {
        self.document.to_html()
    }
}
