//! Dark/light theme handling.
//!
//! The applied theme lives in a document-level `data-theme` attribute. A theme
//! chosen by toggling is persisted and becomes sticky: later OS preference
//! changes no longer touch the document.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;
use std::str::FromStr;

use anyhow::Context as _;
use url::Url;

use crate::dom::{ATTR_THEME, ElementLocator as _, HtmlDocument};

pub const THEME_STORAGE_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(self) -> Theme {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn from_prefers_dark(is_dark: bool) -> Theme {
        if is_dark { Theme::Dark } else { Theme::Light }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => anyhow::bail!("unknown theme {other:?}"),
        }
    }
}

/// Durable key/value storage for the theme preference.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON file holding one key/value map per origin.
///
/// ```json
/// { "https://blog.example.com": { "theme": "dark" } }
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    origin: String,
}

type OriginMap = BTreeMap<String, BTreeMap<String, String>>;

impl FileStore {
    pub fn new(path: impl Into<PathBuf>, origin: &Url) -> Self {
        Self {
            path: path.into(),
            origin: origin.origin().ascii_serialization(),
        }
    }

    fn load(&self) -> anyhow::Result<OriginMap> {
        if !self.path.exists() {
            return Ok(OriginMap::new());
        }
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("parse {}", self.path.display()))
    }
}

impl PreferenceStore for FileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let map = self.load()?;
        Ok(map.get(&self.origin).and_then(|m| m.get(key)).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut map = self.load()?;
        map.entry(self.origin.clone())
            .or_default()
            .insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(&map).context("serialize preferences")?;
        std::fs::write(&self.path, json).with_context(|| format!("write {}", self.path.display()))
    }
}

type Listener = Box<dyn FnMut(bool)>;

/// The OS "prefers dark" media query and its change notifications.
///
/// `None` means the environment cannot answer, which resolves to light.
#[derive(Clone, Default)]
pub struct SystemThemeSignal {
    inner: Rc<RefCell<SignalState>>,
}

#[derive(Default)]
struct SignalState {
    matches: Option<bool>,
    listeners: Vec<Listener>,
}

impl SystemThemeSignal {
    pub fn new(matches: Option<bool>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SignalState {
                matches,
                listeners: Vec::new(),
            })),
        }
    }

    pub fn matches(&self) -> Option<bool> {
        self.inner.borrow().matches
    }

    pub fn subscribe(&self, listener: impl FnMut(bool) + 'static) {
        self.inner.borrow_mut().listeners.push(Box::new(listener));
    }

    /// Records a new OS value and notifies subscribers.
    pub fn set_matches(&self, is_dark: bool) {
        let mut listeners = {
            let mut state = self.inner.borrow_mut();
            state.matches = Some(is_dark);
            std::mem::take(&mut state.listeners)
        };
        for listener in listeners.iter_mut() {
            listener(is_dark);
        }
        // Listeners may subscribe while being notified.
        let mut state = self.inner.borrow_mut();
        listeners.append(&mut state.listeners);
        state.listeners = listeners;
    }
}

/// Where the applied theme is written for styling to pick up.
pub trait ThemeTarget {
    fn theme_attribute(&self) -> Option<String>;
    fn set_theme_attribute(&self, theme: Theme);
}

impl ThemeTarget for HtmlDocument {
    fn theme_attribute(&self) -> Option<String> {
        self.attribute(&self.document_element()?, ATTR_THEME)
    }

    fn set_theme_attribute(&self, theme: Theme) {
        if let Some(root) = self.document_element() {
            self.set_attribute(&root, ATTR_THEME, theme.as_str());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeState {
    pub applied: Theme,
    pub sticky: Option<Theme>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeEvent {
    /// Page load with the current OS answer.
    Load { prefers_dark: Option<bool> },
    SystemChange(bool),
    Toggle,
}

/// State transition for the theme machine. A sticky preference always wins
/// over the OS signal; toggling always makes the result sticky.
pub fn next_theme(state: ThemeState, event: ThemeEvent) -> ThemeState {
    match event {
        ThemeEvent::Load { prefers_dark } => ThemeState {
            applied: state
                .sticky
                .unwrap_or_else(|| Theme::from_prefers_dark(prefers_dark.unwrap_or(false))),
            sticky: state.sticky,
        },
        ThemeEvent::SystemChange(is_dark) => match state.sticky {
            Some(_) => state,
            None => ThemeState {
                applied: Theme::from_prefers_dark(is_dark),
                sticky: None,
            },
        },
        ThemeEvent::Toggle => {
            let next = state.applied.toggled();
            ThemeState {
                applied: next,
                sticky: Some(next),
            }
        }
    }
}

pub struct ThemeController<S> {
    store: S,
    signal: SystemThemeSignal,
}

impl<S: PreferenceStore> ThemeController<S> {
    pub fn new(store: S, signal: SystemThemeSignal) -> Self {
        Self { store, signal }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn signal(&self) -> &SystemThemeSignal {
        &self.signal
    }

    /// The persisted preference, if any. Unreadable or unknown values count as
    /// no preference.
    pub fn sticky_preference(&self) -> Option<Theme> {
        let raw = match self.store.get(THEME_STORAGE_KEY) {
            Ok(raw) => raw?,
            Err(err) => {
                tracing::warn!(error = %err, "theme preference unreadable");
                return None;
            }
        };
        match raw.parse() {
            Ok(theme) => Some(theme),
            Err(_) => {
                tracing::warn!(value = %raw, "ignoring unknown stored theme");
                None
            }
        }
    }

    pub fn resolve_initial_theme(&self) -> Theme {
        next_theme(
            ThemeState {
                applied: Theme::Light,
                sticky: self.sticky_preference(),
            },
            ThemeEvent::Load {
                prefers_dark: self.signal.matches(),
            },
        )
        .applied
    }

    pub fn apply_theme(&self, target: &impl ThemeTarget, theme: Theme) {
        tracing::debug!(%theme, "apply theme");
        target.set_theme_attribute(theme);
    }

    /// Page-load: apply the resolved theme and return it.
    pub fn init(&self, target: &impl ThemeTarget) -> Theme {
        let theme = self.resolve_initial_theme();
        self.apply_theme(target, theme);
        theme
    }

    /// Returns the theme applied by this call, or `None` when a sticky
    /// preference made the signal irrelevant.
    pub fn on_system_preference_change(
        &self,
        target: &impl ThemeTarget,
        is_dark: bool,
    ) -> Option<Theme> {
        let state = ThemeState {
            applied: self.applied(target),
            sticky: self.sticky_preference(),
        };
        if state.sticky.is_some() {
            tracing::debug!(is_dark, "system theme change ignored; user preference set");
            return None;
        }
        let next = next_theme(state, ThemeEvent::SystemChange(is_dark));
        self.apply_theme(target, next.applied);
        Some(next.applied)
    }

    pub fn toggle_theme(&mut self, target: &impl ThemeTarget) -> Theme {
        let state = ThemeState {
            applied: self.applied(target),
            sticky: self.sticky_preference(),
        };
        let next = next_theme(state, ThemeEvent::Toggle);
        self.apply_theme(target, next.applied);
        if let Err(err) = self.store.set(THEME_STORAGE_KEY, next.applied.as_str()) {
            tracing::warn!(error = %err, "failed to persist theme preference");
        }
        next.applied
    }

    /// The theme currently on the target; anything but `dark` reads as light.
    fn applied(&self, target: &impl ThemeTarget) -> Theme {
        match target.theme_attribute().as_deref() {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> HtmlDocument {
        HtmlDocument::parse("<html><body></body></html>")
    }

    struct BrokenStore;

    impl PreferenceStore for BrokenStore {
        fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("storage disabled")
        }

        fn set(&mut self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("quota exceeded")
        }
    }

    #[test]
    fn unreadable_store_falls_back_to_os() {
        let ctl = ThemeController::new(BrokenStore, SystemThemeSignal::new(Some(true)));
        assert_eq!(ctl.sticky_preference(), None);
        assert_eq!(ctl.resolve_initial_theme(), Theme::Dark);
    }

    #[test]
    fn unwritable_store_still_flips_theme() {
        let doc = doc();
        let mut ctl = ThemeController::new(BrokenStore, SystemThemeSignal::new(Some(false)));
        assert_eq!(ctl.init(&doc), Theme::Light);
        assert_eq!(ctl.toggle_theme(&doc), Theme::Dark);
        assert_eq!(doc.theme_attribute().as_deref(), Some("dark"));
        assert_eq!(ctl.toggle_theme(&doc), Theme::Light);
        assert_eq!(doc.theme_attribute().as_deref(), Some("light"));

        // Nothing was persisted, so the OS signal still applies.
        assert_eq!(ctl.on_system_preference_change(&doc, true), Some(Theme::Dark));
    }

    #[test]
    fn corrupt_file_store_reads_as_no_preference() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("theme.json");
        std::fs::write(&path, "{ not json").unwrap();
        let origin = Url::parse("https://blog.example.com/").unwrap();

        let store = FileStore::new(&path, &origin);
        assert!(store.get(THEME_STORAGE_KEY).is_err());

        let doc = doc();
        let mut ctl = ThemeController::new(store, SystemThemeSignal::new(Some(true)));
        assert_eq!(ctl.init(&doc), Theme::Dark);
        assert_eq!(ctl.toggle_theme(&doc), Theme::Light);
        assert_eq!(doc.theme_attribute().as_deref(), Some("light"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn initial_theme_follows_os_without_preference() {
        let ctl = ThemeController::new(MemoryStore::new(), SystemThemeSignal::new(Some(true)));
        assert_eq!(ctl.resolve_initial_theme(), Theme::Dark);

        let ctl = ThemeController::new(MemoryStore::new(), SystemThemeSignal::new(None));
        assert_eq!(ctl.resolve_initial_theme(), Theme::Light);
    }

    #[test]
    fn stored_preference_beats_os() {
        let mut store = MemoryStore::new();
        store.set(THEME_STORAGE_KEY, "light").unwrap();
        let ctl = ThemeController::new(store, SystemThemeSignal::new(Some(true)));
        assert_eq!(ctl.resolve_initial_theme(), Theme::Light);
    }

    #[test]
    fn garbage_in_store_is_no_preference() {
        let mut store = MemoryStore::new();
        store.set(THEME_STORAGE_KEY, "sepia").unwrap();
        let ctl = ThemeController::new(store, SystemThemeSignal::new(Some(true)));
        assert_eq!(ctl.sticky_preference(), None);
        assert_eq!(ctl.resolve_initial_theme(), Theme::Dark);
    }

    #[test]
    fn toggle_is_its_own_inverse_and_sticky() {
        let doc = doc();
        let mut ctl = ThemeController::new(MemoryStore::new(), SystemThemeSignal::new(Some(true)));
        assert_eq!(ctl.init(&doc), Theme::Dark);

        assert_eq!(ctl.toggle_theme(&doc), Theme::Light);
        assert_eq!(doc.theme_attribute().as_deref(), Some("light"));
        assert_eq!(ctl.store().get(THEME_STORAGE_KEY).unwrap().as_deref(), Some("light"));

        assert_eq!(ctl.on_system_preference_change(&doc, true), None);
        assert_eq!(doc.theme_attribute().as_deref(), Some("light"));

        assert_eq!(ctl.toggle_theme(&doc), Theme::Dark);
        assert_eq!(doc.theme_attribute().as_deref(), Some("dark"));
    }

    #[test]
    fn system_change_applies_until_user_chooses() {
        let doc = doc();
        let ctl = ThemeController::new(MemoryStore::new(), SystemThemeSignal::new(Some(false)));
        ctl.init(&doc);
        assert_eq!(ctl.on_system_preference_change(&doc, true), Some(Theme::Dark));
        assert_eq!(doc.theme_attribute().as_deref(), Some("dark"));
    }

    #[test]
    fn toggle_without_attribute_goes_dark() {
        let doc = doc();
        let mut ctl = ThemeController::new(MemoryStore::new(), SystemThemeSignal::default());
        assert_eq!(ctl.toggle_theme(&doc), Theme::Dark);
    }

    #[test]
    fn transition_table() {
        let free = ThemeState {
            applied: Theme::Light,
            sticky: None,
        };
        assert_eq!(
            next_theme(free, ThemeEvent::SystemChange(true)).applied,
            Theme::Dark
        );
        let pinned = next_theme(free, ThemeEvent::Toggle);
        assert_eq!(pinned.sticky, Some(Theme::Dark));
        assert_eq!(next_theme(pinned, ThemeEvent::SystemChange(false)), pinned);
        assert_eq!(
            next_theme(pinned, ThemeEvent::Load { prefers_dark: Some(false) }).applied,
            Theme::Dark
        );
    }

    #[test]
    fn signal_notifies_subscribers() {
        let signal = SystemThemeSignal::new(Some(false));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        signal.subscribe(move |v| sink.borrow_mut().push(v));
        signal.set_matches(true);
        signal.set_matches(false);
        assert_eq!(*seen.borrow(), vec![true, false]);
        assert_eq!(signal.matches(), Some(false));
    }

    #[test]
    fn file_store_scopes_by_origin() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("prefs/theme.json");
        let a = Url::parse("https://a.example.com/posts/").unwrap();
        let b = Url::parse("https://b.example.com/").unwrap();

        let mut store_a = FileStore::new(&path, &a);
        assert_eq!(store_a.get(THEME_STORAGE_KEY).unwrap(), None);
        store_a.set(THEME_STORAGE_KEY, "dark").unwrap();

        let reopened = FileStore::new(&path, &Url::parse("https://a.example.com/til/").unwrap());
        assert_eq!(reopened.get(THEME_STORAGE_KEY).unwrap().as_deref(), Some("dark"));
        assert_eq!(FileStore::new(&path, &b).get(THEME_STORAGE_KEY).unwrap(), None);
    }
}
