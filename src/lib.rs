mod builtin;
mod cli;
pub mod dom;
mod html;
mod listing;
pub mod page;
mod progress;
pub mod tag_filter;
pub mod theme;

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context as _;
use cli::Args;

pub use cli::ProgressMode;
pub use cli::Args as CliArgs;
pub use html::build_list_page;
pub use listing::{Entry, Listing};
pub use page::Page;
pub use tag_filter::{ALL_TAGS, FilterOutcome, TagFilterController};
pub use theme::{FileStore, MemoryStore, PreferenceStore, SystemThemeSignal, Theme};

/// Preference store picked on the command line.
#[derive(Debug, Clone)]
pub enum Store {
    Memory(MemoryStore),
    File(FileStore),
}

impl PreferenceStore for Store {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        match self {
            Store::Memory(s) => s.get(key),
            Store::File(s) => s.get(key),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match self {
            Store::Memory(s) => s.set(key, value),
            Store::File(s) => s.set(key, value),
        }
    }
}

pub fn run(args: Args) -> anyhow::Result<()> {
    use std::io::IsTerminal as _;

    let progress_enabled = match args.progress {
        ProgressMode::Always => true,
        ProgressMode::Never => false,
        ProgressMode::Auto => std::io::stderr().is_terminal(),
    };
    let progress = progress::Progress::new(progress_enabled);

    let source = load_source(&args)?;
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("create {}", args.out.display()))?;

    let store = match &args.theme_store {
        Some(path) => Store::File(FileStore::new(path, &args.origin)),
        None => Store::Memory(MemoryStore::new()),
    };

    let index = Page::load(&source, store, SystemThemeSignal::new(args.prefers_dark));
    if index.filters().groups().is_empty() {
        tracing::warn!("page has no tag filter; writing it unfiltered");
    }
    if args.toggle_theme {
        let theme = index.toggle_theme();
        tracing::info!(%theme, "theme toggled");
    }
    if let Some(tag) = &args.tag {
        let outcomes = index.select_tag(tag);
        if outcomes.is_empty() {
            tracing::warn!(tag = %tag, "no filter button for tag");
        }
    }

    let tags: Vec<String> = if args.all_tags {
        index
            .filters()
            .groups()
            .iter()
            .flat_map(|g| g.tags(index.document()))
            .filter(|t| t != ALL_TAGS)
            .fold(Vec::new(), |mut acc, t| {
                if !acc.contains(&t) {
                    acc.push(t);
                }
                acc
            })
    } else {
        Vec::new()
    };
    progress.set_pages_total(1 + tags.len());

    let index_path = args.out.join("index.html");
    write_page(&index, &index_path)?;
    progress.page_done("index.html");

    // Tag pages start from the unmodified source with whatever preference the
    // index page left behind.
    let store = index.with_store(Store::clone);
    let mut used_slugs = BTreeSet::new();
    for tag in &tags {
        let page = Page::load(
            &source,
            store.clone(),
            SystemThemeSignal::new(args.prefers_dark),
        );
        page.select_tag(tag);
        let name = format!("{}.html", unique_slug(tag, &mut used_slugs));
        write_page(&page, &args.out.join("tags").join(&name))?;
        progress.page_done(&name);
    }

    progress.finish();
    Ok(())
}

fn load_source(args: &Args) -> anyhow::Result<String> {
    match (&args.input, &args.page) {
        (Some(input), None) => {
            let bytes =
                std::fs::read(input).with_context(|| format!("read {}", input.display()))?;
            let listing: Listing = serde_json::from_slice(&bytes).context("parse listing json")?;
            tracing::info!(entries = listing.entries.len(), "building list page");
            Ok(build_list_page(&listing, args.title.as_deref()))
        }
        (None, Some(page)) => {
            if args.title.is_some() {
                tracing::warn!("--page is set; ignoring --title");
            }
            std::fs::read_to_string(page).with_context(|| format!("read {}", page.display()))
        }
        _ => anyhow::bail!("pass exactly one of --input or --page"),
    }
}

fn write_page<S: PreferenceStore + 'static>(page: &Page<S>, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
    }
    let html = page.to_html()?;
    std::fs::write(path, html).with_context(|| format!("write {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote page");
    Ok(())
}

/// File-name-safe form of a tag.
pub fn tag_slug(tag: &str) -> String {
    let slug: String = tag
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    if slug.is_empty() { "tag".to_string() } else { slug }
}

/// `tag_slug`, suffixed with `-2`, `-3`, ... when an earlier tag already
/// produced the same slug.
fn unique_slug(tag: &str, used: &mut BTreeSet<String>) -> String {
    let base = tag_slug(tag);
    let mut slug = base.clone();
    let mut n = 2usize;
    while used.contains(&slug) {
        slug = format!("{base}-{n}");
        n += 1;
    }
    if slug != base {
        tracing::warn!(tag = %tag, file = %slug, "tag file name clashes with another tag");
    }
    used.insert(slug.clone());
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_are_file_safe() {
        assert_eq!(tag_slug("Rust"), "rust");
        assert_eq!(tag_slug("c++ / systems"), "c-----systems");
        assert_eq!(tag_slug("  "), "tag");
    }

    #[test]
    fn clashing_slugs_get_suffixes() {
        let mut used = BTreeSet::new();
        assert_eq!(unique_slug("Go", &mut used), "go");
        assert_eq!(unique_slug("go", &mut used), "go-2");
        assert_eq!(unique_slug("c++", &mut used), "c--");
        assert_eq!(unique_slug("c--", &mut used), "c---2");
        assert_eq!(unique_slug("GO", &mut used), "go-3");
    }
}
