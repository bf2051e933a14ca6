use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use url::Url;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ProgressMode {
    /// Enable progress UI when stderr is a TTY.
    Auto,
    /// Always enable progress UI (even when piped).
    Always,
    /// Never show progress UI.
    Never,
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// JSON listing of entries (`{"title": ..., "entries": [{"title", "url", "date", "tags"}]}`)
    /// to build a filterable list page from.
    #[arg(long, conflicts_with = "page", required_unless_present = "page")]
    pub input: Option<PathBuf>,

    /// Existing HTML page carrying `.tag-filter` / `.filtered-content` markup.
    #[arg(long)]
    pub page: Option<PathBuf>,

    /// Page title when building from a listing.
    #[arg(long)]
    pub title: Option<String>,

    /// Output directory. The main page is written as `index.html`.
    #[arg(long, default_value = "out")]
    pub out: PathBuf,

    /// Pre-select this tag on the main page.
    #[arg(long)]
    pub tag: Option<String>,

    /// Also write one pre-filtered page per tag under `tags/`.
    #[arg(long)]
    pub all_tags: bool,

    /// JSON file persisting the theme preference across runs.
    #[arg(long)]
    pub theme_store: Option<PathBuf>,

    /// Origin the theme preference is scoped to.
    #[arg(long, default_value = "http://localhost/")]
    pub origin: Url,

    /// OS dark-mode preference. Omit to treat it as unsupported (light).
    #[arg(long)]
    pub prefers_dark: Option<bool>,

    /// Toggle the theme once after loading; the result becomes sticky.
    #[arg(long)]
    pub toggle_theme: bool,

    /// Progress display: `auto`, `always`, or `never`.
    #[arg(long, value_enum, default_value = "auto")]
    pub progress: ProgressMode,
}
