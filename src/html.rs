use std::collections::{BTreeMap, BTreeSet};

use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::builtin;
use crate::listing::{Entry, Listing};
use crate::page::THEME_TOGGLE_ID;
use crate::tag_filter::ALL_TAGS;

const DEFAULT_TITLE: &str = "Posts";

/// Builds a list page: a tag filter, the entries grouped by year (newest
/// first), a hidden "no results" message and a theme toggle.
pub fn build_list_page(listing: &Listing, title_override: Option<&str>) -> String {
    let title = title_override
        .or(listing.title.as_deref())
        .unwrap_or(DEFAULT_TITLE);
    let tags = distinct_tags(&listing.entries);
    let years = group_by_year(&listing.entries);

    let markup: Markup = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                meta name="color-scheme" content="light dark";
                title { (title) }
                style { (PreEscaped(builtin::BUILTIN_CSS)) }
            }
            body {
                header class="site-header" {
                    h1 { (title) }
                    button type="button" id=(THEME_TOGGLE_ID) class="theme-toggle" { "Theme" }
                }
                main class="site-main" {
                    (render_filter(&tags))
                    section class="filtered-content" {
                        @for (year, entries) in years.iter().rev() {
                            (render_year(*year, entries))
                        }
                        p class="no-results" hidden { "No posts match this tag." }
                    }
                }
            }
        }
    };
    markup.into_string()
}

fn render_filter(tags: &BTreeSet<&str>) -> Markup {
    html! {
        nav class="tag-filter" {
            ul class="tag-filter-list" {
                li {
                    button type="button" class="tag-filter-btn active" data-tag=(ALL_TAGS) { "All" }
                }
                @for tag in tags {
                    li {
                        button type="button" class="tag-filter-btn" data-tag=(tag) { (tag) }
                    }
                }
            }
        }
    }
}

fn render_year(year: Option<u32>, entries: &[&Entry]) -> Markup {
    html! {
        div class="posts-year" {
            h2 {
                @if let Some(year) = year {
                    (year)
                } @else {
                    "Undated"
                }
            }
            ul {
                @for entry in entries {
                    (render_entry(entry))
                }
            }
        }
    }
}

fn render_entry(entry: &Entry) -> Markup {
    let date = entry.date.as_deref().map(|d| d.get(..10).unwrap_or(d));
    html! {
        li class="item" data-tags=(entry.clean_tags().join(",")) {
            @if let Some(date) = date {
                time datetime=(date) { (date) }
                " "
            }
            a href=(entry.url) { (entry.title) }
        }
    }
}

fn distinct_tags(entries: &[Entry]) -> BTreeSet<&str> {
    entries.iter().flat_map(|e| e.clean_tags()).collect()
}

/// Entries per year, newest date first inside each year. Undated entries sort
/// below every year.
fn group_by_year(entries: &[Entry]) -> BTreeMap<Option<u32>, Vec<&Entry>> {
    let mut years: BTreeMap<Option<u32>, Vec<&Entry>> = BTreeMap::new();
    for entry in entries {
        years.entry(entry.year()).or_default().push(entry);
    }
    for list in years.values_mut() {
        list.sort_by(|a, b| b.date.cmp(&a.date));
    }
    years
}
