//! The directory index page.
//!
//! Markup is kept compatible with ComicGlass-style readers, which scrape the
//! `booktitle`, `booksize` and `bookdate` attributes off each link.

use crate::error::{ErrorKind, Result};
use comicglass_config::ListingOrder;
use comicglass_storage::{ListingEntry, relative_to};
use exn::ResultExt;
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;
use tracing::instrument;
use upon::{Engine, Template, Value, fmt as upon_fmt};

const INDEX_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta http-equiv="Content-Type" content="text/html; charset=utf-8">
    <title>{{ label }}</title>
  </head>
  <body>
    <h3>{{ label }}</h3>
    <ul>
{% for entry in entries %}{% if entry.dir %}      <li type="circle"><a href="{{ entry.href }}" bookdate="{{ entry.modify_time }}">{{ entry.name }}</a></li>
{% else %}      <li><a href="{{ entry.href }}" booktitle="{{ entry.name }}" booksize="{{ entry.size }}" bookdate="{{ entry.modify_time }}">{{ entry.name }}</a></li>
{% endif %}{% endfor %}    </ul>
  </body>
</html>
"#;

#[derive(Serialize)]
struct IndexContext<'a> {
    label: &'a str,
    entries: Vec<EntryView<'a>>,
}

#[derive(Serialize)]
struct EntryView<'a> {
    name: &'a str,
    dir: bool,
    href: String,
    modify_time: i64,
    size: u64,
}
impl<'a> EntryView<'a> {
    fn new(root: &Path, entry: &'a ListingEntry) -> Self {
        let relative = relative_to(root, &entry.path).unwrap_or(Path::new(&entry.name));
        let href = match entry.is_dir() {
            true => directory_href(relative),
            false => file_href(relative),
        };
        Self { name: &entry.name, dir: entry.is_dir(), href, modify_time: entry.modify_time, size: entry.size }
    }
}

/// `?path=` with the whole relative path as one query-escaped value.
fn directory_href(relative: &Path) -> String {
    format!("?path={}", urlencoding::encode(&slashed(relative)))
}

/// Absolute URL path with each segment escaped on its own.
fn file_href(relative: &Path) -> String {
    let segments: Vec<_> = slashed(relative).split('/').map(|s| urlencoding::encode(s).into_owned()).collect();
    format!("/{}", segments.join("/"))
}

/// The path's components joined with forward slashes, whatever the platform.
fn slashed(path: &Path) -> String {
    path.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/")
}

/// Default formatter for the index page: strings are HTML-escaped, anything
/// else is written as upon would.
fn escape_html(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
    match value {
        Value::String(s) => {
            for c in s.chars() {
                match c {
                    '&' => f.write_str("&amp;")?,
                    '<' => f.write_str("&lt;")?,
                    '>' => f.write_str("&gt;")?,
                    '"' => f.write_str("&quot;")?,
                    '\'' => f.write_str("&#39;")?,
                    c => f.write_char(c)?,
                }
            }
        },
        v => upon_fmt::default(f, v)?,
    };
    Ok(())
}

/// Compiled index template. Output is HTML-escaped by default.
pub struct IndexPage {
    engine: Engine<'static>,
    template: Template<'static>,
}
impl IndexPage {
    pub fn new() -> Result<Self> {
        let mut engine = Engine::new();
        engine.set_default_formatter(&escape_html);
        // Compile the template early so we can fail-fast in construction.
        let template = engine.compile(INDEX_TEMPLATE).or_raise(|| ErrorKind::Template)?;
        Ok(Self { engine, template })
    }

    /// Renders a listing of the directory identified to the user by `label`.
    ///
    /// `root` is the library root; links are built relative to it.
    #[instrument(skip_all, fields(label = %label, entries = entries.len()))]
    pub fn render(&self, label: &str, root: &Path, entries: &[ListingEntry], order: ListingOrder) -> Result<String> {
        let mut entries: Vec<_> = entries.iter().map(|entry| EntryView::new(root, entry)).collect();
        if order == ListingOrder::DirsFirst {
            entries.sort_by_cached_key(|entry| (!entry.dir, entry.name.to_lowercase()));
        }
        let context = IndexContext { label, entries };
        self.template.render(&self.engine, &context).to_string().or_raise(|| ErrorKind::Template)
    }
}
