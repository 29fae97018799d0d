//! Structural extraction from rendered admin pages.
//!
//! Every function takes the serialized document returned by
//! [`RemoteClient::current_document`](crate::contract::RemoteClient::current_document)
//! and never touches the session itself.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::warn;

use crate::node::{NodeType, UnknownNodeType};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The section page has no child listing table.
    #[error("section listing table #subsections-container not found")]
    MissingListing,

    /// A sidebar container expected on the landing page is absent.
    #[error("sidebar container #{0} not found")]
    MissingContainer(&'static str),
}

/// Sidebar container listing layouts on the landing page.
pub const LAYOUTS_CONTAINER: &str = "cms-sidebar-layouts";

/// Sidebar container listing partials on the landing page.
pub const PARTIALS_CONTAINER: &str = "cms-sidebar-partials";

static LISTING_ROWS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("table#subsections-container tbody tr")
        .expect("BUG: hardcoded listing row selector is invalid")
});

static LISTING_TABLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("table#subsections-container")
        .expect("BUG: hardcoded listing table selector is invalid")
});

static CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("BUG: hardcoded selector 'td' is invalid"));

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("BUG: hardcoded selector 'a' is invalid"));

static SECTION_FORM: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("form#edit_cms_section")
        .expect("BUG: hardcoded section form selector is invalid")
});

static SECTION_TOKEN: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"form#edit_cms_section input[name="authenticity_token"]"#)
        .expect("BUG: hardcoded token selector is invalid")
});

static FILE_FORM: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("form#edit_cms_file").expect("BUG: hardcoded file form selector is invalid")
});

static TEMPLATE_FIELDS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div#cms-template-fields-wrapper")
        .expect("BUG: hardcoded template fields selector is invalid")
});

static LAYOUT_LINKS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div#cms-sidebar-layouts a")
        .expect("BUG: hardcoded layout link selector is invalid")
});

static PARTIAL_LINKS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div#cms-sidebar-partials a")
        .expect("BUG: hardcoded partial link selector is invalid")
});

static LAYOUTS_DIV: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div#cms-sidebar-layouts").expect("BUG: hardcoded selector is invalid")
});

static PARTIALS_DIV: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div#cms-sidebar-partials").expect("BUG: hardcoded selector is invalid")
});

// Advanced template fields are rendered collapsed.
static HIDDEN_FIELD_GROUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<ol\s+style="\s*display:\s*none;?\s*">"#)
        .expect("BUG: hardcoded hidden field group pattern is invalid")
});

/// One row of a section's child listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    pub name: String,
    /// Edit link as written in the page, usually relative to the site root.
    pub href: String,
    /// Raw text of the type column.
    pub type_label: String,
}

impl ChildEntry {
    pub fn node_type(&self) -> Result<NodeType, UnknownNodeType> {
        self.type_label.parse()
    }
}

/// One anchor of a flat sidebar listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarEntry {
    pub name: String,
    pub href: String,
}

/// Lists the children of the section page in `document`, in page order.
/// Rows without a link or a type column are skipped.
pub fn child_listing(document: &str) -> Result<Vec<ChildEntry>, ParseError> {
    let html = Html::parse_document(document);
    if html.select(&LISTING_TABLE).next().is_none() {
        return Err(ParseError::MissingListing);
    }

    let mut children = Vec::new();
    for row in html.select(&LISTING_ROWS) {
        let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
        let anchor = cells.first().and_then(|cell| cell.select(&ANCHOR).next());
        let (Some(anchor), Some(type_cell)) = (anchor, cells.get(1)) else {
            warn!(row = %row.html(), "Skipping malformed section listing row");
            continue;
        };
        let Some(href) = anchor.value().attr("href") else {
            warn!(row = %row.html(), "Skipping listing row without a link target");
            continue;
        };
        children.push(ChildEntry {
            name: anchor.text().collect::<String>().trim().to_string(),
            href: href.to_string(),
            type_label: type_cell.text().collect::<String>().trim().to_string(),
        });
    }
    Ok(children)
}

/// Lists the anchors of a sidebar container ([`LAYOUTS_CONTAINER`] or
/// [`PARTIALS_CONTAINER`]). The anchor title is the node name.
pub fn sidebar_listing(
    document: &str,
    container: &'static str,
) -> Result<Vec<SidebarEntry>, ParseError> {
    let (container_selector, link_selector) = match container {
        LAYOUTS_CONTAINER => (&*LAYOUTS_DIV, &*LAYOUT_LINKS),
        PARTIALS_CONTAINER => (&*PARTIALS_DIV, &*PARTIAL_LINKS),
        _ => return Err(ParseError::MissingContainer(container)),
    };

    let html = Html::parse_document(document);
    if html.select(container_selector).next().is_none() {
        return Err(ParseError::MissingContainer(container));
    }

    Ok(html
        .select(link_selector)
        .filter_map(|anchor| {
            let name = anchor.value().attr("title");
            let href = anchor.value().attr("href");
            match (name, href) {
                (Some(name), Some(href)) => Some(SidebarEntry {
                    name: name.to_string(),
                    href: href.to_string(),
                }),
                _ => {
                    warn!(anchor = %anchor.html(), container, "Skipping sidebar link without title or href");
                    None
                }
            }
        })
        .collect())
}

/// Metadata fragment of a node of type `kind`, or `None` when the page does not
/// contain the expected fragment.
pub fn metadata_fragment(document: &str, kind: NodeType) -> Option<String> {
    match kind {
        NodeType::Section => section_form(document),
        NodeType::File => {
            let html = Html::parse_document(document);
            let form = html.select(&FILE_FORM).next()?;
            Some(form.inner_html())
        }
        NodeType::Page | NodeType::Layout | NodeType::Partial => {
            let html = Html::parse_document(document);
            let fields = html.select(&TEMPLATE_FIELDS).next()?;
            Some(
                HIDDEN_FIELD_GROUP
                    .replace_all(&fields.inner_html(), "<ol>")
                    .into_owned(),
            )
        }
    }
}

/// The section edit form without its per-request authenticity token.
fn section_form(document: &str) -> Option<String> {
    let mut html = Html::parse_document(document);
    let tokens: Vec<_> = html.select(&SECTION_TOKEN).map(|input| input.id()).collect();
    for id in tokens {
        if let Some(mut node) = html.tree.get_mut(id) {
            node.detach();
        }
    }
    let form = html.select(&SECTION_FORM).next()?;
    Some(form.inner_html())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECTION_PAGE: &str = r#"
        <html><body>
        <form id="edit_cms_section" action="/p/admin/cms/sections/7">
          <input type="hidden" name="authenticity_token" value="TOKEN-ONE">
          <input type="text" name="cms_section[title]" value="Docs">
        </form>
        <table id="subsections-container">
          <thead><tr><th>Name</th><th>Type</th></tr></thead>
          <tbody>
            <tr><td><a href="/p/admin/cms/sections/8/edit">Guides</a></td><td>Section</td></tr>
            <tr><td><a href="/p/admin/cms/pages/21/edit">Intro</a></td><td> Page </td></tr>
            <tr><td><a href="/p/admin/cms/files/3/edit">logo.png</a></td><td>File</td></tr>
            <tr><td>orphan row</td></tr>
          </tbody>
        </table>
        </body></html>"#;

    #[test]
    fn lists_children_in_page_order() {
        let children = child_listing(SECTION_PAGE).unwrap();
        let names: Vec<_> = children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Guides", "Intro", "logo.png"]);
        assert_eq!(children[1].href, "/p/admin/cms/pages/21/edit");
        assert_eq!(children[1].node_type(), Ok(NodeType::Page));
        assert_eq!(children[2].node_type(), Ok(NodeType::File));
    }

    #[test]
    fn missing_listing_is_reported() {
        assert_eq!(
            child_listing("<html><body></body></html>"),
            Err(ParseError::MissingListing)
        );
    }

    #[test]
    fn section_fragment_drops_the_token() {
        let fragment = metadata_fragment(SECTION_PAGE, NodeType::Section).unwrap();
        assert!(!fragment.contains("authenticity_token"));
        assert!(!fragment.contains("TOKEN-ONE"));
        assert!(fragment.contains(r#"name="cms_section[title]""#));
    }

    #[test]
    fn section_fragment_is_stable_across_tokens() {
        let other = SECTION_PAGE.replace("TOKEN-ONE", "TOKEN-TWO");
        assert_eq!(
            metadata_fragment(SECTION_PAGE, NodeType::Section),
            metadata_fragment(&other, NodeType::Section)
        );
    }

    #[test]
    fn template_fields_are_unhidden() {
        let page = r#"<div id="cms-template-fields-wrapper"><ol><li>Title</li></ol><ol style="display: none;"><li>Handler</li></ol></div>"#;
        let fragment = metadata_fragment(page, NodeType::Page).unwrap();
        assert!(!fragment.contains("display: none"));
        assert_eq!(fragment.matches("<ol>").count(), 2);
    }

    #[test]
    fn file_form_is_kept_verbatim() {
        let page = r#"<form id="edit_cms_file"><input name="authenticity_token" value="x"></form>"#;
        let fragment = metadata_fragment(page, NodeType::File).unwrap();
        assert!(fragment.contains("authenticity_token"));
    }

    #[test]
    fn absent_fragment_yields_none() {
        assert_eq!(metadata_fragment("<p>nothing</p>", NodeType::Layout), None);
        assert_eq!(metadata_fragment("<p>nothing</p>", NodeType::File), None);
        assert_eq!(metadata_fragment("<p>nothing</p>", NodeType::Section), None);
    }

    #[test]
    fn sidebar_links_use_their_titles() {
        let page = r#"
            <div id="cms-sidebar-partials">
              <ul><li><a href="/p/admin/cms/partials/4/edit" title="shared/header">header</a></li>
              <li><a href="/p/admin/cms/partials/5/edit">untitled</a></li></ul>
            </div>"#;
        let entries = sidebar_listing(page, PARTIALS_CONTAINER).unwrap();
        assert_eq!(
            entries,
            [SidebarEntry {
                name: "shared/header".into(),
                href: "/p/admin/cms/partials/4/edit".into(),
            }]
        );
        assert_eq!(
            sidebar_listing(page, LAYOUTS_CONTAINER),
            Err(ParseError::MissingContainer(LAYOUTS_CONTAINER))
        );
    }
}
