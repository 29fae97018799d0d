//! In-memory stand-in for the CMS admin UI.
//!
//! Pages are keyed by absolute URL. Section pages carry a child listing and an
//! edit form whose authenticity token changes on every read, like the real UI.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use cms_export_core::contract::{ClientError, RemoteClient};
use cms_export_core::export::{DRAFT_SURFACE, LIVE_SURFACE, LIVE_TAB, LIVE_TAB_SELECTED};
use cms_export_core::mirror::ROOT_SECTION_LINK;

pub const BASE: &str = "https://acme-admin.example.net";

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub html: String,
    pub draft: Option<String>,
    pub live: Option<String>,
    /// The published tab never reports itself selected.
    pub live_tab_hangs: bool,
}

#[derive(Default)]
struct State {
    pages: HashMap<String, FakePage>,
    current: String,
    live_selected: bool,
    token_counter: u64,
    navigations: Vec<String>,
}

pub struct FakeCms {
    state: Mutex<State>,
    root_url: String,
}

impl FakeCms {
    /// A site whose sidebar root link opens `root_path`.
    pub fn new(root_path: &str) -> Self {
        Self {
            state: Mutex::new(State::default()),
            root_url: url(root_path),
        }
    }

    pub fn page(self, path: &str, page: FakePage) -> Self {
        self.state.lock().unwrap().pages.insert(url(path), page);
        self
    }

    /// Every URL navigated to, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    fn open(&self, state: &mut State, target: &str) -> Result<(), ClientError> {
        if !state.pages.contains_key(target) {
            return Err(ClientError::Navigation {
                url: target.to_string(),
                reason: "404".into(),
            });
        }
        state.current = target.to_string();
        state.live_selected = false;
        state.navigations.push(target.to_string());
        Ok(())
    }
}

#[async_trait]
impl RemoteClient for FakeCms {
    async fn navigate(&self, target: &str) -> Result<(), ClientError> {
        let mut state = self.state.lock().unwrap();
        self.open(&mut state, target)
    }

    async fn current_url(&self) -> Result<String, ClientError> {
        Ok(self.state.lock().unwrap().current.clone())
    }

    async fn current_document(&self) -> Result<String, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.token_counter += 1;
        let token = format!("token-{}", state.token_counter);
        let page = state
            .pages
            .get(&state.current)
            .ok_or_else(|| ClientError::Browser("no page loaded".into()))?;
        Ok(page.html.replace("{{TOKEN}}", &token))
    }

    async fn click(&self, selector: &str) -> Result<(), ClientError> {
        let mut state = self.state.lock().unwrap();
        match selector {
            ROOT_SECTION_LINK => {
                let root = self.root_url.clone();
                self.open(&mut state, &root)
            }
            LIVE_TAB => {
                let hangs = state
                    .pages
                    .get(&state.current)
                    .map(|page| page.live_tab_hangs)
                    .unwrap_or(true);
                state.live_selected = !hangs;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn type_text(&self, _selector: &str, _text: &str) -> Result<(), ClientError> {
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), ClientError> {
        let state = self.state.lock().unwrap();
        if selector == LIVE_TAB_SELECTED && !state.live_selected {
            return Err(ClientError::Timeout {
                selector: selector.to_string(),
                timeout,
            });
        }
        Ok(())
    }

    async fn copy_all(&self, selector: &str) -> Result<String, ClientError> {
        let state = self.state.lock().unwrap();
        let page = state.pages.get(&state.current);
        let body = match selector {
            DRAFT_SURFACE => page.and_then(|p| p.draft.clone()),
            LIVE_SURFACE if state.live_selected => page.and_then(|p| p.live.clone()),
            _ => None,
        };
        body.ok_or_else(|| ClientError::ElementNotFound {
            selector: selector.to_string(),
        })
    }

    async fn close(&self) -> Result<(), ClientError> {
        Ok(())
    }
}

pub fn url(path: &str) -> String {
    format!("{BASE}{path}")
}

/// A section page: edit form with a per-read token plus the child listing.
/// Children are `(name, href, type label)`.
pub fn section(title: &str, children: &[(&str, &str, &str)]) -> FakePage {
    let rows: String = children
        .iter()
        .map(|(name, href, kind)| {
            format!(r#"<tr><td><a href="{href}">{name}</a></td><td>{kind}</td></tr>"#)
        })
        .collect();
    FakePage {
        html: format!(
            r#"<html><body>
            <form id="edit_cms_section"><input type="hidden" name="authenticity_token" value="{{{{TOKEN}}}}"><input name="cms_section[title]" value="{title}"></form>
            <table id="subsections-container"><tbody>{rows}</tbody></table>
            </body></html>"#
        ),
        ..FakePage::default()
    }
}

/// The root section page, which also carries the layout and partial sidebars.
/// Sidebar entries are `(title, href)`.
pub fn landing(
    children: &[(&str, &str, &str)],
    layouts: &[(&str, &str)],
    partials: &[(&str, &str)],
) -> FakePage {
    let links = |entries: &[(&str, &str)]| -> String {
        entries
            .iter()
            .map(|(title, href)| format!(r#"<li><a href="{href}" title="{title}">{title}</a></li>"#))
            .collect()
    };
    let mut page = section("Root", children);
    page.html = page.html.replace(
        "</body>",
        &format!(
            r#"<div id="cms-sidebar-layouts"><ul>{}</ul></div><div id="cms-sidebar-partials"><ul>{}</ul></div></body>"#,
            links(layouts),
            links(partials)
        ),
    );
    page
}

/// A page, layout or partial edit view with both bodies.
pub fn template(title: &str, draft: &str, live: &str) -> FakePage {
    FakePage {
        html: format!(
            r#"<html><body><div id="cms-template-fields-wrapper"><ol><li>{title}</li></ol><ol style="display: none;"><li>advanced</li></ol></div></body></html>"#
        ),
        draft: Some(draft.to_string()),
        live: Some(live.to_string()),
        live_tab_hangs: false,
    }
}

pub fn file(path: &str) -> FakePage {
    FakePage {
        html: format!(
            r#"<html><body><form id="edit_cms_file"><input name="cms_file[path]" value="{path}"></form></body></html>"#
        ),
        ..FakePage::default()
    }
}
