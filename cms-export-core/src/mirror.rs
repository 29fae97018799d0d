//! High-level export runs: sign-in, full mirror, single-page export.
//!
//! This module wires the pieces together for one session:
//!   - [`sign_in`] authenticates and checks the admin UI came up
//!   - [`export_all`] walks the section tree and the flat layout/partial lists
//!   - [`export_single`] exports one page's bodies to an explicit destination
//!
//! # Error Handling
//! Only sign-in and reaching the landing page can fail a run ([`ExportError`]).
//! Everything after that is recorded in the returned [`ExportReport`].

use std::fmt;
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use crate::config::ExportConfig;
use crate::contract::{ClientError, RemoteClient};
use crate::export::NodeExporter;
use crate::node::NodeType;
use crate::parser::{self, LAYOUTS_CONTAINER, PARTIALS_CONTAINER};
use crate::paths::{child_path, map_path, ContentPaths, ExportRoots};
use crate::report::{ArtifactKind, ArtifactOutcome, ExportReport};
use crate::walker::{resolve_href, TreeWalker};

/// Admin page the session starts on; it redirects to the sign-in form.
pub const START_PATH: &str = "/p/admin/cms/templates";

/// Name of the top of the section tree.
pub const ROOT_SECTION: &str = "Root";

pub const USERNAME_FIELD: &str = "#session_username";
pub const PASSWORD_FIELD: &str = "#session_password";
pub const SIGN_IN_BUTTON: &str = r#"main form button[type="submit"]"#;

/// Sidebar filter showing content of every origin; only present once signed in.
pub const ALL_ORIGINS_FILTER: &str = r#"#cms-sidebar-filter-origin li[data-filter-origin="all"]"#;

/// First entry of the sidebar content tree: the root section.
pub const ROOT_SECTION_LINK: &str = "#cms-sidebar-content li a";

pub const LISTING_TABLE: &str = "table#subsections-container";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("could not submit the sign-in form: {0}")]
    SignIn(#[source] ClientError),

    #[error("Expected sidebar content not found. Login may have failed.")]
    LoginRejected(#[source] ClientError),

    #[error("root section could not be opened: {0}")]
    Landing(#[source] ClientError),
}

/// Admin credentials. The password never appears in debug output.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Signs in through the admin form and switches the sidebar to show content of
/// every origin. A missing origin filter means the sign-in did not take.
pub async fn sign_in<C>(
    client: &C,
    base_url: &Url,
    credentials: &Credentials,
) -> Result<(), ExportError>
where
    C: RemoteClient + ?Sized,
{
    let start = resolve_href(base_url, START_PATH)
        .map_err(|source| ExportError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
    info!(url = %start, user = %credentials.username, "Signing in");

    client
        .navigate(start.as_str())
        .await
        .map_err(ExportError::SignIn)?;
    client
        .type_text(USERNAME_FIELD, &credentials.username)
        .await
        .map_err(ExportError::SignIn)?;
    client
        .type_text(PASSWORD_FIELD, &credentials.password)
        .await
        .map_err(ExportError::SignIn)?;
    client
        .click(SIGN_IN_BUTTON)
        .await
        .map_err(ExportError::SignIn)?;

    if let Err(e) = client.click(ALL_ORIGINS_FILTER).await {
        error!(error = %e, "Expected sidebar content not found. Login may have failed.");
        return Err(ExportError::LoginRejected(e));
    }
    info!("Signed in");
    Ok(())
}

/// Mirrors the CMS into `config.output_dir` according to `config.scope`.
/// The session must be signed in.
pub async fn export_all<C>(client: &C, config: &ExportConfig) -> Result<ExportReport, ExportError>
where
    C: RemoteClient + ?Sized,
{
    config.trace_loaded();

    client
        .click(ROOT_SECTION_LINK)
        .await
        .map_err(ExportError::Landing)?;
    client
        .wait_for(LISTING_TABLE, config.tab_wait)
        .await
        .map_err(ExportError::Landing)?;
    // The sidebar lists are read before the walk moves the session elsewhere.
    let landing = client
        .current_document()
        .await
        .map_err(ExportError::Landing)?;

    let roots = ExportRoots::new(&config.output_dir);
    let exporter = NodeExporter::new(client, config);
    let mut report = ExportReport::new();

    if config.scope.sections {
        info!(section = ROOT_SECTION, "Exporting section tree");
        let walker = TreeWalker::new(
            client,
            &exporter,
            &roots,
            &config.base_url,
            &config.skip_sections,
        );
        walker.walk("", ROOT_SECTION, &mut report).await;
    }

    let collections = [
        (config.scope.layouts, "Layouts", LAYOUTS_CONTAINER, NodeType::Layout),
        (config.scope.partials, "Partials", PARTIALS_CONTAINER, NodeType::Partial),
    ];
    for (enabled, dir, container, kind) in collections {
        if enabled {
            info!(collection = dir, "Exporting flat collection");
            export_collection(
                &exporter,
                &roots,
                &config.base_url,
                &landing,
                FlatCollection { dir, container, kind },
                &mut report,
            )
            .await;
        }
    }

    report.trace_summary();
    Ok(report)
}

/// Exports the draft and published bodies of the page at `url` to
/// `destination`, bypassing the tree and metadata.
pub async fn export_single<C>(
    client: &C,
    destination: &Path,
    url: &str,
    config: &ExportConfig,
) -> ExportReport
where
    C: RemoteClient + ?Sized,
{
    let mut report = ExportReport::new();
    match ContentPaths::from_destination(destination) {
        Some(paths) => {
            let exporter = NodeExporter::new(client, config);
            exporter.export_content(&paths, url, &mut report).await;
        }
        None => {
            warn!(path = %destination.display(), "Destination has no file name");
            report.record(
                ArtifactKind::Published,
                destination,
                url,
                ArtifactOutcome::Failed("destination has no file name".into()),
            );
        }
    }
    report.trace_summary();
    report
}

struct FlatCollection {
    /// Top-level directory, also the logical parent of every entry.
    dir: &'static str,
    container: &'static str,
    kind: NodeType,
}

async fn export_collection<C>(
    exporter: &NodeExporter<'_, C>,
    roots: &ExportRoots,
    base_url: &Url,
    landing: &str,
    collection: FlatCollection,
    report: &mut ExportReport,
) where
    C: RemoteClient + ?Sized,
{
    let parent = child_path("", collection.dir);
    let (content_dir, meta_dir) = roots.section_dirs(&parent);
    if let Err(e) = fs::create_dir_all(&content_dir).and_then(|_| fs::create_dir_all(&meta_dir)) {
        warn!(error = %e, path = %content_dir.display(), "Failed to create collection directories");
        report.record(
            ArtifactKind::Directory,
            &content_dir,
            "",
            ArtifactOutcome::Failed(e.to_string()),
        );
        return;
    }

    let entries = match parser::sidebar_listing(landing, collection.container) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "Could not list collection");
            report.record(
                ArtifactKind::Directory,
                &content_dir,
                "",
                ArtifactOutcome::Failed(e.to_string()),
            );
            return;
        }
    };

    for entry in entries {
        let paths = map_path(roots, &parent, &entry.name, collection.kind);
        let url = match resolve_href(base_url, &entry.href) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, href = %entry.href, "Unusable collection link");
                report.record(
                    ArtifactKind::Metadata,
                    &paths.meta,
                    &entry.href,
                    ArtifactOutcome::Failed(e.to_string()),
                );
                continue;
            }
        };
        exporter
            .export_node(&paths, url.as_str(), collection.kind, report)
            .await;
    }
}
