//! Node exporter: metadata fragment plus draft/published bodies of one node.
//!
//! Every artifact is attempted independently and its outcome is appended to the
//! run's [`ExportReport`]. Nothing in here returns an error to the caller: a node
//! that cannot be exported must not stop its siblings.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::ExportConfig;
use crate::contract::{ClientError, RemoteClient};
use crate::node::NodeType;
use crate::parser;
use crate::paths::{ContentPaths, NodePaths};
use crate::report::{ArtifactKind, ArtifactOutcome, ExportReport};

/// Editor surface holding the draft body.
pub const DRAFT_SURFACE: &str = "div#cms-template-draft";

/// Tab switching the editor to the published body.
pub const LIVE_TAB: &str = r##"a[href="#cms-template-live"]"##;

/// Present once the published tab is the selected one.
pub const LIVE_TAB_SELECTED: &str =
    r#"li[aria-controls="cms-template-live"][aria-selected="true"]"#;

/// Editor surface holding the published body.
pub const LIVE_SURFACE: &str = "div#cms-template-live";

pub struct NodeExporter<'a, C: ?Sized> {
    client: &'a C,
    verbose: bool,
    tab_wait: Duration,
}

impl<'a, C> NodeExporter<'a, C>
where
    C: RemoteClient + ?Sized,
{
    pub fn new(client: &'a C, config: &ExportConfig) -> Self {
        Self::with_options(client, config.verbose, config.tab_wait)
    }

    pub fn with_options(client: &'a C, verbose: bool, tab_wait: Duration) -> Self {
        Self {
            client,
            verbose,
            tab_wait,
        }
    }

    /// Exports the node at `url`: its metadata fragment always, its draft and
    /// published bodies when `kind` carries them.
    pub async fn export_node(
        &self,
        paths: &NodePaths,
        url: &str,
        kind: NodeType,
        report: &mut ExportReport,
    ) {
        debug!(%url, %kind, meta = %paths.meta.display(), "Exporting node");

        if let Err(e) = self.client.navigate(url).await {
            warn!(error = %e, %url, "Could not open node edit page");
            report.record(ArtifactKind::Metadata, &paths.meta, url, failed(&e));
            if let Some(content) = content_paths(paths, kind) {
                report.record(ArtifactKind::Draft, &content.draft, url, failed(&e));
                report.record(ArtifactKind::Published, &content.published, url, failed(&e));
            }
            return;
        }

        let outcome = match self.client.current_document().await {
            Ok(document) => match parser::metadata_fragment(&document, kind) {
                Some(fragment) => persist(&paths.meta, fragment.as_bytes()),
                None => {
                    debug!(%url, %kind, "No metadata fragment on page");
                    ArtifactOutcome::NotFound
                }
            },
            Err(e) => {
                warn!(error = %e, %url, "Could not read node edit page");
                failed(&e)
            }
        };
        report.record(ArtifactKind::Metadata, &paths.meta, url, outcome);

        if let Some(content) = content_paths(paths, kind) {
            self.capture_bodies(content, url, report).await;
        }
    }

    /// Exports only the draft and published bodies of the page at `url`.
    pub async fn export_content(&self, paths: &ContentPaths, url: &str, report: &mut ExportReport) {
        if let Err(e) = self.client.navigate(url).await {
            warn!(error = %e, %url, "Could not open page");
            report.record(ArtifactKind::Draft, &paths.draft, url, failed(&e));
            report.record(ArtifactKind::Published, &paths.published, url, failed(&e));
            return;
        }
        self.capture_bodies(paths, url, report).await;
    }

    /// Draft and published captures on the page currently shown. The two are
    /// independent: a failed draft never prevents the published capture.
    async fn capture_bodies(&self, paths: &ContentPaths, url: &str, report: &mut ExportReport) {
        let draft = match self.client.copy_all(DRAFT_SURFACE).await {
            Ok(body) => write_body(&paths.draft, &body),
            Err(e) => from_client_error(e),
        };
        if draft != ArtifactOutcome::Written {
            warn!(%url, outcome = ?draft, "cms-template-draft not copied (might be empty)");
        }

        let published = match self.copy_published().await {
            Ok(body) => write_body(&paths.published, &body),
            Err(e) => from_client_error(e),
        };
        if published != ArtifactOutcome::Written {
            warn!(%url, outcome = ?published, "cms-template-live not copied (might be empty)");
        }

        let any_written =
            draft == ArtifactOutcome::Written || published == ArtifactOutcome::Written;
        report.record(ArtifactKind::Draft, &paths.draft, url, draft);
        report.record(ArtifactKind::Published, &paths.published, url, published);

        if any_written {
            info!(path = %paths.published.display(), %url, "Exported content");
            if self.verbose {
                println!("{} : {}", paths.published.display(), url);
            }
        }
    }

    async fn copy_published(&self) -> Result<String, ClientError> {
        self.client.click(LIVE_TAB).await?;
        self.client.wait_for(LIVE_TAB_SELECTED, self.tab_wait).await?;
        self.client.copy_all(LIVE_SURFACE).await
    }
}

fn content_paths(paths: &NodePaths, kind: NodeType) -> Option<&ContentPaths> {
    match kind {
        NodeType::Page | NodeType::Layout | NodeType::Partial => paths.content.as_ref(),
        NodeType::Section | NodeType::File => None,
    }
}

fn write_body(path: &Path, body: &str) -> ArtifactOutcome {
    if body.is_empty() {
        return ArtifactOutcome::NotFound;
    }
    persist(path, body.as_bytes())
}

fn persist(path: &Path, bytes: &[u8]) -> ArtifactOutcome {
    match write_artifact(path, bytes) {
        Ok(()) => ArtifactOutcome::Written,
        Err(e) => {
            warn!(error = %e, path = %path.display(), "Failed to write artifact");
            ArtifactOutcome::Failed(e.to_string())
        }
    }
}

fn from_client_error(e: ClientError) -> ArtifactOutcome {
    match e {
        ClientError::ElementNotFound { .. } => ArtifactOutcome::NotFound,
        other => failed(&other),
    }
}

fn failed(e: &ClientError) -> ArtifactOutcome {
    ArtifactOutcome::Failed(e.to_string())
}

/// Writes `bytes` to `path` through a temporary file in the same directory, so a
/// killed run never leaves a half-written artifact behind. Missing parent
/// directories are created.
pub fn write_artifact(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockRemoteClient;
    use crate::paths::{map_path, ExportRoots};
    use tempfile::tempdir;

    const TEMPLATE_PAGE: &str = r#"<div id="cms-template-fields-wrapper"><ol><li>Title</li></ol></div>"#;

    fn scripted_client(live: Result<&'static str, ()>) -> MockRemoteClient {
        let mut client = MockRemoteClient::new();
        client.expect_navigate().returning(|_| Ok(()));
        client
            .expect_current_document()
            .returning(|| Ok(TEMPLATE_PAGE.to_string()));
        client.expect_click().returning(|_| Ok(()));
        client
            .expect_wait_for()
            .returning(move |selector: &str, timeout: Duration| match live {
                Ok(_) => Ok(()),
                Err(()) => Err(ClientError::Timeout {
                    selector: selector.to_string(),
                    timeout,
                }),
            });
        client
            .expect_copy_all()
            .returning(move |selector: &str| match selector {
                DRAFT_SURFACE => Ok("{% draft %}".to_string()),
                _ => Ok(live.unwrap_or_default().to_string()),
            });
        client
    }

    #[tokio::test]
    async fn writes_metadata_draft_and_published() {
        let dir = tempdir().unwrap();
        let roots = ExportRoots::new(dir.path());
        let client = scripted_client(Ok("{% live %}"));
        let exporter = NodeExporter::with_options(&client, false, Duration::from_millis(10));
        let paths = map_path(&roots, "/Root", "Intro", NodeType::Page);
        let mut report = ExportReport::new();

        exporter
            .export_node(&paths, "https://cms/p/admin/cms/pages/1/edit", NodeType::Page, &mut report)
            .await;

        assert_eq!(report.summary().written, 3);
        let content = paths.content.unwrap();
        assert_eq!(fs::read_to_string(content.draft).unwrap(), "{% draft %}");
        assert_eq!(fs::read_to_string(content.published).unwrap(), "{% live %}");
        assert_eq!(
            fs::read_to_string(paths.meta).unwrap(),
            "<ol><li>Title</li></ol>"
        );
    }

    #[tokio::test]
    async fn tab_timeout_keeps_the_draft() {
        let dir = tempdir().unwrap();
        let roots = ExportRoots::new(dir.path());
        let client = scripted_client(Err(()));
        let exporter = NodeExporter::with_options(&client, false, Duration::from_millis(10));
        let paths = map_path(&roots, "/Layouts", "main", NodeType::Layout);
        let mut report = ExportReport::new();

        exporter
            .export_node(&paths, "https://cms/p/admin/cms/layouts/2/edit", NodeType::Layout, &mut report)
            .await;

        let content = paths.content.unwrap();
        assert!(content.draft.exists());
        assert!(!content.published.exists());
        let published = report
            .records
            .iter()
            .find(|r| r.kind == ArtifactKind::Published)
            .unwrap();
        assert!(matches!(published.outcome, ArtifactOutcome::Failed(ref reason) if reason.contains("timed out")));
    }

    #[tokio::test]
    async fn empty_draft_is_not_found_and_published_still_written() {
        let dir = tempdir().unwrap();
        let roots = ExportRoots::new(dir.path());
        let mut client = MockRemoteClient::new();
        client.expect_navigate().returning(|_| Ok(()));
        client
            .expect_current_document()
            .returning(|| Ok(TEMPLATE_PAGE.to_string()));
        client.expect_click().returning(|_| Ok(()));
        client.expect_wait_for().returning(|_, _| Ok(()));
        client
            .expect_copy_all()
            .returning(|selector: &str| match selector {
                DRAFT_SURFACE => Ok(String::new()),
                _ => Ok("<p>live</p>".to_string()),
            });
        let exporter = NodeExporter::with_options(&client, false, Duration::from_millis(10));
        let paths = map_path(&roots, "/Root", "Blank", NodeType::Page);
        let mut report = ExportReport::new();

        exporter
            .export_node(&paths, "https://cms/p/admin/cms/pages/6/edit", NodeType::Page, &mut report)
            .await;

        let content = paths.content.unwrap();
        assert!(!content.draft.exists());
        assert_eq!(fs::read_to_string(&content.published).unwrap(), "<p>live</p>");
        let draft = report
            .records
            .iter()
            .find(|r| r.kind == ArtifactKind::Draft)
            .unwrap();
        assert_eq!(draft.outcome, ArtifactOutcome::NotFound);
        assert_eq!(report.failures().count(), 0);
    }

    #[tokio::test]
    async fn file_nodes_never_touch_the_editor() {
        let dir = tempdir().unwrap();
        let roots = ExportRoots::new(dir.path());
        let mut client = MockRemoteClient::new();
        client.expect_navigate().times(1).returning(|_| Ok(()));
        client.expect_current_document().times(1).returning(|| {
            Ok(r#"<form id="edit_cms_file"><input name="cms_file[path]" value="/logo.png"></form>"#.to_string())
        });
        client.expect_copy_all().never();
        client.expect_click().never();
        let exporter = NodeExporter::with_options(&client, false, Duration::from_millis(10));
        let paths = map_path(&roots, "/Root", "logo.png", NodeType::File);
        let mut report = ExportReport::new();

        exporter
            .export_node(&paths, "https://cms/p/admin/cms/files/3/edit", NodeType::File, &mut report)
            .await;

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].kind, ArtifactKind::Metadata);
        assert!(paths.meta.exists());
    }

    #[tokio::test]
    async fn missing_fragment_writes_nothing() {
        let dir = tempdir().unwrap();
        let roots = ExportRoots::new(dir.path());
        let mut client = MockRemoteClient::new();
        client.expect_navigate().returning(|_| Ok(()));
        client
            .expect_current_document()
            .returning(|| Ok("<html><body>Not found</body></html>".to_string()));
        let exporter = NodeExporter::with_options(&client, false, Duration::from_millis(10));
        let paths = map_path(&roots, "/Root", "Gone", NodeType::Section);
        let mut report = ExportReport::new();

        exporter
            .export_node(&paths, "https://cms/p/admin/cms/sections/9/edit", NodeType::Section, &mut report)
            .await;

        assert_eq!(report.records[0].outcome, ArtifactOutcome::NotFound);
        assert!(!paths.meta.exists());
    }

    #[tokio::test]
    async fn navigation_failure_fails_every_artifact() {
        let dir = tempdir().unwrap();
        let roots = ExportRoots::new(dir.path());
        let mut client = MockRemoteClient::new();
        client.expect_navigate().returning(|url: &str| {
            Err(ClientError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_RESET".into(),
            })
        });
        let exporter = NodeExporter::with_options(&client, false, Duration::from_millis(10));
        let paths = map_path(&roots, "/Partials", "footer", NodeType::Partial);
        let mut report = ExportReport::new();

        exporter
            .export_node(&paths, "https://cms/p/admin/cms/partials/4/edit", NodeType::Partial, &mut report)
            .await;

        assert_eq!(report.summary().failed, 3);
    }

    #[test]
    fn write_artifact_creates_parents_and_replaces() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("meta/Partials/shared/header.html");
        write_artifact(&path, b"first").unwrap();
        write_artifact(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }
}
