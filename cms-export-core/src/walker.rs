//! Recursive descent over the section tree.
//!
//! The walker is the only component that moves the session between sections.
//! It follows one rule: whenever it leaves a section to descend into a child
//! section, it navigates back to the parent section before the next sibling.

use std::collections::HashSet;
use std::fs;

use futures::future::BoxFuture;
use tracing::{debug, info, warn};
use url::Url;

use crate::contract::RemoteClient;
use crate::export::NodeExporter;
use crate::node::NodeType;
use crate::parser;
use crate::paths::{child_path, join_logical, map_path, ExportRoots};
use crate::report::{ArtifactKind, ArtifactOutcome, ExportReport};

pub struct TreeWalker<'a, C: ?Sized> {
    client: &'a C,
    exporter: &'a NodeExporter<'a, C>,
    roots: &'a ExportRoots,
    base_url: &'a Url,
    skip: &'a HashSet<String>,
}

impl<'a, C> TreeWalker<'a, C>
where
    C: RemoteClient + ?Sized,
{
    pub fn new(
        client: &'a C,
        exporter: &'a NodeExporter<'a, C>,
        roots: &'a ExportRoots,
        base_url: &'a Url,
        skip: &'a HashSet<String>,
    ) -> Self {
        Self {
            client,
            exporter,
            roots,
            base_url,
            skip,
        }
    }

    /// Exports the section `section` below the logical path `relative` and
    /// everything under it, depth first. The session must already show the
    /// section's page.
    pub fn walk<'w>(
        &'w self,
        relative: &'w str,
        section: &'w str,
        report: &'w mut ExportReport,
    ) -> BoxFuture<'w, ()>
    where
        C: 'w,
    {
        Box::pin(async move {
            let next = child_path(relative, section);
            if self.skipped(&next, section, "", report) {
                return;
            }

            let (content_dir, meta_dir) = self.roots.section_dirs(&next);
            if let Err(e) = fs::create_dir_all(&content_dir).and_then(|_| fs::create_dir_all(&meta_dir)) {
                warn!(error = %e, path = %content_dir.display(), "Failed to create section directories");
                report.record(
                    ArtifactKind::Directory,
                    &content_dir,
                    "",
                    ArtifactOutcome::Failed(e.to_string()),
                );
                return;
            }

            let section_url = match self.client.current_url().await {
                Ok(url) => url,
                Err(e) => {
                    warn!(error = %e, section, "Could not read section URL");
                    report.record(
                        ArtifactKind::Directory,
                        &content_dir,
                        "",
                        ArtifactOutcome::Failed(e.to_string()),
                    );
                    return;
                }
            };
            let listing = self.client.current_document().await;

            let meta_paths = map_path(self.roots, relative, section, NodeType::Section);
            self.exporter
                .export_node(&meta_paths, &section_url, NodeType::Section, report)
                .await;

            let children = match listing.map_err(|e| e.to_string()).and_then(|document| {
                parser::child_listing(&document).map_err(|e| e.to_string())
            }) {
                Ok(children) => children,
                Err(reason) => {
                    warn!(%reason, url = %section_url, "Could not list section children");
                    report.record(
                        ArtifactKind::Directory,
                        &content_dir,
                        &section_url,
                        ArtifactOutcome::Failed(reason),
                    );
                    return;
                }
            };
            debug!(path = %next, count = children.len(), "Listed section children");

            for child in children {
                let child_url = match resolve_href(self.base_url, &child.href) {
                    Ok(url) => url,
                    Err(e) => {
                        warn!(error = %e, href = %child.href, "Unusable child link");
                        report.record(
                            ArtifactKind::Metadata,
                            join_logical(self.roots.meta_root(), &child_path(&next, &child.name)),
                            &child.href,
                            ArtifactOutcome::Failed(e.to_string()),
                        );
                        continue;
                    }
                };

                match child.node_type() {
                    Ok(NodeType::Section) => {
                        if self.skipped(&child_path(&next, &child.name), &child.name, child_url.as_str(), report) {
                            continue;
                        }
                        match self.client.navigate(child_url.as_str()).await {
                            Ok(()) => self.walk(&next, &child.name, report).await,
                            Err(e) => {
                                warn!(error = %e, url = %child_url, "Could not open child section");
                                report.record(
                                    ArtifactKind::Directory,
                                    join_logical(self.roots.root(), &child_path(&next, &child.name)),
                                    child_url.as_str(),
                                    ArtifactOutcome::Failed(e.to_string()),
                                );
                            }
                        }
                        self.restore(&section_url).await;
                    }
                    Ok(kind) => {
                        let paths = map_path(self.roots, &next, &child.name, kind);
                        self.exporter
                            .export_node(&paths, child_url.as_str(), kind, report)
                            .await;
                    }
                    Err(unknown) => {
                        // Treated like a page: template fields plus both bodies, when present.
                        warn!(name = %child.name, label = %unknown.0, "Exporting child of unrecognized type as a template");
                        let paths = map_path(self.roots, &next, &child.name, NodeType::Page);
                        report.warn(&paths.meta, child_url.as_str(), unknown.to_string());
                        self.exporter
                            .export_node(&paths, child_url.as_str(), NodeType::Page, report)
                            .await;
                    }
                }
            }
        })
    }

    /// Records and reports a section on the skip list. Nothing below it is
    /// created or visited.
    fn skipped(&self, logical: &str, section: &str, url: &str, report: &mut ExportReport) -> bool {
        if !self.skip.contains(section) {
            return false;
        }
        info!(section, path = %logical, "Skipping section");
        report.record(
            ArtifactKind::Directory,
            join_logical(self.roots.root(), logical),
            url,
            ArtifactOutcome::Skipped("section is in the skip list".into()),
        );
        true
    }

    /// Brings the session back to the parent section after a child section.
    async fn restore(&self, section_url: &str) {
        if let Err(e) = self.client.navigate(section_url).await {
            warn!(error = %e, url = %section_url, "Could not return to parent section");
        }
    }
}

/// Resolves an edit link from a listing against the portal base URL.
///
/// Site-relative links are appended to the base, path prefix included, with a
/// single `/` between the two. Absolute links are used as they are.
pub fn resolve_href(base_url: &Url, href: &str) -> Result<Url, url::ParseError> {
    match Url::parse(href) {
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!(
            "{}/{}",
            base_url.as_str().trim_end_matches('/'),
            href.trim_start_matches('/')
        )),
        parsed => parsed,
    }
}
