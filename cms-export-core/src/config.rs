use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};
use url::Url;

/// Default bound on the wait for the published tab to report itself selected.
pub const DEFAULT_TAB_WAIT: Duration = Duration::from_secs(3);

/// Everything an export run needs besides the session itself.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Admin portal base, e.g. `https://acme-admin.3scale.net`.
    pub base_url: Url,
    /// Content root; metadata goes to `<output_dir>/meta`.
    pub output_dir: PathBuf,
    /// Section names excluded at any depth.
    pub skip_sections: HashSet<String>,
    pub scope: ExportScope,
    /// Print one progress line per exported node.
    pub verbose: bool,
    pub tab_wait: Duration,
}

impl ExportConfig {
    pub fn new(base_url: Url, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_url,
            output_dir: output_dir.into(),
            skip_sections: HashSet::new(),
            scope: ExportScope::everything(),
            verbose: true,
            tab_wait: DEFAULT_TAB_WAIT,
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            base_url = %self.base_url,
            output_dir = %self.output_dir.display(),
            skip_count = self.skip_sections.len(),
            sections = self.scope.sections,
            layouts = self.scope.layouts,
            partials = self.scope.partials,
            "Loaded export config"
        );
        debug!(?self, "Export config loaded (full debug)");
    }
}

/// Which parts of the CMS a run exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportScope {
    /// The recursive section tree below `Root`.
    pub sections: bool,
    pub layouts: bool,
    pub partials: bool,
}

impl ExportScope {
    pub fn everything() -> Self {
        Self {
            sections: true,
            layouts: true,
            partials: true,
        }
    }

    /// Combines the export-all toggle with the narrower layout/partial toggles.
    ///
    /// An explicit `all` decides the section tree. Without it, the tree is
    /// exported only when no narrower scope was requested.
    pub fn resolve(all: Option<bool>, layouts: bool, partials: bool) -> Self {
        let all = all.unwrap_or(!(layouts || partials));
        Self {
            sections: all,
            layouts: all || layouts,
            partials: all || partials,
        }
    }
}
