//! Link derivation for generated documents.

use staticapi_config::LinkMode;

/// Derives the fetchable link recorded in a parent document for each child.
///
/// The two deployment variants differ only here: `relative` links are
/// same-origin fetch paths under the public root, `absolute` links prepend a
/// base URL to the public root path.
#[derive(Debug)]
pub(crate) struct LinkBuilder {
    prefix: String,
}

impl LinkBuilder {
    pub(crate) fn new(mode: LinkMode, public_root: &str, base_url: Option<&str>) -> Self {
        let root = public_root.trim_end_matches('/');
        let prefix = match mode {
            LinkMode::Relative => root.to_owned(),
            LinkMode::Absolute => {
                let base = base_url.unwrap_or_default().trim_end_matches('/');
                let root = root.strip_prefix("./").unwrap_or(root);
                let root = root.trim_start_matches('/');
                if root.is_empty() {
                    base.to_owned()
                } else {
                    format!("{base}/{root}")
                }
            }
        };
        Self { prefix }
    }

    /// Link at which the document for `route_path` (slash-joined segments
    /// relative to the output root) can be fetched.
    pub(crate) fn document(&self, route_path: &str) -> String {
        format!("{}/{route_path}.json", self.prefix)
    }
}
