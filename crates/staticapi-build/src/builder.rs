//! Recursive route tree materialization.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use serde_json::{Map, Value};
use staticapi_config::{Config, LinkMode};
use staticapi_schema::{NodeKind, RouteNode, Schema};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::link::LinkBuilder;

/// Configuration for a materialization run.
#[derive(Clone, Debug)]
pub struct BuildConfig {
    /// Directory under which the mirrored tree is created.
    pub out_dir: PathBuf,
    /// Public path at which the output root is served; prefixed to every
    /// generated link.
    pub public_root: String,
    /// Link derivation mode.
    pub link_mode: LinkMode,
    /// Base URL prepended to links in absolute mode.
    pub base_url: Option<String>,
    /// Write directly into `out_dir` instead of staging and renaming into
    /// place.
    pub in_place: bool,
    /// Bound on simultaneously open filesystem operations. Permits are held
    /// per operation, never across a subtree join, so any positive bound is
    /// deadlock-free.
    pub max_open_files: usize,
}

impl BuildConfig {
    /// Build configuration from the application config.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            out_dir: config.output_resolved.dir.clone(),
            public_root: config.output_resolved.public_root.clone(),
            link_mode: config.links.mode,
            base_url: config.links.base_url.clone(),
            in_place: config.output_resolved.in_place,
            max_open_files: config.output_resolved.max_open_files,
        }
    }
}

/// Error returned by the materializer.
///
/// The first error anywhere in the tree aborts the run; there are no retries
/// and no partial-failure recovery.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Filesystem refused to create an output directory.
    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Filesystem refused to write a document.
    #[error("Failed to write document {}: {source}", .path.display())]
    WriteFile {
        /// Document path that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A document could not be serialized.
    #[error("Failed to serialize document for route '{route}': {source}")]
    Serialize {
        /// Route path of the offending node.
        route: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// A node's `path` segment would escape or collapse the mirrored tree.
    #[error("Invalid path segment '{segment}' under '{parent}'")]
    InvalidSegment {
        /// The offending segment.
        segment: String,
        /// Route path of the parent node.
        parent: String,
    },
    /// The completed staging tree could not be swapped into place.
    #[error("Failed to publish output to {}: {source}", .path.display())]
    Publish {
        /// Published output path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A materialization task was cancelled or panicked.
    #[error("Materialization task failed: {0}")]
    Task(#[source] tokio::task::JoinError),
}

/// Summary entry written into a parent document's `content` list.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ChildLink {
    /// Child's display name.
    pub title: String,
    /// Link at which the child's document can be fetched.
    pub link: String,
}

/// Generated document for one route: a shallow copy of the node with
/// `content` replaced by child summaries.
#[derive(Serialize)]
struct RouteDocument {
    path: String,
    title: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<Vec<ChildLink>>,
}

/// Counts of what a run put on disk.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BuildReport {
    /// Documents written.
    pub documents: usize,
    /// Directories created.
    pub directories: usize,
}

/// Materializes a route tree as a mirrored directory tree of JSON documents.
///
/// Every interior node becomes a directory; every node becomes a
/// `<path>.json` document sitting next to the directory that holds its
/// children (directory and document share the base name). Each document's
/// `content` field is replaced by ordered `{title, link}` summaries of its
/// children.
pub struct Builder {
    config: BuildConfig,
}

impl Builder {
    /// Create a builder for the given configuration.
    #[must_use]
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Materialize the full tree.
    ///
    /// The root of the schema produces no document of its own; only its
    /// `content` entries are materialized under the output root. Unless
    /// `in_place` is set, the tree is built into a hidden staging directory
    /// next to the output root and renamed into place on success, so a
    /// failed run never leaves a half-built tree at the published path.
    ///
    /// # Errors
    ///
    /// The first directory-creation or document-write failure anywhere in
    /// the tree aborts the run.
    pub async fn build(&self, schema: Schema) -> Result<BuildReport, BuildError> {
        let Some(routes) = schema.routes else {
            tracing::info!("schema root has no content; nothing to materialize");
            return Ok(BuildReport::default());
        };

        let worker = Worker::new(&self.config);

        if self.config.in_place {
            worker
                .materialize_children(routes, self.config.out_dir.clone(), String::new())
                .await?;
        } else {
            let staging = staging_dir(&self.config.out_dir);
            let staged = async {
                worker
                    .materialize_children(routes, staging.clone(), String::new())
                    .await?;
                publish(&staging, &self.config.out_dir).await
            }
            .await;
            if let Err(err) = staged {
                // Abandon the staging tree wholesale; the published path is
                // left exactly as it was.
                let _ = tokio::fs::remove_dir_all(&staging).await;
                return Err(err);
            }
            tracing::info!(path = %self.config.out_dir.display(), "Published output");
        }

        Ok(worker.report())
    }
}

/// Boxed node future; the indirection breaks the recursive async cycle.
type NodeFuture = Pin<Box<dyn Future<Output = Result<(), BuildError>> + Send>>;

/// Cloneable state shared by every materialization task.
#[derive(Clone)]
struct Worker {
    links: Arc<LinkBuilder>,
    permits: Arc<Semaphore>,
    documents: Arc<AtomicUsize>,
    directories: Arc<AtomicUsize>,
}

impl Worker {
    fn new(config: &BuildConfig) -> Self {
        Self {
            links: Arc::new(LinkBuilder::new(
                config.link_mode,
                &config.public_root,
                config.base_url.as_deref(),
            )),
            permits: Arc::new(Semaphore::new(config.max_open_files.max(1))),
            documents: Arc::new(AtomicUsize::new(0)),
            directories: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn report(&self) -> BuildReport {
        BuildReport {
            documents: self.documents.load(Ordering::Relaxed),
            directories: self.directories.load(Ordering::Relaxed),
        }
    }

    /// Create `dir` and materialize `children` under it, one task per child.
    ///
    /// Children are initiated in input order and complete in any order; the
    /// returned summaries follow input order regardless. Returns only once
    /// every child's subtree is fully on disk, so the caller may serialize
    /// its own document against complete link targets.
    async fn materialize_children(
        &self,
        children: Vec<RouteNode>,
        dir: PathBuf,
        route_prefix: String,
    ) -> Result<Vec<ChildLink>, BuildError> {
        self.create_dir(&dir).await?;

        let mut summaries = Vec::with_capacity(children.len());
        let mut subtree = JoinSet::new();
        for child in children {
            validate_segment(&child.path, &route_prefix)?;
            let route_path = join_route(&route_prefix, &child.path);
            summaries.push(ChildLink {
                title: child.title.clone(),
                link: self.links.document(&route_path),
            });
            let file_base = dir.join(&child.path);
            subtree.spawn(self.clone().materialize_file(child, file_base, route_path));
        }

        // Join barrier. A first failure propagates immediately; dropping the
        // set aborts the still-running sibling tasks.
        while let Some(joined) = subtree.join_next().await {
            joined.map_err(BuildError::Task)??;
        }

        Ok(summaries)
    }

    /// Materialize one node: its subtree first, then the node's own document
    /// as a `.json` sibling of its child directory.
    fn materialize_file(self, node: RouteNode, file_base: PathBuf, route_path: String) -> NodeFuture {
        Box::pin(async move {
            let content = match node.kind {
                NodeKind::Leaf => None,
                NodeKind::Interior(children) => Some(
                    self.materialize_children(children, file_base.clone(), route_path.clone())
                        .await?,
                ),
            };

            let document = RouteDocument {
                path: node.path,
                title: node.title,
                extra: node.extra,
                content,
            };
            let bytes = serde_json::to_vec(&document).map_err(|source| BuildError::Serialize {
                route: route_path,
                source,
            })?;

            let path = json_sibling(&file_base);
            self.write(&path, bytes).await?;
            tracing::debug!(path = %path.display(), "Wrote document");
            Ok(())
        })
    }

    async fn create_dir(&self, dir: &Path) -> Result<(), BuildError> {
        // Permit scope covers a single filesystem call, never a subtree join
        let _permit = self
            .permits
            .acquire()
            .await
            .expect("semaphore is never closed");
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| BuildError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        self.directories.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn write(&self, path: &Path, bytes: Vec<u8>) -> Result<(), BuildError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .expect("semaphore is never closed");
        tokio::fs::write(path, bytes)
            .await
            .map_err(|source| BuildError::WriteFile {
                path: path.to_path_buf(),
                source,
            })?;
        self.documents.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Appends `.json` to `base`. The document shares its base name with the
/// directory holding its children; `Path::with_extension` would eat dots
/// inside the segment ("v1.2" must become "v1.2.json").
fn json_sibling(base: &Path) -> PathBuf {
    let mut path = base.as_os_str().to_os_string();
    path.push(".json");
    PathBuf::from(path)
}

fn join_route(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_owned()
    } else {
        format!("{prefix}/{segment}")
    }
}

/// Reject segments that would escape or collapse the mirrored tree.
fn validate_segment(segment: &str, route_prefix: &str) -> Result<(), BuildError> {
    if segment.is_empty() || segment == "." || segment == ".." || segment.contains(['/', '\\']) {
        return Err(BuildError::InvalidSegment {
            segment: segment.to_owned(),
            parent: if route_prefix.is_empty() {
                "/".to_owned()
            } else {
                route_prefix.to_owned()
            },
        });
    }
    Ok(())
}

/// Hidden staging directory next to the output root (same filesystem, so the
/// final rename is atomic).
fn staging_dir(out_dir: &Path) -> PathBuf {
    let name = out_dir
        .file_name()
        .map_or_else(|| "out".to_owned(), |n| n.to_string_lossy().into_owned());
    let suffix = uuid::Uuid::new_v4().simple();
    out_dir.with_file_name(format!(".{name}.staging-{suffix}"))
}

/// Swap the completed staging tree into the published path.
async fn publish(staging: &Path, out_dir: &Path) -> Result<(), BuildError> {
    match tokio::fs::remove_dir_all(out_dir).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(BuildError::Publish {
                path: out_dir.to_path_buf(),
                source,
            });
        }
    }
    tokio::fs::rename(staging, out_dir)
        .await
        .map_err(|source| BuildError::Publish {
            path: out_dir.to_path_buf(),
            source,
        })
}
