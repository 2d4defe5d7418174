//! Batch file-operation executor
//!
//! `perform_files` interprets a nested JSON descriptor of put/delete
//! operations. Sequential groups run their children strictly in order and
//! stop at the first unhandled failure; non-sequential groups run children
//! concurrently with bounded fan-out and report every failure encountered.
//! The descriptor is a tree, consumed once; depth is validated up front with
//! an explicit work stack so no input can exhaust the parser's call stack.

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use gaia_core::error::{GaiaError, Result};
use serde::Deserialize;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use tracing::debug;

/// Content values with this prefix are read from the batch's base directory.
pub const FILE_CONTENT_PREFIX: &str = "file://";

/// Maximum nesting of batch groups.
pub const MAX_BATCH_DEPTH: usize = 64;

/// Fan-out bound for non-sequential groups.
const MAX_PARALLEL_OPS: usize = 8;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// File operations the executor needs from a hub session.
///
/// Implementations must be Send + Sync; batch children of a non-sequential
/// group may call concurrently.
pub trait FileOps: Send + Sync {
    /// Upload content, returning the stored file's read URL.
    fn put<'a>(
        &'a self,
        path: &'a str,
        content: Bytes,
        content_type: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

    /// Delete a file. A missing file surfaces as `GaiaError::NotFound`.
    fn delete<'a>(&'a self, path: &'a str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// A node of the batch descriptor: either a group or a leaf operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BatchNode {
    Group(BatchGroup),
    Op(BatchOp),
}

/// A group of child nodes, ordered or independent.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchGroup {
    pub values: Vec<BatchNode>,
    #[serde(rename = "isSequential", default)]
    pub is_sequential: bool,
    /// Advisory item count carried by the wire format; not used for execution
    #[serde(rename = "nItemsForNs", default)]
    pub n_items_for_ns: Option<u64>,
}

/// A leaf put or delete operation.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchOp {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: BatchOpKind,
    pub path: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(rename = "contentType", default)]
    pub content_type: Option<String>,
    #[serde(rename = "doIgnoreDoesNotExistError", default)]
    pub ignore_does_not_exist: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchOpKind {
    Put,
    Delete,
}

/// Parse and execute a batch descriptor against `ops`.
///
/// Returns the number of leaf operations attempted, counting successes and
/// tolerated failures. `base_dir` anchors `file://` content references.
pub async fn perform_files<O: FileOps>(ops: &O, descriptor: &str, base_dir: &Path) -> Result<u64> {
    let root = parse_batch(descriptor)?;
    run_group(ops, &root, base_dir).await
}

/// Parse the top-level group and validate nesting depth.
pub fn parse_batch(descriptor: &str) -> Result<BatchGroup> {
    let root: BatchGroup = serde_json::from_str(descriptor)
        .map_err(|e| GaiaError::Batch(format!("invalid batch descriptor: {}", e)))?;
    validate_depth(&root)?;
    Ok(root)
}

/// Iterative depth check over an explicit stack.
fn validate_depth(root: &BatchGroup) -> Result<()> {
    let mut stack: Vec<(&BatchNode, usize)> = root.values.iter().map(|node| (node, 1)).collect();

    while let Some((node, depth)) = stack.pop() {
        if depth > MAX_BATCH_DEPTH {
            return Err(GaiaError::Batch(format!(
                "batch nested deeper than {} groups",
                MAX_BATCH_DEPTH
            )));
        }
        if let BatchNode::Group(group) = node {
            for child in &group.values {
                stack.push((child, depth + 1));
            }
        }
    }
    Ok(())
}

// Recursion is heap-boxed: descriptor depth grows the future chain, not the
// native call stack, and depth is already bounded by validate_depth.
fn run_group<'a, O: FileOps>(
    ops: &'a O,
    group: &'a BatchGroup,
    base_dir: &'a Path,
) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + 'a>> {
    Box::pin(async move {
        if let Some(n) = group.n_items_for_ns {
            debug!(
                n_items_for_ns = n,
                sequential = group.is_sequential,
                children = group.values.len(),
                "running batch group"
            );
        }

        if group.is_sequential {
            // Later children may depend on earlier side effects: stop at the
            // first unhandled failure.
            let mut attempted = 0u64;
            for child in &group.values {
                attempted += run_node(ops, child, base_dir).await?;
            }
            Ok(attempted)
        } else {
            // Independent children: attempt all of them, then report every
            // failure together.
            let futures: Vec<Pin<Box<dyn Future<Output = Result<u64>> + Send>>> = group
                .values
                .iter()
                .map(|child| Box::pin(run_node(ops, child, base_dir)) as _)
                .collect();
            let results: Vec<Result<u64>> = stream::iter(futures)
                .buffer_unordered(MAX_PARALLEL_OPS)
                .collect()
                .await;

            let mut attempted = 0u64;
            let mut failures = Vec::new();
            for result in results {
                match result {
                    Ok(count) => attempted += count,
                    Err(err) => failures.push(err.to_string()),
                }
            }

            if failures.is_empty() {
                Ok(attempted)
            } else {
                Err(GaiaError::Batch(failures.join("; ")))
            }
        }
    })
}

async fn run_node<O: FileOps>(ops: &O, node: &BatchNode, base_dir: &Path) -> Result<u64> {
    match node {
        BatchNode::Group(group) => run_group(ops, group, base_dir).await,
        BatchNode::Op(op) => run_op(ops, op, base_dir).await,
    }
}

async fn run_op<O: FileOps>(ops: &O, op: &BatchOp, base_dir: &Path) -> Result<u64> {
    match op.kind {
        BatchOpKind::Put => {
            let content = op.content.as_deref().ok_or_else(|| {
                GaiaError::Batch(format!("put '{}' carries no content", op.path))
            })?;

            let body = if let Some(local) = content.strip_prefix(FILE_CONTENT_PREFIX) {
                Bytes::from(tokio::fs::read(base_dir.join(local)).await?)
            } else {
                Bytes::from(content.as_bytes().to_vec())
            };

            let content_type = op.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE);
            ops.put(&op.path, body, content_type).await?;
            Ok(1)
        }
        BatchOpKind::Delete => match ops.delete(&op.path).await {
            Ok(()) => Ok(1),
            Err(GaiaError::NotFound(_)) if op.ignore_does_not_exist => {
                debug!(path = %op.path, "tolerated delete of missing file");
                Ok(1)
            }
            Err(err) => Err(err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;

    /// In-memory FileOps fake recording call order.
    #[derive(Default)]
    struct FakeStore {
        files: Mutex<BTreeMap<String, Vec<u8>>>,
        calls: Mutex<Vec<String>>,
        fail_puts: Mutex<Vec<String>>,
    }

    impl FakeStore {
        fn failing_put(path: &str) -> Self {
            let store = Self::default();
            store.fail_puts.lock().push(path.to_string());
            store
        }

        fn seed(&self, path: &str, content: &[u8]) {
            self.files.lock().insert(path.to_string(), content.to_vec());
        }
    }

    impl FileOps for FakeStore {
        fn put<'a>(
            &'a self,
            path: &'a str,
            content: Bytes,
            _content_type: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
            Box::pin(async move {
                self.calls.lock().push(format!("put {}", path));
                if self.fail_puts.lock().iter().any(|p| p == path) {
                    return Err(GaiaError::Upload {
                        status: 500,
                        message: format!("forced failure for {}", path),
                    });
                }
                self.files.lock().insert(path.to_string(), content.to_vec());
                Ok(format!("https://read.example/addr/{}", path))
            })
        }

        fn delete<'a>(
            &'a self,
            path: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move {
                self.calls.lock().push(format!("delete {}", path));
                match self.files.lock().remove(path) {
                    Some(_) => Ok(()),
                    None => Err(GaiaError::NotFound(path.to_string())),
                }
            })
        }
    }

    fn base_dir() -> std::path::PathBuf {
        std::path::PathBuf::from("/nonexistent")
    }

    #[tokio::test]
    async fn test_simple_parallel_group() {
        let store = FakeStore::default();
        let descriptor = r#"{
            "values": [
                {"id": "1", "type": "put", "path": "a.txt", "content": "A"},
                {"id": "2", "type": "put", "path": "b.txt", "content": "B"}
            ],
            "isSequential": false,
            "nItemsForNs": 2
        }"#;

        let count = perform_files(&store, descriptor, &base_dir()).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(store.files.lock().len(), 2);
        assert_eq!(store.files.lock()["a.txt"], b"A");
    }

    #[tokio::test]
    async fn test_sequential_stops_after_failure() {
        let store = FakeStore::failing_put("a.txt");
        let descriptor = r#"{
            "values": [
                {"id": "1", "type": "put", "path": "a.txt", "content": "A"},
                {"id": "2", "type": "put", "path": "b.txt", "content": "B"}
            ],
            "isSequential": true
        }"#;

        let result = perform_files(&store, descriptor, &base_dir()).await;
        assert!(result.is_err());
        // b.txt must never be attempted
        assert_eq!(*store.calls.lock(), vec!["put a.txt"]);
    }

    #[tokio::test]
    async fn test_parallel_attempts_all_despite_failure() {
        let store = FakeStore::failing_put("a.txt");
        let descriptor = r#"{
            "values": [
                {"id": "1", "type": "put", "path": "a.txt", "content": "A"},
                {"id": "2", "type": "put", "path": "b.txt", "content": "B"}
            ],
            "isSequential": false
        }"#;

        let result = perform_files(&store, descriptor, &base_dir()).await;
        match result {
            Err(GaiaError::Batch(message)) => assert!(message.contains("a.txt")),
            other => panic!("expected batch failure, got {other:?}"),
        }
        // Both children were attempted
        assert_eq!(store.calls.lock().len(), 2);
        assert!(store.files.lock().contains_key("b.txt"));
    }

    #[tokio::test]
    async fn test_delete_missing_tolerated() {
        let store = FakeStore::default();
        let descriptor = r#"{
            "values": [
                {"id": "1", "type": "delete", "path": "gone.txt",
                 "doIgnoreDoesNotExistError": true}
            ],
            "isSequential": true
        }"#;

        let count = perform_files(&store, descriptor, &base_dir()).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_delete_missing_not_tolerated() {
        let store = FakeStore::default();
        let descriptor = r#"{
            "values": [
                {"id": "1", "type": "delete", "path": "gone.txt"}
            ],
            "isSequential": true
        }"#;

        let result = perform_files(&store, descriptor, &base_dir()).await;
        assert!(matches!(result, Err(GaiaError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_sequential_put_then_delete() {
        let store = FakeStore::default();
        let descriptor = r#"{
            "values": [
                {"id": "1", "type": "put", "path": "tmp.txt", "content": "scratch"},
                {"id": "2", "type": "delete", "path": "tmp.txt"}
            ],
            "isSequential": true
        }"#;

        let count = perform_files(&store, descriptor, &base_dir()).await.unwrap();
        assert_eq!(count, 2);
        assert!(store.files.lock().is_empty());
        assert_eq!(*store.calls.lock(), vec!["put tmp.txt", "delete tmp.txt"]);
    }

    #[tokio::test]
    async fn test_nested_groups() {
        let store = FakeStore::default();
        store.seed("old.txt", b"stale");
        let descriptor = r#"{
            "values": [
                {
                    "values": [
                        {"id": "1", "type": "put", "path": "x.txt", "content": "X"},
                        {"id": "2", "type": "put", "path": "y.txt", "content": "Y"}
                    ],
                    "isSequential": false
                },
                {"id": "3", "type": "delete", "path": "old.txt"}
            ],
            "isSequential": true
        }"#;

        let count = perform_files(&store, descriptor, &base_dir()).await.unwrap();
        assert_eq!(count, 3);
        assert!(!store.files.lock().contains_key("old.txt"));
    }

    #[tokio::test]
    async fn test_file_content_reference() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("payload.bin"), b"from disk").unwrap();

        let store = FakeStore::default();
        let descriptor = r#"{
            "values": [
                {"id": "1", "type": "put", "path": "remote.bin",
                 "content": "file://payload.bin", "contentType": "application/octet-stream"}
            ],
            "isSequential": true
        }"#;

        let count = perform_files(&store, descriptor, dir.path()).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.files.lock()["remote.bin"], b"from disk");
    }

    #[tokio::test]
    async fn test_put_without_content_rejected() {
        let store = FakeStore::default();
        let descriptor = r#"{
            "values": [{"id": "1", "type": "put", "path": "a.txt"}],
            "isSequential": true
        }"#;

        assert!(matches!(
            perform_files(&store, descriptor, &base_dir()).await,
            Err(GaiaError::Batch(_))
        ));
    }

    #[test]
    fn test_depth_bound() {
        // Build a descriptor nested past the depth cap
        let mut inner = r#"{"values": [], "isSequential": true}"#.to_string();
        for _ in 0..(MAX_BATCH_DEPTH + 2) {
            inner = format!(r#"{{"values": [{}], "isSequential": true}}"#, inner);
        }
        assert!(matches!(parse_batch(&inner), Err(GaiaError::Batch(_))));
    }

    #[test]
    fn test_malformed_descriptor_rejected() {
        assert!(parse_batch("not json").is_err());
        assert!(parse_batch(r#"{"values": [{"type": "copy", "path": "x"}]}"#).is_err());
    }
}
