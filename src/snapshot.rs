//! Point-in-time snapshots of a scan and the diff between two of them.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tree::Tree;

/// A single file's captured state at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub path: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtime: Option<String>,
}

/// A frozen, comparable view of a scan's file list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub snapshot_id: String,
    pub scan_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub path: String,
    pub created_at: String,
    pub files: Vec<SnapshotFile>,
}

/// Transport-cheap view of a Snapshot, omitting the file list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub snapshot_id: String,
    pub scan_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub created_at: String,
    pub file_count: usize,
    pub total_size: u64,
}

impl Snapshot {
    /// Captures `tree`'s current file list under a fresh snapshot id.
    pub fn create(scan_id: impl Into<String>, tree: &Tree, label: Option<String>, notes: Option<String>) -> Self {
        let files = tree
            .traverse()
            .into_iter()
            .map(|f| SnapshotFile {
                path: f.path.clone(),
                size: f.metadata.size,
                content_hash: f.content_hash().map(|s| s.to_string()),
                mtime: if f.metadata.times.modified == "unknown" {
                    None
                } else {
                    Some(f.metadata.times.modified.clone())
                },
            })
            .collect();

        Snapshot {
            snapshot_id: Uuid::new_v4().to_string(),
            scan_id: scan_id.into(),
            label,
            notes,
            path: tree.root_path.clone(),
            created_at: Utc::now().to_rfc3339(),
            files,
        }
    }

    pub fn to_summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            snapshot_id: self.snapshot_id.clone(),
            scan_id: self.scan_id.clone(),
            label: self.label.clone(),
            created_at: self.created_at.clone(),
            file_count: self.files.len(),
            total_size: self.files.iter().map(|f| f.size).sum(),
        }
    }

    fn by_path(&self) -> HashMap<&str, &SnapshotFile> {
        self.files.iter().map(|f| (f.path.as_str(), f)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Added {
    pub path: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Removed {
    pub path: String,
    pub old_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modified {
    pub path: String,
    pub old_size: u64,
    pub new_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Renamed {
    pub from: String,
    pub to: String,
    pub old_size: u64,
    pub new_size: u64,
}

/// The four disjoint change lists between two snapshots. Every path that
/// appears in either snapshot appears in exactly one list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDiff {
    pub from_snapshot_id: String,
    pub to_snapshot_id: String,
    pub added: Vec<Added>,
    pub removed: Vec<Removed>,
    pub modified: Vec<Modified>,
    pub renamed: Vec<Renamed>,
}

impl SnapshotDiff {
    pub fn total_changes(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len() + self.renamed.len()
    }

    pub fn size_delta(&self) -> i64 {
        let added: i64 = self.added.iter().map(|a| a.size as i64).sum();
        let removed: i64 = self.removed.iter().map(|r| -(r.old_size as i64)).sum();
        let modified: i64 = self
            .modified
            .iter()
            .map(|m| m.new_size as i64 - m.old_size as i64)
            .sum();
        let renamed: i64 = self
            .renamed
            .iter()
            .map(|r| r.new_size as i64 - r.old_size as i64)
            .sum();
        added + removed + modified + renamed
    }
}

/// Compares two snapshots and partitions every changed path into one of
/// added/removed/modified/renamed. A path removed from `a` is treated as a
/// rename candidate only if its content hash reappears, unconsumed, under a
/// different path in `b`; ties break on the lexicographically smallest
/// candidate path so the result is deterministic regardless of iteration
/// order.
pub fn diff(a: &Snapshot, b: &Snapshot) -> SnapshotDiff {
    let a_by_path = a.by_path();
    let b_by_path = b.by_path();

    let a_only: HashSet<&str> = a_by_path
        .keys()
        .filter(|p| !b_by_path.contains_key(*p))
        .copied()
        .collect();
    let mut b_only: HashSet<&str> = b_by_path
        .keys()
        .filter(|p| !a_by_path.contains_key(*p))
        .copied()
        .collect();

    let mut b_by_hash: HashMap<&str, Vec<&str>> = HashMap::new();
    for path in &b_only {
        if let Some(hash) = b_by_path[path].content_hash.as_deref() {
            b_by_hash.entry(hash).or_default().push(path);
        }
    }
    for candidates in b_by_hash.values_mut() {
        candidates.sort_unstable();
    }

    let mut a_only_sorted: Vec<&str> = a_only.into_iter().collect();
    a_only_sorted.sort_unstable();

    let mut renamed = Vec::new();
    let mut removed = Vec::new();

    for path in a_only_sorted {
        let old_file = a_by_path[path];
        let candidate = old_file
            .content_hash
            .as_deref()
            .and_then(|hash| b_by_hash.get(hash))
            .and_then(|candidates| candidates.iter().find(|c| b_only.contains(*c)))
            .copied();

        match candidate {
            Some(new_path) => {
                b_only.remove(new_path);
                let new_file = b_by_path[new_path];
                renamed.push(Renamed {
                    from: old_file.path.clone(),
                    to: new_file.path.clone(),
                    old_size: old_file.size,
                    new_size: new_file.size,
                });
            }
            None => removed.push(Removed {
                path: old_file.path.clone(),
                old_size: old_file.size,
            }),
        }
    }

    let mut added: Vec<Added> = b_only
        .into_iter()
        .map(|path| {
            let file = b_by_path[path];
            Added {
                path: file.path.clone(),
                size: file.size,
            }
        })
        .collect();
    added.sort_by(|x, y| x.path.cmp(&y.path));

    let mut modified = Vec::new();
    let mut common: Vec<&str> = a_by_path
        .keys()
        .filter(|p| b_by_path.contains_key(*p))
        .copied()
        .collect();
    common.sort_unstable();
    for path in common {
        let old_file = a_by_path[path];
        let new_file = b_by_path[path];
        let differs = match (&old_file.content_hash, &new_file.content_hash) {
            (Some(h1), Some(h2)) => h1 != h2,
            (None, None) => old_file.size != new_file.size || old_file.mtime != new_file.mtime,
            _ => true,
        };
        if differs {
            modified.push(Modified {
                path: old_file.path.clone(),
                old_size: old_file.size,
                new_size: new_file.size,
            });
        }
    }

    removed.sort_by(|x, y| x.path.cmp(&y.path));
    renamed.sort_by(|x, y| x.from.cmp(&y.from));

    SnapshotDiff {
        from_snapshot_id: a.snapshot_id.clone(),
        to_snapshot_id: b.snapshot_id.clone(),
        added,
        removed,
        modified,
        renamed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn snap(files: Vec<(&str, u64, Option<&str>)>) -> Snapshot {
        Snapshot {
            snapshot_id: "id".to_string(),
            scan_id: "scan".to_string(),
            label: None,
            notes: None,
            path: "/root".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            files: files
                .into_iter()
                .map(|(path, size, hash)| SnapshotFile {
                    path: path.to_string(),
                    size,
                    content_hash: hash.map(|s| s.to_string()),
                    mtime: None,
                })
                .collect(),
        }
    }

    #[test]
    fn create_captures_every_file_with_fresh_uuid() {
        let mut tree = Tree::new("/root");
        tree.attach_file(
            "/root/a.txt",
            crate::metadata::Metadata::extract(Path::new("/root/a.txt"), false),
            HashMap::new(),
        )
        .unwrap();

        let snapshot = Snapshot::create("scan-1", &tree, Some("label".to_string()), None);
        assert_eq!(snapshot.files.len(), 1);
        assert_eq!(snapshot.scan_id, "scan-1");
        assert!(Uuid::parse_str(&snapshot.snapshot_id).is_ok());
    }

    #[test]
    fn diff_detects_added_and_removed() {
        let a = snap(vec![("/root/a.txt", 10, Some("h1"))]);
        let b = snap(vec![("/root/b.txt", 20, Some("h2"))]);

        let d = diff(&a, &b);
        assert_eq!(d.added.len(), 1);
        assert_eq!(d.removed.len(), 1);
        assert!(d.renamed.is_empty());
        assert!(d.modified.is_empty());
    }

    #[test]
    fn diff_detects_rename_by_matching_content_hash() {
        let a = snap(vec![("/root/a.txt", 10, Some("h1"))]);
        let b = snap(vec![("/root/renamed.txt", 10, Some("h1"))]);

        let d = diff(&a, &b);
        assert_eq!(d.renamed.len(), 1);
        assert_eq!(d.renamed[0].from, "/root/a.txt");
        assert_eq!(d.renamed[0].to, "/root/renamed.txt");
        assert!(d.added.is_empty());
        assert!(d.removed.is_empty());
    }

    #[test]
    fn diff_rename_tiebreaks_on_lexicographically_smallest_candidate() {
        let a = snap(vec![("/root/a.txt", 10, Some("h1"))]);
        let b = snap(vec![
            ("/root/z.txt", 10, Some("h1")),
            ("/root/b.txt", 10, Some("h1")),
        ]);

        let d = diff(&a, &b);
        assert_eq!(d.renamed.len(), 1);
        assert_eq!(d.renamed[0].to, "/root/b.txt");
        assert_eq!(d.added.len(), 1);
        assert_eq!(d.added[0].path, "/root/z.txt");
    }

    #[test]
    fn diff_detects_modified_by_hash_mismatch() {
        let a = snap(vec![("/root/a.txt", 10, Some("h1"))]);
        let b = snap(vec![("/root/a.txt", 12, Some("h2"))]);

        let d = diff(&a, &b);
        assert_eq!(d.modified.len(), 1);
        assert_eq!(d.modified[0].old_size, 10);
        assert_eq!(d.modified[0].new_size, 12);
    }

    #[test]
    fn diff_falls_back_to_size_when_no_hashes() {
        let a = snap(vec![("/root/a.txt", 10, None)]);
        let b = snap(vec![("/root/a.txt", 20, None)]);
        let d = diff(&a, &b);
        assert_eq!(d.modified.len(), 1);
    }

    #[test]
    fn every_path_appears_in_exactly_one_list() {
        let a = snap(vec![
            ("/root/unchanged.txt", 10, Some("h0")),
            ("/root/old_name.txt", 5, Some("hren")),
            ("/root/gone.txt", 7, Some("hgone")),
            ("/root/changed.txt", 8, Some("hbefore")),
        ]);
        let b = snap(vec![
            ("/root/unchanged.txt", 10, Some("h0")),
            ("/root/new_name.txt", 5, Some("hren")),
            ("/root/new.txt", 3, Some("hnew")),
            ("/root/changed.txt", 9, Some("hafter")),
        ]);

        let d = diff(&a, &b);
        assert_eq!(d.total_changes(), 3);
        assert_eq!(d.renamed.len(), 1);
        assert_eq!(d.added.len(), 1);
        assert_eq!(d.removed.len(), 0);
        assert_eq!(d.modified.len(), 1);
    }

    #[test]
    fn size_delta_sums_across_all_change_kinds() {
        let a = snap(vec![("/root/old.txt", 100, Some("h1")), ("/root/shrink.txt", 50, Some("h2"))]);
        let b = snap(vec![("/root/new.txt", 30, Some("h3")), ("/root/shrink.txt", 20, Some("h2"))]);

        let d = diff(&a, &b);
        assert_eq!(d.size_delta(), 30 - 100 + (20 - 50));
    }

    #[test]
    fn to_summary_omits_file_list() {
        let snapshot = snap(vec![("/root/a.txt", 10, Some("h1")), ("/root/b.txt", 20, Some("h2"))]);
        let summary = snapshot.to_summary();
        assert_eq!(summary.file_count, 2);
        assert_eq!(summary.total_size, 30);
    }
}
