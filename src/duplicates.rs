//! Exact and near-duplicate detection over a scanned Tree.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::hasher;
use crate::tree::FileNode;

/// Whether a group was formed from an exact content-hash match or a
/// perceptual-hash proximity match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupKind {
    Exact,
    Near,
}

/// A cluster of files considered duplicate or near-duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub id: String,
    pub kind: GroupKind,
    pub members: Vec<FileNode>,
    pub total_size: u64,
    pub wastage: u64,
    pub representative: FileNode,
}

fn build_group(id: String, kind: GroupKind, members: Vec<FileNode>) -> DuplicateGroup {
    let total_size: u64 = members.iter().map(|m| m.metadata.size).sum();
    let min_size = members.iter().map(|m| m.metadata.size).min().unwrap_or(0);
    let wastage = total_size.saturating_sub(min_size);
    let representative = pick_representative(&members);

    DuplicateGroup {
        id,
        kind,
        members,
        total_size,
        wastage,
        representative,
    }
}

/// Most recently modified member; on ties, the lexicographically smallest
/// path.
fn pick_representative(members: &[FileNode]) -> FileNode {
    members
        .iter()
        .min_by(|a, b| {
            b.metadata
                .times
                .modified
                .cmp(&a.metadata.times.modified)
                .then_with(|| a.path.cmp(&b.path))
        })
        .cloned()
        .expect("duplicate groups always have at least one member")
}

/// Statistics summarizing a detection pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateStats {
    pub exact_groups: usize,
    pub exact_files: usize,
    pub near_groups: usize,
    pub near_files: usize,
    pub total_wastage_bytes: u64,
    pub largest_group_size: usize,
}

impl DuplicateStats {
    pub fn total_wastage_mib(&self) -> f64 {
        self.total_wastage_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Full report from a `detect` call, matching the external interface's
/// `{exact, near, stats}` shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateReport {
    pub exact: Vec<DuplicateGroup>,
    pub near: Vec<DuplicateGroup>,
    pub stats: DuplicateStats,
}

/// Options controlling which passes `detect` runs.
#[derive(Debug, Clone)]
pub struct DetectOptions {
    pub detect_exact: bool,
    pub detect_near: bool,
    pub perceptual_threshold: u32,
}

impl Default for DetectOptions {
    fn default() -> Self {
        DetectOptions {
            detect_exact: true,
            detect_near: true,
            perceptual_threshold: 10,
        }
    }
}

/// Groups files by content hash. Files without a content hash are never
/// emitted; only hashes with two or more members become a group.
pub fn find_exact_duplicates(files: &[FileNode]) -> Vec<DuplicateGroup> {
    let mut by_hash: HashMap<&str, Vec<&FileNode>> = HashMap::new();
    for file in files {
        if let Some(hash) = file.content_hash() {
            by_hash.entry(hash).or_default().push(file);
        }
    }

    let mut groups: Vec<DuplicateGroup> = by_hash
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(hash, members)| {
            let id = format!("exact_{}", &hash[..hash.len().min(16)]);
            build_group(id, GroupKind::Exact, members.into_iter().cloned().collect())
        })
        .collect();

    groups.sort_by(|a, b| a.id.cmp(&b.id));
    groups
}

/// Cheap pre-filter: groups files by size, retaining only size classes with
/// two or more members. Not a substitute for exact detection — two files of
/// equal size are not thereby duplicates — but narrows the candidate set an
/// exact pass then hashes.
pub fn group_by_size(files: &[FileNode], min_size: u64) -> HashMap<u64, Vec<&FileNode>> {
    let mut by_size: HashMap<u64, Vec<&FileNode>> = HashMap::new();
    for file in files {
        if file.metadata.size >= min_size {
            by_size.entry(file.metadata.size).or_default().push(file);
        }
    }
    by_size.retain(|_, members| members.len() >= 2);
    by_size
}

/// Greedy single-linkage clustering over perceptual hashes: sort ascending,
/// then for each unvisited hash absorb every later unvisited hash within
/// the threshold. Not transitive beyond direct neighbors of the seed — a
/// BK-tree + connected-components pass is the accelerator for callers that
/// need full transitive clustering, but is not part of the default path.
pub fn find_similar_images(files: &[FileNode], threshold: u32) -> Vec<DuplicateGroup> {
    let mut by_hash: HashMap<u64, Vec<&FileNode>> = HashMap::new();
    for file in files {
        if let Some(hex) = file.perceptual_hash() {
            if let Some(hash) = hasher::parse_perceptual_hash(hex) {
                by_hash.entry(hash).or_default().push(file);
            }
        }
    }

    let mut hashes: Vec<u64> = by_hash.keys().copied().collect();
    hashes.sort_unstable();

    let mut visited = vec![false; hashes.len()];
    let mut groups = Vec::new();
    let mut counter = 0usize;

    for i in 0..hashes.len() {
        if visited[i] {
            continue;
        }
        visited[i] = true;
        let mut cluster_hashes = vec![hashes[i]];

        for j in (i + 1)..hashes.len() {
            if visited[j] {
                continue;
            }
            if hasher::hamming_distance(hashes[i], hashes[j]) <= threshold {
                visited[j] = true;
                cluster_hashes.push(hashes[j]);
            }
        }

        let members: Vec<FileNode> = cluster_hashes
            .iter()
            .flat_map(|h| by_hash.get(h).into_iter().flatten())
            .map(|f| (*f).clone())
            .collect();

        if members.len() >= 2 {
            let id = format!("near_{counter}");
            counter += 1;
            groups.push(build_group(id, GroupKind::Near, members));
        }
    }

    groups
}

/// Runs exact and/or near detection per `options` and assembles the
/// aggregate statistics.
pub fn detect(files: &[FileNode], options: &DetectOptions) -> DuplicateReport {
    let exact = if options.detect_exact {
        find_exact_duplicates(files)
    } else {
        Vec::new()
    };
    let near = if options.detect_near {
        find_similar_images(files, options.perceptual_threshold)
    } else {
        Vec::new()
    };

    let exact_files: usize = exact.iter().map(|g| g.members.len()).sum();
    let near_files: usize = near.iter().map(|g| g.members.len()).sum();
    let total_wastage_bytes: u64 = exact.iter().chain(near.iter()).map(|g| g.wastage).sum();
    let largest_group_size = exact
        .iter()
        .chain(near.iter())
        .map(|g| g.members.len())
        .max()
        .unwrap_or(0);

    let exact_groups = exact.len();
    let near_groups = near.len();

    DuplicateReport {
        exact,
        near,
        stats: DuplicateStats {
            exact_groups,
            exact_files,
            near_groups,
            near_files,
            total_wastage_bytes,
            largest_group_size,
        },
    }
}
