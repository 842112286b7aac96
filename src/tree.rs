//! The hierarchical in-memory model of a scan: FileNode, DirNode, Tree.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::metadata::Metadata;

/// A single file, owned by exactly one DirNode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    pub path: String,
    pub metadata: Metadata,
    pub hashes: HashMap<String, String>,
}

impl FileNode {
    pub fn new(path: String, metadata: Metadata, hashes: HashMap<String, String>) -> Self {
        FileNode {
            path,
            metadata,
            hashes,
        }
    }

    pub fn content_hash(&self) -> Option<&str> {
        self.hashes.get("content").map(|s| s.as_str())
    }

    pub fn perceptual_hash(&self) -> Option<&str> {
        self.hashes.get("perceptual").map(|s| s.as_str())
    }
}

/// A directory, with ordered (insertion-order, not semantically meaningful)
/// lists of child files and subdirectories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirNode {
    pub path: String,
    pub metadata: Metadata,
    pub files: Vec<FileNode>,
    pub subdirs: Vec<DirNode>,
}

impl DirNode {
    pub fn new(path: String, metadata: Metadata) -> Self {
        DirNode {
            path,
            metadata,
            files: Vec::new(),
            subdirs: Vec::new(),
        }
    }

    fn find_subdir_mut(&mut self, path: &str) -> Option<&mut DirNode> {
        self.subdirs.iter_mut().find(|d| d.path == path)
    }

    fn upsert_file(&mut self, file: FileNode) {
        if let Some(existing) = self.files.iter_mut().find(|f| f.path == file.path) {
            *existing = file;
        } else {
            self.files.push(file);
        }
    }
}

/// A rooted DirNode plus the scan root's absolute path.
///
/// Created empty at scan start; mutated only through `attach_file`, which
/// auto-creates missing ancestor DirNodes up to (but not above) the root.
/// Becomes logically immutable after the worker pool's merge completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub root_path: String,
    pub root: DirNode,
}

impl Tree {
    pub fn new(root_path: impl Into<String>) -> Self {
        let root_path = normalize(&root_path.into());
        let root_metadata = Metadata::extract(Path::new(&root_path), false);
        Tree {
            root: DirNode::new(root_path.clone(), root_metadata),
            root_path,
        }
    }

    /// Attaches a file at `path`, creating missing ancestor DirNodes along
    /// the way. If a file already exists at this path, it is replaced
    /// (last-writer-wins within this tree).
    pub fn attach_file(
        &mut self,
        path: &str,
        metadata: Metadata,
        hashes: HashMap<String, String>,
    ) -> Result<()> {
        let path = normalize(path);
        let rel = self.relative_components(&path)?;

        let parent = self.chain_path(&rel);
        parent.upsert_file(FileNode::new(path, metadata, hashes));
        Ok(())
    }

    /// Path components between the root and `path`, exclusive of the file's
    /// own final component (those become the chain of ancestor DirNodes).
    fn relative_components(&self, path: &str) -> Result<Vec<String>> {
        if !path.starts_with(&self.root_path) {
            return Err(Error::invalid_input(format!(
                "path {path} is not under root {}",
                self.root_path
            )));
        }
        let rel = path
            .strip_prefix(&self.root_path)
            .unwrap()
            .trim_start_matches('/');
        if rel.is_empty() {
            return Err(Error::invalid_input(format!(
                "path {path} equals the scan root"
            )));
        }
        let mut components: Vec<String> = rel.split('/').map(|s| s.to_string()).collect();
        components.pop();
        Ok(components)
    }

    /// Walks from the root, creating any missing intermediate DirNode, and
    /// returns a mutable reference to the final directory in the chain.
    fn chain_path(&mut self, components: &[String]) -> &mut DirNode {
        let mut current = &mut self.root;
        let mut current_path = self.root_path.clone();

        for component in components {
            current_path = format!("{current_path}/{component}");
            if current.find_subdir_mut(&current_path).is_none() {
                let metadata = Metadata::extract(Path::new(&current_path), false);
                current
                    .subdirs
                    .push(DirNode::new(current_path.clone(), metadata));
            }
            current = current.find_subdir_mut(&current_path).unwrap();
        }

        current
    }

    /// Merges `source` into `self` in place. Both roots must be equal paths.
    /// Files present in both are replaced by the source's copy
    /// (last-writer-wins); directories present only in source are copied in.
    pub fn merge(&mut self, source: &Tree) -> Result<()> {
        if self.root_path != source.root_path {
            return Err(Error::merge(format!(
                "cannot merge trees with differing roots: {} vs {}",
                self.root_path, source.root_path
            )));
        }
        merge_dirs(&mut self.root, &source.root);
        Ok(())
    }

    /// Depth-first (stack-order) collection of every FileNode in the tree.
    pub fn traverse(&self) -> Vec<&FileNode> {
        let mut out = Vec::new();
        let mut queue = vec![&self.root];
        while let Some(dir) = queue.pop() {
            out.extend(dir.files.iter());
            queue.extend(dir.subdirs.iter());
        }
        out
    }

    pub fn file_count(&self) -> usize {
        self.traverse().len()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }
}

fn merge_dirs(target: &mut DirNode, source: &DirNode) {
    for file in &source.files {
        target.upsert_file(file.clone());
    }

    for source_sub in &source.subdirs {
        match target.find_subdir_mut(&source_sub.path) {
            Some(target_sub) => merge_dirs(target_sub, source_sub),
            None => target.subdirs.push(source_sub.clone()),
        }
    }
}

fn normalize(path: &str) -> String {
    let p = PathBuf::from(path);
    p.to_string_lossy().replace('\\', "/").trim_end_matches('/').to_string()
}
