use std::collections::HashMap;

use tracing::{debug, warn};

use crate::errno::Errno;
use crate::node::{Dir, Node, WeakDir};
use crate::Result;

pub const ROOT: &str = "/";

/// Split an absolute path into its parent directory path and its leaf name.
///
/// `/a/b/c` gives `("/a/b", "c")`, `/a` gives `("/", "a")`. The root splits into `("/", "")`,
/// so the parent path equals the path itself only for the root.
pub fn split_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        None => ("", path),
        Some(0) => (ROOT, &path[1..]),
        Some(index) => (&path[..index], &path[index + 1..]),
    }
}

fn join_path(dir_path: &str, name: &str) -> String {
    if dir_path == ROOT {
        format!("/{}", name)
    } else {
        format!("{}/{}", dir_path, name)
    }
}

/// Path index over a tree of [`Node`]s.
///
/// Every directory is owned by its parent's children map, the root by the index itself.
/// `dirs` only holds weak handles keyed by absolute path so a directory resolves without
/// walking the tree.
pub struct Index<T> {
    root: Dir<T>,
    dirs: HashMap<String, WeakDir<T>>,
}

impl<T> Default for Index<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<T> {
    pub fn new() -> Self {
        Self::with_root(Dir::new(None))
    }

    pub fn with_root(root: Dir<T>) -> Self {
        let mut dirs = HashMap::new();

        dirs.insert(ROOT.to_owned(), root.downgrade());

        Self { root, dirs }
    }

    pub fn root(&self) -> &Dir<T> {
        &self.root
    }

    pub(crate) fn register(&mut self, path: String, dir: &Dir<T>) {
        self.dirs.insert(path, dir.downgrade());
    }

    fn dir(&self, path: &str) -> Option<Dir<T>> {
        self.dirs.get(path).and_then(WeakDir::upgrade)
    }

    /// Whether `path` is a registered directory.
    pub fn is_dir(&self, path: &str) -> bool {
        self.dir(path).is_some()
    }

    /// Every registered directory path, sorted.
    pub fn dir_paths(&self) -> Vec<String> {
        let mut paths: Vec<_> = self
            .dirs
            .iter()
            .filter(|(_, dir)| dir.upgrade().is_some())
            .map(|(path, _)| path.clone())
            .collect();

        paths.sort_unstable();

        paths
    }

    /// Insert `node` at `path`, creating missing parent directories.
    ///
    /// Registering the same directory handle at a path it already occupies succeeds and
    /// changes nothing. Any other occupant makes this return `Ok(false)`.
    ///
    /// Parents created on the way are kept even when the final insertion fails.
    pub fn add_path(&mut self, path: &str, node: Node<T>) -> Result<bool> {
        if !path.starts_with('/') {
            return Err(Errno::from(libc::EINVAL));
        }

        if let Some(exist_dir) = self.dir(path) {
            return Ok(match &node {
                Node::Dir(dir) => dir.ptr_eq(&exist_dir),
                Node::File(_) => false,
            });
        }

        let (dir_path, name) = split_path(path);

        let parent = match self.dir(dir_path) {
            Some(parent) => parent,
            None => {
                debug!("create missing parent {}", dir_path);

                let parent = Dir::new(None);

                if !self.add_path(dir_path, Node::from(&parent))? {
                    debug!("parent {} of {} can't be created", dir_path, path);

                    return Ok(false);
                }

                parent
            }
        };

        let dir = node.as_dir().cloned();

        if !parent.add_child(name, node) {
            debug!("{} already exists", path);

            return Ok(false);
        }

        if let Some(dir) = dir {
            self.register(path.to_owned(), &dir);
        }

        Ok(true)
    }

    /// Insert `node` at `path` without checking for an existing entry or an absolute path.
    ///
    /// Missing parents are still created, but a parent that can't be attached to the tree is
    /// not reported: the node is inserted into the new parent regardless. Returns false only
    /// when the direct parent already has a child with the leaf name.
    ///
    /// Directories that end up under a detached parent are not registered, so the index never
    /// resolves a directory the tree can't reach.
    pub fn add_path_fast(&mut self, path: &str, node: Node<T>) -> bool {
        self.insert_fast(path, node).0
    }

    /// Returns whether the node was inserted and whether it is reachable from the root.
    fn insert_fast(&mut self, path: &str, node: Node<T>) -> (bool, bool) {
        let (dir_path, name) = split_path(path);

        let (parent, attached) = match self.dir(dir_path) {
            Some(parent) => (parent, true),
            None => {
                let parent = Dir::new(None);

                let attached = dir_path != path && {
                    let (inserted, attached) = self.insert_fast(dir_path, Node::from(&parent));

                    inserted && attached
                };

                if !attached {
                    warn!("parent {} of {} is not attached", dir_path, path);
                }

                (parent, attached)
            }
        };

        let dir = node.as_dir().cloned();

        if !parent.add_child(name, node) {
            return (false, attached);
        }

        if let Some(dir) = dir {
            if attached {
                self.register(path.to_owned(), &dir);
            }
        }

        (true, attached)
    }

    /// Remove the node at `path`. A removed directory takes all of its descendants out of
    /// the index with it. The root can't be removed.
    pub fn remove_path(&mut self, path: &str) -> Option<Node<T>> {
        let (dir_path, name) = split_path(path);

        if dir_path == path {
            debug!("refuse to remove {}", path);

            return None;
        }

        let parent = self.dir(dir_path)?;

        let node = parent.remove_child(name)?;

        if let Node::Dir(dir) = &node {
            for child_name in dir.list_children() {
                let child_path = join_path(path, &child_name);

                if self.remove_path(&child_path).is_none() {
                    debug!("cascading removal skip {}", child_path);
                }
            }

            self.dirs.remove(path);
        }

        debug!("removed {}", path);

        Some(node)
    }

    /// Names of the children of the directory at `path`, or `None` if `path` is not a
    /// registered directory.
    pub fn ls(&self, path: &str) -> Option<Vec<String>> {
        self.dir(path).map(|dir| dir.list_children())
    }

    pub fn get_inode(&self, path: &str) -> Option<Node<T>> {
        let (dir_path, name) = split_path(path);

        let parent = self.dir(dir_path)?;

        if dir_path == path {
            return Some(Node::Dir(parent));
        }

        parent.get_child(name)
    }
}
