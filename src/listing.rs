use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::index::{Index, ROOT};
use crate::node::{Dir, File, Node};

/// Size of a file built from a listing, which carries no sizes.
pub const UNKNOWN_SIZE: u64 = u64::MAX;

pub const DEFAULT_FILE_MODE: u32 = libc::S_IFREG as u32 | 0o644;
pub const DEFAULT_DIR_MODE: u32 = libc::S_IFDIR as u32 | 0o755;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FileKind {
    RegularFile,
    Directory,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Stat {
    pub kind: FileKind,
    pub size: u64,
    pub mode: u32,
}

impl Stat {
    pub fn unknown_file() -> Self {
        Self {
            kind: FileKind::RegularFile,
            size: UNKNOWN_SIZE,
            mode: DEFAULT_FILE_MODE,
        }
    }

    pub fn directory() -> Self {
        Self {
            kind: FileKind::Directory,
            size: 0,
            mode: DEFAULT_DIR_MODE,
        }
    }

    #[inline]
    pub fn is_size_known(&self) -> bool {
        self.size != UNKNOWN_SIZE
    }

    /// Permission bits without the file type.
    #[inline]
    pub fn perm(&self) -> u16 {
        (self.mode & 0o7777) as u16
    }
}

/// A pre-fetched directory listing: each name maps to a nested listing for a directory, or to
/// nothing for a file.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(transparent)]
pub struct Listing(pub BTreeMap<String, Option<Listing>>);

impl Index<Stat> {
    /// Build an index from a nested listing.
    ///
    /// Subtrees are walked with an explicit stack, so arbitrarily deep listings don't grow the
    /// call stack. Sibling directories are not indexed in listing order.
    pub fn from_listing(listing: &Listing) -> Self {
        let mut index = Index::with_root(Dir::new(Some(Stat::directory())));

        let mut pending = vec![(String::new(), listing, index.root().clone())];
        let mut dir_count = 0usize;
        let mut file_count = 0usize;

        while let Some((prefix, listing, parent)) = pending.pop() {
            for (name, entry) in listing.0.iter() {
                if name.is_empty() || name.contains('/') {
                    warn!("skip invalid name {:?} under {:?}", name, prefix);

                    continue;
                }

                let path = format!("{}/{}", prefix, name);

                match entry {
                    None => {
                        parent.add_child(name, Node::from(File::new(Stat::unknown_file())));

                        file_count += 1;
                    }

                    Some(sub_listing) => {
                        let dir = Dir::new(Some(Stat::directory()));

                        parent.add_child(name, Node::from(&dir));
                        index.register(path.clone(), &dir);

                        dir_count += 1;

                        pending.push((path, sub_listing, dir));
                    }
                }
            }

            debug!(
                "indexed {}",
                if prefix.is_empty() { ROOT } else { prefix.as_str() }
            );
        }

        info!("index built with {} dirs and {} files", dir_count, file_count);

        index
    }
}
