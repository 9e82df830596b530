//! In-memory index from absolute paths to the file and directory nodes of a virtual
//! filesystem tree.

use tracing::level_filters::LevelFilter;

pub use errno::Errno;
pub use index::{split_path, Index, ROOT};
pub use listing::{
    FileKind, Listing, Stat, DEFAULT_DIR_MODE, DEFAULT_FILE_MODE, UNKNOWN_SIZE,
};
pub use node::{Dir, File, Node};

mod errno;
mod index;
mod listing;
mod node;

pub type Result<T> = std::result::Result<T, Errno>;

/// Install the global tracing subscriber. Only the first call takes effect.
pub fn log_init(debug: bool, json: bool) {
    let level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let builder = tracing_subscriber::fmt().with_max_level(level);

    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
