use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use structopt::clap::AppSettings::*;
use structopt::StructOpt;
use tokio::fs;
use tracing::{debug, info, warn};

use pathindex::{log_init, Errno, FileKind, Index, Listing, Node, Stat, ROOT};

#[derive(Debug, Deserialize)]
pub struct Config {
    listing_path: PathBuf,
    debug: Option<bool>,
    json_log: Option<bool>,
    /// file sizes to patch in after the index is built, keyed by absolute path
    sizes: Option<BTreeMap<String, u64>>,
}

#[derive(Debug, StructOpt)]
#[structopt(about = "pathindex query tool.", settings(& [ColorAuto, ColoredHelp]))]
pub struct Argument {
    #[structopt(short, long, default_value = "/etc/pathindex/config.yml", parse(from_os_str))]
    config: PathBuf,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// List the children of a directory
    Ls { path: String },
    /// Show the node at a path
    Stat { path: String },
    /// Print every indexed path
    Tree,
}

pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let cfg_data = fs::read(path.as_ref())
        .await
        .with_context(|| format!("read config {:?} failed", path.as_ref()))?;

    Ok(serde_yaml::from_slice(&cfg_data)?)
}

pub async fn load_index(cfg: &Config) -> Result<Index<Stat>> {
    let listing_data = fs::read(&cfg.listing_path)
        .await
        .with_context(|| format!("read listing {:?} failed", cfg.listing_path))?;

    let listing: Listing = serde_yaml::from_slice(&listing_data).context("invalid listing")?;

    let index = Index::from_listing(&listing);

    if let Some(sizes) = &cfg.sizes {
        let patched = sizes
            .iter()
            .filter(|(path, size)| patch_size(&index, path, **size))
            .count();

        info!("patched {} of {} file sizes", patched, sizes.len());
    }

    Ok(index)
}

fn patch_size(index: &Index<Stat>, path: &str, size: u64) -> bool {
    match index.get_inode(path) {
        Some(Node::File(file)) => {
            let stat = *file.payload();

            file.set_payload(Stat { size, ..stat });

            debug!("patch size of {} to {}", path, size);

            true
        }

        _ => {
            warn!("can't patch size of {}, it is not an indexed file", path);

            false
        }
    }
}

pub fn execute(index: &Index<Stat>, command: &Command) -> Result<String> {
    match command {
        Command::Ls { path } => {
            let names = match index.ls(path) {
                Some(names) => names,
                None => {
                    let errno = if index.get_inode(path).is_some() {
                        Errno::from(libc::ENOTDIR)
                    } else {
                        Errno::from(libc::ENOENT)
                    };

                    return Err(errno).with_context(|| format!("ls {}", path));
                }
            };

            Ok(names.join("\n"))
        }

        Command::Stat { path } => {
            let node = index
                .get_inode(path)
                .ok_or(Errno::from(libc::ENOENT))
                .with_context(|| format!("stat {}", path))?;

            Ok(describe(path, &node))
        }

        Command::Tree => Ok(tree(index)),
    }
}

fn describe(path: &str, node: &Node<Stat>) -> String {
    let stat = match node {
        Node::File(file) => *file.payload(),
        Node::Dir(dir) => match *dir.payload() {
            Some(stat) => stat,
            None => return format!("{} directory", path),
        },
    };

    let kind = match stat.kind {
        FileKind::RegularFile => "file",
        FileKind::Directory => "directory",
    };

    let size = if stat.is_size_known() {
        stat.size.to_string()
    } else {
        "unknown".to_owned()
    };

    format!("{} {} size={} perm={:o}", path, kind, size, stat.perm())
}

/// Every indexed path, sorted, directories suffixed with `/`.
fn tree(index: &Index<Stat>) -> String {
    let mut lines = vec![ROOT.to_owned()];
    let mut pending = vec![(String::new(), index.root().clone())];

    while let Some((prefix, dir)) = pending.pop() {
        for name in dir.list_children() {
            let path = format!("{}/{}", prefix, name);

            match dir.get_child(&name) {
                Some(Node::Dir(child)) => {
                    lines.push(format!("{}/", path));
                    pending.push((path, child));
                }

                _ => lines.push(path),
            }
        }
    }

    lines.sort();

    lines.join("\n")
}

pub async fn run() -> Result<()> {
    let args = Argument::from_args();

    let cfg = load_config(&args.config).await?;

    let debug = if let Some(debug) = cfg.debug {
        debug
    } else {
        false
    };

    let json_log = if let Some(json_log) = cfg.json_log {
        json_log
    } else {
        false
    };

    log_init(debug, json_log);

    info!("load listing {:?}", cfg.listing_path);

    let index = load_index(&cfg).await?;

    println!("{}", execute(&index, &args.command)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const LISTING: &str = r#"
docs:
  readme.txt: ~
  guide:
    intro.md: ~
bin: ~
"#;

    async fn prepare(tmp_dir: &TempDir, sizes: &str) -> Config {
        let listing_path = tmp_dir.path().join("listing.yml");
        let cfg_path = tmp_dir.path().join("config.yml");

        fs::write(&listing_path, LISTING).await.unwrap();
        fs::write(
            &cfg_path,
            format!("listing_path: {}\ndebug: true\n{}", listing_path.display(), sizes),
        )
        .await
        .unwrap();

        load_config(&cfg_path).await.unwrap()
    }

    #[tokio::test]
    async fn load() {
        log_init(true, false);

        let tmp_dir = TempDir::new().unwrap();

        let cfg = prepare(&tmp_dir, "").await;

        assert_eq!(cfg.debug, Some(true));
        assert_eq!(cfg.json_log, None);

        let index = load_index(&cfg).await.unwrap();

        assert_eq!(
            index.ls("/"),
            Some(vec!["bin".to_owned(), "docs".to_owned()])
        );
        assert!(index.is_dir("/docs/guide"));
    }

    #[tokio::test]
    async fn load_missing_config() {
        let tmp_dir = TempDir::new().unwrap();

        assert!(load_config(tmp_dir.path().join("missing.yml")).await.is_err());
    }

    #[tokio::test]
    async fn load_with_sizes() {
        log_init(true, false);

        let tmp_dir = TempDir::new().unwrap();

        let cfg = prepare(&tmp_dir, "sizes:\n  /bin: 10\n  /docs: 20\n  /nope: 30\n").await;

        let index = load_index(&cfg).await.unwrap();

        assert_eq!(
            execute(&index, &Command::Stat { path: "/bin".to_owned() }).unwrap(),
            "/bin file size=10 perm=644"
        );
        assert_eq!(
            execute(&index, &Command::Stat { path: "/docs/readme.txt".to_owned() }).unwrap(),
            "/docs/readme.txt file size=unknown perm=644"
        );
        assert_eq!(
            execute(&index, &Command::Stat { path: "/docs".to_owned() }).unwrap(),
            "/docs directory size=0 perm=755"
        );
    }

    #[tokio::test]
    async fn execute_ls() {
        log_init(true, false);

        let tmp_dir = TempDir::new().unwrap();

        let index = load_index(&prepare(&tmp_dir, "").await).await.unwrap();

        assert_eq!(
            execute(&index, &Command::Ls { path: "/docs".to_owned() }).unwrap(),
            "guide\nreadme.txt"
        );

        let err = execute(&index, &Command::Ls { path: "/bin".to_owned() }).unwrap_err();

        assert_eq!(err.downcast_ref::<Errno>(), Some(&Errno::from(libc::ENOTDIR)));

        let err = execute(&index, &Command::Ls { path: "/nope".to_owned() }).unwrap_err();

        assert_eq!(err.downcast_ref::<Errno>(), Some(&Errno::from(libc::ENOENT)));
    }

    #[tokio::test]
    async fn execute_tree() {
        log_init(true, false);

        let tmp_dir = TempDir::new().unwrap();

        let index = load_index(&prepare(&tmp_dir, "").await).await.unwrap();

        assert_eq!(
            execute(&index, &Command::Tree).unwrap(),
            "/\n/bin\n/docs/\n/docs/guide/\n/docs/guide/intro.md\n/docs/readme.txt"
        );
    }
}
