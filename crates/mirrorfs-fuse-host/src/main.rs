// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! mirrorfs FUSE Host — Linux loopback filesystem adapter
//!
//! This binary mounts a backing directory as a FUSE filesystem and forwards
//! every request to the mirrorfs core.

#[cfg(all(feature = "fuse", target_os = "linux"))]
mod adapter;

#[cfg(all(feature = "fuse", target_os = "linux"))]
use adapter::MirrorFsFuse;
use anyhow::{Context, Result};
use clap::Parser;
use mirrorfs_core::MountConfig;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
struct Args {
    /// Mount point for the filesystem
    mount_point: PathBuf,

    /// Backing directory the mount mirrors
    #[arg(short, long, required_unless_present = "config")]
    root: Option<PathBuf>,

    /// Configuration file (JSON)
    #[arg(short, long, conflicts_with = "root")]
    config: Option<PathBuf>,

    /// Allow other users to access the filesystem
    #[arg(long)]
    allow_other: bool,

    /// Allow root to access the filesystem
    #[arg(long)]
    allow_root: bool,

    /// Auto unmount on process exit
    #[arg(long)]
    auto_unmount: bool,
}

fn load_config(root: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<MountConfig> {
    match config_path {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let config: MountConfig = serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?;
            Ok(config)
        }
        None => {
            let root = root.context("either a backing root or --config is required")?;
            Ok(MountConfig::new(root))
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    info!("Starting mirrorfs FUSE host");
    info!("Mount point: {}", args.mount_point.display());

    let config = load_config(args.root.clone(), args.config.clone())?;
    info!("Backing root: {}", config.root.display());

    #[cfg(all(feature = "fuse", target_os = "linux"))]
    {
        let filesystem = MirrorFsFuse::new(config)?;

        let mut mount_options = vec![
            fuser::MountOption::FSName("mirrorfs".to_string()),
            fuser::MountOption::Subtype("mirrorfs".to_string()),
            fuser::MountOption::DefaultPermissions,
        ];

        if args.allow_other {
            mount_options.push(fuser::MountOption::AllowOther);
        }

        if args.allow_root {
            mount_options.push(fuser::MountOption::AllowRoot);
        }

        if args.auto_unmount {
            mount_options.push(fuser::MountOption::AutoUnmount);
        }

        info!("Mounting filesystem...");
        let session = fuser::spawn_mount2(filesystem, &args.mount_point, &mount_options)?;
        info!("mirrorfs mounted; blocking until unmount");
        session.join();
    }

    #[cfg(not(all(feature = "fuse", target_os = "linux")))]
    {
        tracing::warn!("FUSE support not compiled in. This binary is for testing only.");
        info!(
            "mirrorfs core configuration accepted for {}",
            config.root.display()
        );
        info!("To enable FUSE support, compile with: cargo build --features fuse");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_from_positional_root() {
        let config = load_config(Some(PathBuf::from("/srv/data")), None).unwrap();
        assert_eq!(config.root, PathBuf::from("/srv/data"));
    }

    #[test]
    fn test_config_from_json_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(br#"{"root": "/srv/backing"}"#).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(None, Some(temp_file.path().to_path_buf())).unwrap();
        assert_eq!(config.root, PathBuf::from("/srv/backing"));
    }

    #[test]
    fn test_config_requires_a_root_source() {
        assert!(load_config(None, None).is_err());
    }

    #[test]
    fn test_args_require_root_or_config() {
        assert!(Args::try_parse_from(["mirrorfs-fuse-host", "/mnt/point"]).is_err());
        assert!(Args::try_parse_from([
            "mirrorfs-fuse-host",
            "/mnt/point",
            "--root",
            "/srv/data"
        ])
        .is_ok());
        assert!(Args::try_parse_from([
            "mirrorfs-fuse-host",
            "/mnt/point",
            "--config",
            "/etc/mirrorfs.json"
        ])
        .is_ok());
    }
}
