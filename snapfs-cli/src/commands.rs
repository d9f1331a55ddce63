// SPDX-License-Identifier: AGPL-3.0-or-later
//! CLI command implementations

use console::style;
use snapfs_core::{Context, EntryInfo, SnapResult, Snapshot};
use snapfs_vfs::{Handle, VirtualFilesystem};
use std::io::Write;
use tabled::{Table, Tabled};
use tracing::debug;

/// Bytes copied per read in `cat`
const CAT_BUFFER: usize = 64 * 1024;

/// Format a file size
fn format_size(size: u64, human: bool) -> String {
    if human {
        bytesize::ByteSize(size).to_string()
    } else {
        size.to_string()
    }
}

/// Format an entry name, marking directories
fn format_name(entry: &EntryInfo) -> String {
    if entry.is_dir {
        style(format!("{}/", entry.name)).cyan().to_string()
    } else {
        entry.name.clone()
    }
}

fn format_time(entry: &EntryInfo) -> String {
    entry
        .modified
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[derive(Tabled)]
struct LsEntry {
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Modified")]
    modified: String,
    #[tabled(rename = "Name")]
    name: String,
}

impl LsEntry {
    fn new(entry: &EntryInfo, human: bool) -> Self {
        Self {
            mode: entry.mode_string(),
            size: if entry.is_dir {
                "-".to_string()
            } else {
                format_size(entry.size, human)
            },
            modified: format_time(entry),
            name: format_name(entry),
        }
    }
}

#[derive(Tabled)]
struct SnapshotRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Tags")]
    tags: String,
    #[tabled(rename = "Paths")]
    paths: String,
}

impl From<&Snapshot> for SnapshotRow {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            name: snapshot.display_name(),
            id: snapshot.id.short(),
            host: snapshot.hostname.clone().unwrap_or_else(|| "-".to_string()),
            tags: snapshot.tags.join(","),
            paths: snapshot.paths.join(","),
        }
    }
}

/// List the snapshots the filesystem exposes
pub fn snapshots(fs: &VirtualFilesystem) -> SnapResult<()> {
    let rows: Vec<SnapshotRow> = fs.catalog().snapshots().map(SnapshotRow::from).collect();

    if rows.is_empty() {
        println!("(no snapshots)");
    } else {
        println!("{}", Table::new(rows));
    }
    Ok(())
}

/// List directory contents
pub async fn ls(
    fs: &VirtualFilesystem,
    ctx: &Context,
    path: &str,
    long: bool,
    human: bool,
) -> SnapResult<()> {
    debug!(path, "listing");

    let entries = match fs.open(ctx, path).await? {
        Handle::Directory(dir) => dir.into_entries(),
        Handle::File(file) => vec![file.stat()],
    };

    if entries.is_empty() {
        println!("(empty directory)");
    } else if long {
        let rows: Vec<LsEntry> = entries.iter().map(|e| LsEntry::new(e, human)).collect();
        println!("{}", Table::new(rows));
    } else {
        for entry in &entries {
            println!("{}", format_name(entry));
        }
    }

    Ok(())
}

/// Write file contents to stdout
pub async fn cat(fs: &VirtualFilesystem, ctx: &Context, path: &str) -> SnapResult<()> {
    debug!(path, "reading");

    let mut file = fs.open(ctx, path).await?.into_file()?;
    let mut buf = vec![0u8; CAT_BUFFER];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        std::io::stdout().write_all(&buf[..n])?;
    }
    std::io::stdout().flush()?;

    Ok(())
}

/// Show file or directory information
pub async fn stat(fs: &VirtualFilesystem, ctx: &Context, path: &str) -> SnapResult<()> {
    let handle = fs.open(ctx, path).await?;
    let info = handle.stat();

    println!("  Path: {path}");
    println!("  Type: {}", if info.is_dir { "directory" } else { "file" });
    if let Handle::File(file) = &handle {
        println!("  Size: {} ({})", info.size, bytesize::ByteSize(info.size));
        if file.declared_size() != info.size {
            println!("  Recorded size: {} (repaired)", file.declared_size());
        }
        println!("  Chunks: {}", file.chunk_count());
    }
    println!("  Mode: {:o} ({})", info.mode, info.mode_string());
    println!("  Modified: {}", format_time(&info));

    Ok(())
}
