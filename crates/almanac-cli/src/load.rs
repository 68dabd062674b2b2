use std::fs;
use std::path::{Path, PathBuf};

use almanac_engine::{Calendar, CalendarCollection};
use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

/// One snapshot file: a single calendar or an array of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum Snapshot {
    Many(Vec<Calendar>),
    One(Calendar),
}

/// Load every calendar named by `paths`, in argument order.
///
/// A directory contributes each `*.json` file it contains, sorted by name.
pub fn load_collection(paths: &[PathBuf]) -> Result<CalendarCollection> {
    let mut collection = CalendarCollection::new();
    for path in paths {
        for file in snapshot_files(path)? {
            let calendars = read_snapshot(&file)?;
            debug!(path = %file.display(), calendars = calendars.len(), "loaded snapshot");
            collection.extend(calendars);
        }
    }
    Ok(collection)
}

fn snapshot_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let entries = fs::read_dir(path).with_context(|| format!("failed to list {}", path.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let file = entry
            .with_context(|| format!("failed to list {}", path.display()))?
            .path();
        if file.is_file() && file.extension().is_some_and(|ext| ext == "json") {
            files.push(file);
        }
    }
    files.sort();
    Ok(files)
}

fn read_snapshot(path: &Path) -> Result<Vec<Calendar>> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let snapshot: Snapshot =
        serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(match snapshot {
        Snapshot::Many(calendars) => calendars,
        Snapshot::One(calendar) => vec![calendar],
    })
}
