//! Whole-file persistence: read text → parse, emit → write text.

use crate::canvas::EditorConfig;
use crate::error::{StoreError, StoreResult};
use crate::workspace::Workspace;
use ld_core::{EmitOptions, TagTable};
use std::fs;
use std::path::Path;

pub fn load_text(path: &Path) -> StoreResult<String> {
    fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_text(path: &Path, text: &str) -> StoreResult<()> {
    fs::write(path, text).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_tags(path: &Path) -> StoreResult<TagTable> {
    Ok(TagTable::parse(&load_text(path)?))
}

/// Open a solution file. A tag file named in its header is read from the
/// solution's directory; a missing tag file is logged and left empty.
pub fn load_solution(path: &Path, config: EditorConfig) -> StoreResult<Workspace> {
    let text = load_text(path)?;
    let mut workspace = Workspace::from_text(&text, config)?;
    let dir = path.parent().unwrap_or(Path::new("."));
    let tag_path = workspace.tag_file().map(|file| dir.join(file));
    if let Some(tag_path) = tag_path {
        match load_tags(&tag_path) {
            Ok(tags) => workspace.tags = tags,
            Err(e) => log::warn!("{e}"),
        }
    }
    Ok(workspace)
}

/// Save a solution, with every diagram's undo history.
pub fn save_solution(path: &Path, workspace: &mut Workspace) -> StoreResult<()> {
    let options = EmitOptions {
        include_history: true,
    };
    save_text(path, &workspace.to_text(&options))
}
