use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// In-progress download path next to `final_path` (`<name>.part`).
pub fn part_path_for(final_path: &Path) -> PathBuf {
    let name = final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    final_path
        .parent()
        .unwrap_or(Path::new("."))
        .join(format!("{name}.part"))
}

/// Move a finished `.part` file over the final path.
pub fn rename_part_to_final(part_path: &Path, final_path: &Path) -> Result<()> {
    fs::rename(part_path, final_path).with_context(|| {
        format!(
            "rename finished download ({} -> {})",
            part_path.display(),
            final_path.display()
        )
    })
}

/// Best-effort cleanup of a partial download after a failure.
pub fn remove_part_file(part_path: &Path) {
    if part_path.exists() {
        let _ = fs::remove_file(part_path);
    }
}
