//! External editor launch for `threadline config --edit`.

use anyhow::{Result, anyhow};
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;
use tracing::debug;

const FALLBACK_EDITORS: [&str; 3] = ["nvim", "vim", "vi"];

/// Opens a file path in the user's preferred editor.
///
/// Tries `$VISUAL`, then `$EDITOR`, then `nvim`, `vim`, `vi`.
pub fn edit_file_with_system_editor(path: &Path) -> Result<()> {
    let candidates = editor_candidates(
        std::env::var_os("VISUAL"),
        std::env::var_os("EDITOR"),
    );

    for command in &candidates {
        let mut parts = command.split_whitespace();
        let Some(program) = parts.next() else {
            continue;
        };

        debug!(editor = %command, path = %path.display(), "launching editor");
        match Command::new(program).args(parts).arg(path).status() {
            Ok(status) if status.success() => return Ok(()),
            Ok(status) => {
                let code = status
                    .code()
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "unknown".to_owned());
                return Err(anyhow!("editor `{command}` exited with status {code}"));
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(err) => return Err(anyhow!("failed to launch editor `{command}`: {err}")),
        }
    }

    Err(anyhow!(
        "no editor found (tried $VISUAL, $EDITOR, nvim, vim, vi)"
    ))
}

fn editor_candidates(visual: Option<OsString>, editor: Option<OsString>) -> Vec<String> {
    [visual, editor]
        .into_iter()
        .flatten()
        .map(|value| value.to_string_lossy().trim().to_owned())
        .filter(|value| !value.is_empty())
        .chain(FALLBACK_EDITORS.map(str::to_owned))
        .collect()
}
