use anyhow::{anyhow, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// External converter used by [`pdftoxml`]
pub const PDFTOHTML: &str = "pdftohtml";

/// Locate `name` on the `PATH`
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    find_executable_in(name, std::env::split_paths(&path))
}

fn find_executable_in<I>(name: &str, dirs: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    dirs.into_iter()
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Convert PDF bytes to the XML produced by `pdftohtml -xml`
///
/// Returns `Ok(None)` with a warning when `pdftohtml` is not installed.
/// `options` are extra whitespace-separated arguments passed to the tool.
pub fn pdftoxml(pdf: &[u8], options: &str) -> Result<Option<String>> {
    let Some(tool) = find_executable(PDFTOHTML) else {
        warn!(
            "pdftoxml requires {} but it was not found in the PATH; install it to use this function",
            PDFTOHTML
        );
        return Ok(None);
    };
    convert_with(&tool, pdf, options).map(Some)
}

fn convert_with(tool: &Path, pdf: &[u8], options: &str) -> Result<String> {
    let workdir = tempfile::tempdir()?;
    let input = workdir.path().join("input.pdf");
    let output_base = workdir.path().join("output");

    let mut file = std::fs::File::create(&input)?;
    file.write_all(pdf)?;
    file.flush()?;
    drop(file);

    debug!("running {} on {} bytes of PDF", tool.display(), pdf.len());
    // the tool cannot be silenced, discard both streams
    let status = Command::new(tool)
        .args(["-xml", "-nodrm", "-zoom", "1.5", "-enc", "UTF-8", "-noframes"])
        .args(options.split_whitespace())
        .arg(&input)
        .arg(&output_base)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    if !status.success() {
        debug!("{} exited with {}", tool.display(), status);
    }

    let xml_path = output_base.with_extension("xml");
    std::fs::read_to_string(&xml_path)
        .map_err(|e| anyhow!("No XML produced by {}: {}", tool.display(), e))
}
