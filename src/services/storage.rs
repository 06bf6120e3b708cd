use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;

/// URL prefix under which stored PDFs are served.
pub const PUBLIC_PREFIX: &str = "pdfs";

const MAX_NAME_ATTEMPTS: u32 = 100;

fn check_filename(filename: &str) -> anyhow::Result<()> {
    anyhow::ensure!(
        !filename.contains(&['/', '\\'][..]) && filename != ".." && !filename.is_empty(),
        "invalid pdf filename: {filename}"
    );
    Ok(())
}

fn create_new(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Writes a generated PDF into `dir`, creating the directory on first use.
/// An existing file with the same name is never replaced.
pub fn write_pdf(dir: &Path, filename: &str, bytes: &[u8]) -> anyhow::Result<PathBuf> {
    check_filename(filename)?;
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create pdf directory: {}", dir.display()))?;

    let path = dir.join(filename);
    create_new(&path, bytes).with_context(|| format!("failed to write pdf: {}", path.display()))?;

    tracing::info!(path = %path.display(), bytes = bytes.len(), "stored pdf");
    Ok(path)
}

/// Writes `{stem}.pdf`, or `{stem}_2.pdf`, `{stem}_3.pdf`, ... when the name
/// is taken. Returns the chosen filename and its full path.
pub fn write_unique_pdf(dir: &Path, stem: &str, bytes: &[u8]) -> anyhow::Result<(String, PathBuf)> {
    check_filename(stem)?;
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create pdf directory: {}", dir.display()))?;

    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let filename = match attempt {
            1 => format!("{stem}.pdf"),
            n => format!("{stem}_{n}.pdf"),
        };
        let path = dir.join(&filename);
        match create_new(&path, bytes) {
            Ok(()) => {
                tracing::info!(path = %path.display(), bytes = bytes.len(), "stored pdf");
                return Ok((filename, path));
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(e).with_context(|| format!("failed to write pdf: {}", path.display()));
            }
        }
    }

    anyhow::bail!("no free pdf filename for {stem} after {MAX_NAME_ATTEMPTS} attempts")
}

/// Removes a PDF whose database record was never committed.
pub fn discard_pdf(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove orphan pdf");
    }
}

/// Relative URL of a stored PDF, e.g. `pdfs/factura_1_20250310120000.pdf`.
pub fn public_path(filename: &str) -> String {
    format!("{PUBLIC_PREFIX}/{filename}")
}
