// ABOUTME: Deflate-compressed zip archives of a directory tree.
// ABOUTME: Entry names are relative to the archived root and use forward slashes.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::error::ArchiveError;

/// Archive everything under `root` into a new zip at `dest`. Returns the archive size.
pub fn archive_dir(root: &Path, dest: &Path) -> Result<u64, ArchiveError> {
    let file = File::create(dest)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options =
        SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<io::Result<_>>()?;
        entries.sort();

        for path in entries {
            let name = entry_name(root, &path);
            if path.is_dir() {
                zip.add_directory(format!("{name}/"), options)?;
                pending.push(path);
            } else {
                zip.start_file(name.as_str(), options)?;
                let mut source = File::open(&path)?;
                io::copy(&mut source, &mut zip)?;
            }
        }
    }

    let mut writer = zip.finish()?;
    io::Write::flush(&mut writer)?;
    drop(writer);

    Ok(std::fs::metadata(dest)?.len())
}

fn entry_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
