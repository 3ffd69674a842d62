//! File acquisition: download-and-cache by URL, optional archive unpacking,
//! and the small shell helpers used to decompress auxiliary files.

use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
    time::Duration,
};

use reqwest::blocking::Client;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::AppError;

/// How a downloaded file should be unpacked before it is handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnpackFormat {
    /// Gzipped tarball, extracted with `tar -xzf`.
    Untar,
}

/// Resolves a source URL to a local file, fetching it when needed.
pub trait FileSource {
    /// Directory every target name is resolved against.
    fn root(&self) -> &Path;

    /// Returns the local path of `name`, downloading `url` into it first if it
    /// is not cached yet.
    fn ensure_file(
        &self,
        url: &str,
        name: &str,
        unpack: Option<UnpackFormat>,
    ) -> Result<PathBuf, AppError>;
}

/// Blocking HTTP downloader that caches every file under a root directory.
pub struct HttpFileCache {
    root: PathBuf,
    client: Client,
}

impl HttpFileCache {
    pub fn new(root: impl Into<PathBuf>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("msmarco-scenario/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            root: root.into(),
            client,
        })
    }

    fn download_to(&self, url: &str, target: &Path) -> Result<(), AppError> {
        let parent = target.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent)?;

        info!(url, target = %target.display(), "Downloading file");
        let mut response = self.client.get(url).send()?.error_for_status()?;

        // Stage next to the target so the final rename stays on one filesystem.
        let mut staged = NamedTempFile::new_in(parent)?;
        let bytes = response.copy_to(staged.as_file_mut())?;
        staged.as_file().sync_all()?;
        staged.persist(target)?;

        info!(bytes, target = %target.display(), "Download complete");
        Ok(())
    }
}

impl FileSource for HttpFileCache {
    fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_file(
        &self,
        url: &str,
        name: &str,
        unpack: Option<UnpackFormat>,
    ) -> Result<PathBuf, AppError> {
        let target = self.root.join(name);
        if target.exists() {
            debug!(target = %target.display(), "Using cached file");
            return Ok(target);
        }
        fs::create_dir_all(&self.root)?;

        match unpack {
            None => self.download_to(url, &target)?,
            Some(UnpackFormat::Untar) => {
                let archive = self.root.join(format!("{name}.download"));
                if !archive.exists() {
                    self.download_to(url, &archive)?;
                }
                untar_into(&archive, &target)?;
                fs::remove_file(&archive)?;
            }
        }

        Ok(target)
    }
}

/// Extracts `archive` so that its contents end up at `target`.
///
/// A tarball with a single top-level directory is flattened so that the
/// directory itself becomes `target`.
pub fn untar_into(archive: &Path, target: &Path) -> Result<(), AppError> {
    let staging = target.with_extension("unpacking");
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir_all(&staging)?;

    let archive_arg = archive.display().to_string();
    let staging_arg = staging.display().to_string();
    shell(&["tar", "-xzf", &archive_arg, "-C", &staging_arg])?;

    let entries = fs::read_dir(&staging)?.collect::<Result<Vec<_>, _>>()?;
    match entries.as_slice() {
        [single] if single.file_type()?.is_dir() => {
            fs::rename(single.path(), target)?;
            fs::remove_dir_all(&staging)?;
        }
        _ => fs::rename(&staging, target)?,
    }

    info!(archive = %archive.display(), target = %target.display(), "Unpacked archive");
    Ok(())
}

/// Runs a command to completion and returns its stdout.
pub fn shell(args: &[&str]) -> Result<String, AppError> {
    let (program, rest) = args
        .split_first()
        .ok_or_else(|| AppError::Command("empty command".to_string()))?;

    debug!(command = %args.join(" "), "Running shell command");
    let output = Command::new(program).args(rest).output()?;

    if !output.status.success() {
        return Err(AppError::Command(format!(
            "`{}` exited with {}: {}",
            args.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Decompresses a `.gz` file in place unless its decompressed sibling already
/// exists. Returns the decompressed path.
pub fn gunzip_once(gz_path: &Path) -> Result<PathBuf, AppError> {
    let decompressed = gz_path.with_extension("");
    if decompressed == gz_path {
        return Err(AppError::Validation(format!(
            "{} has no extension to strip",
            gz_path.display()
        )));
    }
    if decompressed.exists() {
        debug!(path = %decompressed.display(), "Decompressed file already present");
        return Ok(decompressed);
    }

    let gz_arg = gz_path.display().to_string();
    shell(&["gzip", "-d", &gz_arg])?;
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn cached_file_is_returned_without_download() -> Result<(), AppError> {
        let dir = tempdir()?;
        fs::write(dir.path().join("top20.tsv"), "1\t2\t3\n")?;
        let cache = HttpFileCache::new(dir.path(), Duration::from_secs(1))?;

        // The URL is unroutable; a cache hit must never touch it.
        let path = cache.ensure_file("http://127.0.0.1:9/never", "top20.tsv", None)?;

        assert_eq!(path, dir.path().join("top20.tsv"));
        Ok(())
    }

    #[test]
    fn shell_reports_failing_commands() {
        let err = shell(&["sh", "-c", "echo boom >&2; exit 3"]).unwrap_err();
        match err {
            AppError::Command(message) => assert!(message.contains("boom")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn shell_rejects_empty_command() {
        assert!(matches!(shell(&[]), Err(AppError::Command(_))));
    }

    #[test]
    fn gunzip_once_skips_when_already_decompressed() -> Result<(), AppError> {
        let dir = tempdir()?;
        let gz = dir.path().join("queries.tsv.gz");
        fs::write(dir.path().join("queries.tsv"), "1\tq\n")?;

        let path = gunzip_once(&gz)?;

        assert_eq!(path, dir.path().join("queries.tsv"));
        Ok(())
    }

    #[test]
    fn gunzip_once_decompresses_archive() -> Result<(), AppError> {
        let dir = tempdir()?;
        let plain = dir.path().join("queries.tsv");
        fs::write(&plain, "1\twhat is x?\n")?;
        let plain_arg = plain.display().to_string();
        shell(&["gzip", &plain_arg])?;
        assert!(!plain.exists());

        let path = gunzip_once(&dir.path().join("queries.tsv.gz"))?;

        assert_eq!(fs::read_to_string(path)?, "1\twhat is x?\n");
        Ok(())
    }

    #[test]
    fn untar_flattens_single_directory() -> Result<(), AppError> {
        let dir = tempdir()?;
        let source = dir.path().join("src/collectionandqueries");
        fs::create_dir_all(&source)?;
        fs::write(source.join("collection.tsv"), "1\tp\n")?;
        let archive = dir.path().join("bundle.tar.gz");
        let archive_arg = archive.display().to_string();
        let src_arg = dir.path().join("src").display().to_string();
        shell(&["tar", "-czf", &archive_arg, "-C", &src_arg, "collectionandqueries"])?;

        let target = dir.path().join("out");
        untar_into(&archive, &target)?;

        assert!(target.join("collection.tsv").exists());
        assert!(!dir.path().join("out.unpacking").exists());
        Ok(())
    }
}
