//! Downloading and installing the static GTFS archive.
//!
//! The archive is unpacked into a staging directory beside the cache and only
//! swapped in once it is known to contain a feed, so a failed refresh leaves
//! the previous data usable.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::MARKER_FILE;
use crate::fetch::{HttpClient, fetch_bytes};

#[derive(Debug, Serialize)]
pub struct RefreshSummary {
    pub dir: PathBuf,
    pub bytes: usize,
    /// Extracted `.txt` tables, sorted by name.
    pub files: Vec<String>,
}

/// Downloads the archive at `url` and installs it into `dir`.
#[tracing::instrument(skip(client, dir), fields(dir = %dir.display()))]
pub async fn refresh_gtfs<C: HttpClient>(
    client: &C,
    url: &str,
    dir: &Path,
) -> Result<RefreshSummary> {
    let bytes = fetch_bytes(client, url)
        .await
        .context("failed to download GTFS static archive")?;
    info!(bytes = bytes.len(), "Downloaded GTFS static archive");

    let target = dir.to_path_buf();
    let size = bytes.len();
    let files = tokio::task::spawn_blocking(move || install_archive(&bytes, &target)).await??;

    info!(files = files.len(), "GTFS static data refreshed");
    Ok(RefreshSummary {
        dir: dir.to_path_buf(),
        bytes: size,
        files,
    })
}

/// Unpacks a GTFS zip into `dir`, replacing whatever was there.
pub fn install_archive(bytes: &[u8], dir: &Path) -> Result<Vec<String>> {
    let staging = sibling(dir, "staging");
    let previous = sibling(dir, "previous");

    remove_dir_if_exists(&staging)?;
    fs::create_dir_all(&staging)
        .with_context(|| format!("failed to create {}", staging.display()))?;

    let extracted = zip::ZipArchive::new(Cursor::new(bytes))
        .context("GTFS download is not a valid zip archive")
        .and_then(|mut archive| {
            debug!(entries = archive.len(), "Extracting GTFS archive");
            archive
                .extract(&staging)
                .context("failed to extract GTFS archive")
        });
    if let Err(e) = extracted {
        let _ = fs::remove_dir_all(&staging);
        return Err(e);
    }

    if !staging.join(MARKER_FILE).is_file() {
        let _ = fs::remove_dir_all(&staging);
        bail!("GTFS archive does not contain {MARKER_FILE}");
    }

    remove_dir_if_exists(&previous)?;
    if let Err(e) = swap_into_place(&staging, dir, &previous) {
        let _ = fs::remove_dir_all(&staging);
        return Err(e);
    }
    remove_dir_if_exists(&previous)?;

    list_tables(dir)
}

/// Moves `staging` to `dir`, parking an existing `dir` at `previous`. The
/// parked cache is moved back if the install fails.
fn swap_into_place(staging: &Path, dir: &Path, previous: &Path) -> Result<()> {
    let parked = dir.exists();
    if parked {
        fs::rename(dir, previous)
            .with_context(|| format!("failed to move aside {}", dir.display()))?;
    }

    if let Err(e) = fs::rename(staging, dir) {
        if parked {
            if let Err(restore) = fs::rename(previous, dir) {
                warn!(
                    error = %restore,
                    previous = %previous.display(),
                    "Could not restore the previous GTFS cache"
                );
            }
        }
        return Err(e).with_context(|| format!("failed to install {}", dir.display()));
    }
    Ok(())
}

fn list_tables(dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("txt") {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                files.push(name.to_string());
            }
        }
    }
    files.sort();
    Ok(files)
}

fn sibling(dir: &Path, suffix: &str) -> PathBuf {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "gtfs".to_string());
    dir.with_file_name(format!("{name}.{suffix}"))
}

fn remove_dir_if_exists(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to remove {}", dir.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::tests::CannedClient;
    use std::env;
    use std::io::Write;

    fn zip_of(files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for (name, body) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn scratch(name: &str) -> PathBuf {
        let root = env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).unwrap();
        root.join("gtfs")
    }

    #[test]
    fn test_install_archive_extracts_tables() {
        let dir = scratch("capmetro_test_install");
        let archive = zip_of(&[
            ("stops.txt", "stop_id,stop_name\n1,A\n"),
            ("routes.txt", "route_id\n801\n"),
            ("agency.txt", "agency_name\nCapMetro\n"),
        ]);

        let files = install_archive(&archive, &dir).unwrap();

        assert_eq!(files, ["agency.txt", "routes.txt", "stops.txt"]);
        assert!(dir.join("stops.txt").is_file());
        assert!(!sibling(&dir, "staging").exists());
    }

    #[test]
    fn test_install_archive_replaces_old_tables() {
        let dir = scratch("capmetro_test_replace");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("stops.txt"), "stop_id\nold\n").unwrap();
        fs::write(dir.join("shapes.txt"), "shape_id\nold\n").unwrap();

        install_archive(&zip_of(&[("stops.txt", "stop_id\nnew\n")]), &dir).unwrap();

        assert_eq!(fs::read_to_string(dir.join("stops.txt")).unwrap(), "stop_id\nnew\n");
        assert!(!dir.join("shapes.txt").exists());
        assert!(!sibling(&dir, "previous").exists());
    }

    #[test]
    fn test_bad_archive_keeps_previous_cache() {
        let dir = scratch("capmetro_test_bad_archive");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("stops.txt"), "stop_id\nkept\n").unwrap();

        assert!(install_archive(b"<html>maintenance</html>", &dir).is_err());
        let err = install_archive(&zip_of(&[("routes.txt", "route_id\n1\n")]), &dir).unwrap_err();
        assert!(err.to_string().contains("stops.txt"));

        assert_eq!(fs::read_to_string(dir.join("stops.txt")).unwrap(), "stop_id\nkept\n");
        assert!(!sibling(&dir, "staging").exists());
    }

    #[test]
    fn test_failed_swap_restores_previous_cache() {
        let dir = scratch("capmetro_test_failed_swap");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("stops.txt"), "stop_id\nkept\n").unwrap();
        let staging = sibling(&dir, "staging");
        let previous = sibling(&dir, "previous");

        // Nothing was staged, so the final rename fails
        assert!(swap_into_place(&staging, &dir, &previous).is_err());

        assert_eq!(fs::read_to_string(dir.join("stops.txt")).unwrap(), "stop_id\nkept\n");
        assert!(!previous.exists());
    }

    #[tokio::test]
    async fn test_refresh_gtfs_downloads_and_installs() {
        let dir = scratch("capmetro_test_refresh");
        let archive = zip_of(&[
            ("stops.txt", "stop_id,stop_name\n1001,Republic Square Station\n"),
            ("trips.txt", "route_id,service_id,trip_id\n801,WKDY,T1\n"),
        ]);
        let client = CannedClient::ok(archive.clone());

        let summary = refresh_gtfs(&client, "https://example.test/gtfs.zip", &dir)
            .await
            .unwrap();

        assert_eq!(summary.bytes, archive.len());
        assert_eq!(summary.files, ["stops.txt", "trips.txt"]);
        assert_eq!(summary.dir, dir);
        assert!(crate::gtfs::GtfsStatic::is_installed(&dir));
    }

    #[tokio::test]
    async fn test_refresh_gtfs_http_error_keeps_cache() {
        let dir = scratch("capmetro_test_refresh_503");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("stops.txt"), "stop_id\nkept\n").unwrap();

        let client = CannedClient::status(503);
        let err = refresh_gtfs(&client, "https://example.test/gtfs.zip", &dir)
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("503"));
        assert_eq!(fs::read_to_string(dir.join("stops.txt")).unwrap(), "stop_id\nkept\n");
    }
}
