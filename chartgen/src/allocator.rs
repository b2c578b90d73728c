// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Collision-free artifact directory allocation.
//!
//! Directories are reserved with [`fs::create_dir`], which fails when the path
//! already exists. That makes "create if absent, else disambiguate" atomic
//! with respect to concurrent requests sharing a title: exactly one caller
//! wins each candidate name and the others move on to the next one.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH}
};

use tracing::debug;

use crate::{
    error::{self, Error},
    slug::SlugStrategy
};

/// Highest numeric suffix tried before switching to timestamped names.
const MAX_NUMBERED_SUFFIX: u32 = 100;
/// Number of timestamp-plus-counter names tried after numeric suffixes run out.
const MAX_TIMESTAMPED_ATTEMPTS: u32 = 8;

/// Directory reserved for one chart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDirectory {
    /// Absolute location of the directory.
    pub path: PathBuf,
    /// Sanitized title the directory name was derived from.
    pub slug: String
}

impl ArtifactDirectory {
    /// Returns the path of `file_name` inside the directory.
    pub fn join(&self, file_name: &str) -> PathBuf {
        self.path.join(file_name)
    }
}

/// Creates a fresh, empty directory under `root` named after `title`.
///
/// The root is created when missing. The first free name among `slug`,
/// `slug-2` … `slug-100` and a few `slug-<unix-millis>-<n>` variants is
/// reserved; existing directories are never reused.
///
/// # Errors
///
/// Returns [`Error::Io`] when the root cannot be created or written, or when
/// every candidate name is already taken.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
///
/// use chartgen::allocate;
///
/// # fn main() -> Result<(), chartgen::Error> {
/// let directory = allocate(Path::new("charts"), "Sales by Region")?;
/// assert!(directory.path.ends_with("sales_by_region"));
/// # Ok(())
/// # }
/// ```
pub fn allocate(root: &Path, title: &str) -> Result<ArtifactDirectory, Error> {
    fs::create_dir_all(root).map_err(|source| error::io_error(root, source))?;
    let root = fs::canonicalize(root).map_err(|source| error::io_error(root, source))?;
    let slug = SlugStrategy::builder(title).build_or_fallback();

    for name in candidate_names(&slug) {
        let path = root.join(&name);
        match fs::create_dir(&path) {
            Ok(()) => {
                debug!("Reserved artifact directory {}", path.display());
                return Ok(ArtifactDirectory {
                    path,
                    slug: slug.clone()
                });
            }
            Err(source) if source.kind() == io::ErrorKind::AlreadyExists => {
                debug!("Artifact directory {} already exists", path.display());
            }
            Err(source) => return Err(error::io_error(&path, source))
        }
    }

    Err(error::io_error(
        &root.join(&slug),
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "no unused directory name left for this title"
        )
    ))
}

fn candidate_names(slug: &str) -> impl Iterator<Item = String> + '_ {
    let numbered = (2..=MAX_NUMBERED_SUFFIX).map(move |suffix| format!("{slug}-{suffix}"));
    let timestamped = (0..MAX_TIMESTAMPED_ATTEMPTS)
        .map(move |counter| format!("{slug}-{}-{counter}", unix_millis()));

    std::iter::once(slug.to_owned()).chain(numbered).chain(timestamped)
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, fs, thread};

    use tempfile::tempdir;

    use super::*;
    use crate::slug::FALLBACK_SLUG;

    #[test]
    fn allocate_creates_directory_named_after_title() {
        let root = tempdir().expect("failed to create tempdir");

        let directory = allocate(root.path(), "Sales by Region").expect("allocation failed");

        assert_eq!(directory.slug, "sales_by_region");
        assert!(directory.path.is_absolute());
        assert!(directory.path.is_dir());
        assert_eq!(directory.path.file_name().unwrap(), "sales_by_region");
        assert_eq!(fs::read_dir(&directory.path).unwrap().count(), 0);
    }

    #[test]
    fn allocate_creates_missing_root() {
        let temp = tempdir().expect("failed to create tempdir");
        let root = temp.path().join("nested/charts");

        let directory = allocate(&root, "Revenue").expect("allocation failed");

        assert!(root.is_dir());
        assert!(directory.path.starts_with(fs::canonicalize(&root).unwrap()));
    }

    #[test]
    fn allocate_disambiguates_repeated_titles() {
        let root = tempdir().expect("failed to create tempdir");

        let first = allocate(root.path(), "Revenue").unwrap();
        fs::write(first.join("marker.txt"), "first").unwrap();
        let second = allocate(root.path(), "Revenue").unwrap();
        let third = allocate(root.path(), "revenue").unwrap();

        assert_eq!(first.path.file_name().unwrap(), "revenue");
        assert_eq!(second.path.file_name().unwrap(), "revenue-2");
        assert_eq!(third.path.file_name().unwrap(), "revenue-3");
        assert_eq!(fs::read_to_string(first.join("marker.txt")).unwrap(), "first");
        assert!(!second.join("marker.txt").exists());
    }

    #[test]
    fn allocate_falls_back_for_unusable_titles() {
        let root = tempdir().expect("failed to create tempdir");

        let directory = allocate(root.path(), "???").unwrap();

        assert_eq!(directory.slug, FALLBACK_SLUG);
        assert_eq!(directory.path.file_name().unwrap(), FALLBACK_SLUG);
    }

    #[test]
    fn allocate_switches_to_timestamps_after_numbered_names() {
        let root = tempdir().expect("failed to create tempdir");
        fs::create_dir(root.path().join("busy")).unwrap();
        for suffix in 2..=MAX_NUMBERED_SUFFIX {
            fs::create_dir(root.path().join(format!("busy-{suffix}"))).unwrap();
        }

        let directory = allocate(root.path(), "Busy").unwrap();
        let name = directory.path.file_name().unwrap().to_string_lossy().into_owned();

        assert!(name.starts_with("busy-"));
        assert!(name.ends_with("-0"));
        assert_eq!(name.split('-').count(), 3);
    }

    #[test]
    fn allocate_reports_io_error_when_root_is_a_file() {
        let temp = tempdir().expect("failed to create tempdir");
        let blocked = temp.path().join("blocked");
        fs::write(&blocked, "not a directory").unwrap();

        let error = allocate(&blocked, "Anything").expect_err("expected io failure");

        match error {
            Error::Io {
                path, ..
            } => assert_eq!(path, blocked),
            other => panic!("unexpected error variant: {other:?}")
        }
    }

    #[test]
    fn concurrent_allocations_never_share_a_directory() {
        let root = tempdir().expect("failed to create tempdir");

        let paths: Vec<PathBuf> = thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| scope.spawn(|| allocate(root.path(), "Shared Title").unwrap().path))
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });

        let unique: HashSet<&PathBuf> = paths.iter().collect();
        assert_eq!(unique.len(), paths.len());
        assert!(paths.iter().all(|path| path.is_dir()));
    }
}
