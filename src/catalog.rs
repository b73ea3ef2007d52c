//! Index of the images under a root directory.
//!
//! The tree is walked once when the catalog is built (and again on an
//! explicit [`Catalog::refresh`]). Every pick after that is served from
//! memory.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::ValueEnum;
use rand::Rng;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::constants::IMAGE_EXTENSIONS;
use crate::error::CatalogError;

/// Order in which the slideshow walks the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Order {
    #[default]
    Random,
    Sequential,
}

#[derive(Debug, Clone)]
pub struct CatalogOptions {
    /// Accepted extensions, lowercase and without the leading dot.
    pub extensions: Vec<String>,
    pub include_hidden: bool,
    pub follow_links: bool,
    /// Where to write the scanned list, one path per line. Diagnostics only.
    pub listing: Option<PathBuf>,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            extensions: IMAGE_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            include_hidden: false,
            follow_links: true,
            listing: None,
        }
    }
}

impl CatalogOptions {
    /// Case-insensitive extension check.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(ext))
    }
}

/// Filesystem enumeration behind the catalog.
pub trait Scanner {
    /// List the matching files under `root`. May take a long time on big
    /// trees.
    fn scan(&self, root: &Path, options: &CatalogOptions) -> Result<Vec<PathBuf>, CatalogError>;
}

impl<S: Scanner + ?Sized> Scanner for &S {
    fn scan(&self, root: &Path, options: &CatalogOptions) -> Result<Vec<PathBuf>, CatalogError> {
        (**self).scan(root, options)
    }
}

/// Recursive scan with `walkdir`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkScanner;

impl Scanner for WalkScanner {
    fn scan(&self, root: &Path, options: &CatalogOptions) -> Result<Vec<PathBuf>, CatalogError> {
        let not_found = |source: io::Error| CatalogError::NotFound {
            root: root.to_path_buf(),
            source,
        };

        let metadata = fs::metadata(root).map_err(not_found)?;
        if !metadata.is_dir() {
            return Err(not_found(io::Error::new(
                io::ErrorKind::NotADirectory,
                "not a directory",
            )));
        }
        // Fail fast on a root we cannot list; deeper errors only skip entries.
        fs::read_dir(root).map_err(not_found)?;

        let mut paths = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(options.follow_links)
            .into_iter()
            .filter_entry(|entry| options.include_hidden || entry.depth() == 0 || !is_hidden(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if entry.file_type().is_file() && options.matches(entry.path()) {
                paths.push(entry.into_path());
            }
        }
        Ok(paths)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

/// In-memory index of image paths.
///
/// Indices are stable for the lifetime of one scan. [`Catalog::refresh`]
/// builds a complete new list before swapping it in, so a reader never sees
/// a half-built list.
pub struct Catalog<S = WalkScanner> {
    root: PathBuf,
    options: CatalogOptions,
    scanner: S,
    entries: Arc<[PathBuf]>,
    cursor: usize,
}

impl Catalog<WalkScanner> {
    /// Scan `root` recursively. Blocks until the walk is done.
    pub fn build(root: impl Into<PathBuf>, options: CatalogOptions) -> Result<Self, CatalogError> {
        Self::build_with(WalkScanner, root, options)
    }
}

impl<S: Scanner> Catalog<S> {
    pub fn build_with(
        scanner: S,
        root: impl Into<PathBuf>,
        options: CatalogOptions,
    ) -> Result<Self, CatalogError> {
        let root = root.into();
        let entries = scan(&scanner, &root, &options)?;
        info!(root = %root.display(), count = entries.len(), "catalog built");
        Ok(Self {
            root,
            options,
            scanner,
            entries,
            cursor: 0,
        })
    }

    /// Rescan the root and replace the entries. On error the previous
    /// entries stay in place. Returns the new count.
    pub fn refresh(&mut self) -> Result<usize, CatalogError> {
        let entries = scan(&self.scanner, &self.root, &self.options)?;
        let previous = self.entries.len();
        self.entries = entries;
        if self.entries.is_empty() {
            self.cursor = 0;
        } else {
            self.cursor %= self.entries.len();
        }
        info!(previous, count = self.entries.len(), "catalog refreshed");
        Ok(self.entries.len())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The current list. Holders keep it even if the catalog is refreshed.
    pub fn snapshot(&self) -> Arc<[PathBuf]> {
        Arc::clone(&self.entries)
    }

    pub fn pick_by_index(&self, index: usize) -> Result<&Path, CatalogError> {
        self.entries
            .get(index)
            .map(PathBuf::as_path)
            .ok_or(CatalogError::IndexOutOfRange {
                index,
                count: self.entries.len(),
            })
    }

    pub fn pick_random(&self) -> Result<&Path, CatalogError> {
        self.pick_random_with(&mut rand::rng())
    }

    pub fn pick_random_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&Path, CatalogError> {
        if self.entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        let index = rng.random_range(0..self.entries.len());
        Ok(self.entries[index].as_path())
    }

    /// Walk the entries in scan order, wrapping around at the end.
    pub fn pick_next(&mut self) -> Result<&Path, CatalogError> {
        if self.entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        let index = self.cursor % self.entries.len();
        self.cursor = (index + 1) % self.entries.len();
        Ok(self.entries[index].as_path())
    }

    pub fn pick(&mut self, order: Order) -> Result<&Path, CatalogError> {
        match order {
            Order::Random => self.pick_random(),
            Order::Sequential => self.pick_next(),
        }
    }
}

fn scan<S: Scanner>(
    scanner: &S,
    root: &Path,
    options: &CatalogOptions,
) -> Result<Arc<[PathBuf]>, CatalogError> {
    let paths = scanner.scan(root, options)?;
    if let Some(listing) = &options.listing {
        match write_listing(listing, &paths) {
            Ok(()) => debug!(listing = %listing.display(), "wrote catalog listing"),
            Err(e) => warn!(listing = %listing.display(), error = %e, "failed to write catalog listing"),
        }
    }
    Ok(paths.into())
}

fn write_listing(listing: &Path, paths: &[PathBuf]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(listing)?);
    for path in paths {
        writeln!(out, "{}", path.display())?;
    }
    out.flush()
}
