//! SBOM extraction for a single candidate file.

use crate::binary::{self, BinaryImage, Format, MarkerNames};
use crate::error::{Error, Result};
use crate::package::PackageRecord;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, trace};

/// Options shared by every file in a scan.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub markers: MarkerNames,
}

/// Extracts embedded SBOMs from a native-image executable on disk.
pub struct Extractor {
    mmap: Mmap,
    path: String,
    options: ScanOptions,
}

impl Extractor {
    /// Maps the file at `path` into memory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let resolver = |e: std::io::Error| Error::Resolver {
            path: display.clone(),
            reason: e.to_string(),
        };

        let file = File::open(path).map_err(resolver)?;
        let mmap = unsafe { Mmap::map(&file).map_err(resolver)? };

        Ok(Self {
            mmap,
            path: display,
            options: ScanOptions::default(),
        })
    }

    /// Replaces the scan options used by [`Extractor::scan_packages`].
    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    /// Path of the mapped file, as shown in diagnostics.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Scans every image in the file for an embedded SBOM.
    pub fn scan_packages(&self) -> Result<Vec<PackageRecord>> {
        fetch_packages_with(&self.mmap, &self.path, &self.options)
    }
}

/// Extracts packages from an in-memory file using the default marker names.
pub fn fetch_packages(data: &[u8], path: &str) -> Result<Vec<PackageRecord>> {
    fetch_packages_with(data, path, &ScanOptions::default())
}

/// Extracts packages from every image in `data`.
///
/// Failures inside one image are logged and skipped; only a file that cannot
/// be split into images is an error.
pub fn fetch_packages_with(
    data: &[u8],
    path: &str,
    options: &ScanOptions,
) -> Result<Vec<PackageRecord>> {
    let readers = binary::image_readers(data, path)?;
    let mut packages = Vec::new();

    for (index, reader) in readers.iter().enumerate() {
        for format in Format::PROBE_ORDER {
            let Some(image) = BinaryImage::probe(format, reader) else {
                trace!(path, image = index, ?format, "format mismatch");
                continue;
            };

            match image.fetch_packages(&options.markers) {
                Ok(found) => {
                    debug!(path, image = index, ?format, count = found.len(), "scanned image");
                    packages.extend(found);
                }
                Err(e) => {
                    debug!(path, image = index, ?format, "error extracting SBOM: {}", e);
                }
            }
        }
    }

    Ok(packages)
}
