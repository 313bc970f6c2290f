//! GraalVM native-image SBOM extractor.
//!
//! native-image can embed a gzip-compressed CycloneDX SBOM in the executables
//! it produces. This library locates it in ELF, Mach-O (including universal
//! binaries) and PE images and turns its components into package records.

pub mod binary;
pub mod cpe;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod package;
pub mod payload;

pub use error::{Error, Result};
pub use extractor::{fetch_packages, fetch_packages_with, Extractor, ScanOptions};
pub use package::PackageRecord;
