//! Binary format probing and marker resolution.
//!
//! This module provides a uniform view over ELF, Mach-O and PE images. Each
//! format knows how to find the three marker symbols and the data region
//! they point into; payload decoding is shared.

mod elf;
mod macho;
mod pe;

use crate::error::{Error, Result};
use crate::package::PackageRecord;
use crate::payload::{self, PayloadLocation};
use object::read::macho::{FatArch, MachOFatFile32, MachOFatFile64};
use object::FileKind;
use tracing::{debug, trace};

pub use elf::ElfImage;
pub use macho::MachOImage;
pub use pe::{ExportDirectory, ExportHeader, PeImage};

/// Container formats in the order they are probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Elf,
    MachO,
    Pe,
}

impl Format {
    pub const PROBE_ORDER: [Format; 3] = [Format::Elf, Format::MachO, Format::Pe];
}

/// Names of the symbols native-image emits around the embedded SBOM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerNames {
    pub sbom: String,
    pub sbom_length: String,
    pub version: String,
}

impl Default for MarkerNames {
    fn default() -> Self {
        Self {
            sbom: "sbom".to_string(),
            sbom_length: "sbom_length".to_string(),
            version: "__svm_version_info".to_string(),
        }
    }
}

impl MarkerNames {
    /// Mach-O prepends an underscore to C symbol names.
    pub fn with_prefix(&self, prefix: &str) -> Self {
        Self {
            sbom: format!("{prefix}{}", self.sbom),
            sbom_length: format!("{prefix}{}", self.sbom_length),
            version: format!("{prefix}{}", self.version),
        }
    }
}

/// Virtual addresses of the three markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Markers {
    pub sbom: u64,
    pub sbom_length: u64,
    pub version: u64,
}

/// Accumulates marker addresses while walking a symbol table.
///
/// A zero address counts as absent.
#[derive(Debug, Default)]
struct MarkerScan {
    sbom: Option<u64>,
    sbom_length: Option<u64>,
    version: Option<u64>,
}

impl MarkerScan {
    fn observe(&mut self, names: &MarkerNames, name: &[u8], address: u64) {
        let slot = if name == names.sbom.as_bytes() {
            &mut self.sbom
        } else if name == names.sbom_length.as_bytes() {
            &mut self.sbom_length
        } else if name == names.version.as_bytes() {
            &mut self.version
        } else {
            return;
        };
        if address != 0 {
            *slot = Some(address);
        }
    }

    fn finish(&self) -> Option<Markers> {
        Some(Markers {
            sbom: self.sbom?,
            sbom_length: self.sbom_length?,
            version: self.version?,
        })
    }
}

/// A section or segment mapped at a base virtual address.
#[derive(Debug, Clone, Copy)]
pub struct SectionReader<'data> {
    name: &'static str,
    base: u64,
    data: &'data [u8],
}

impl<'data> SectionReader<'data> {
    /// Wraps `data`, which is mapped at virtual address `base`.
    pub fn new(name: &'static str, base: u64, data: &'data [u8]) -> Self {
        Self { name, base, data }
    }

    /// Section or segment name, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Raw bytes of the region.
    pub fn data(&self) -> &'data [u8] {
        self.data
    }

    /// Translates a virtual address into an offset within the region.
    ///
    /// Addresses below the base wrap around and fail the later bounds check.
    pub fn offset_of(&self, address: u64) -> u64 {
        address.wrapping_sub(self.base)
    }

    /// Converts the marker addresses into region offsets.
    pub fn locate(&self, markers: &Markers) -> PayloadLocation {
        PayloadLocation {
            payload_start: self.offset_of(markers.sbom),
            length_offset: self.offset_of(markers.sbom_length),
        }
    }

    /// Reads a NUL-terminated string at `address`, if it lies in the region.
    pub fn c_str_at(&self, address: u64) -> Option<&'data str> {
        let start = usize::try_from(self.offset_of(address)).ok()?;
        let tail = self.data.get(start..)?;
        let end = tail.iter().position(|&b| b == 0)?;
        std::str::from_utf8(&tail[..end]).ok()
    }
}

/// A recognised container image.
pub enum BinaryImage<'data> {
    Elf(ElfImage<'data>),
    MachO(MachOImage<'data>),
    Pe(PeImage<'data>),
}

impl<'data> BinaryImage<'data> {
    /// Returns `None` when `data` is not a `format` image.
    pub fn probe(format: Format, data: &'data [u8]) -> Option<Self> {
        match format {
            Format::Elf => ElfImage::probe(data).map(BinaryImage::Elf),
            Format::MachO => MachOImage::probe(data).map(BinaryImage::MachO),
            Format::Pe => PeImage::probe(data).map(BinaryImage::Pe),
        }
    }

    pub fn format(&self) -> Format {
        match self {
            BinaryImage::Elf(_) => Format::Elf,
            BinaryImage::MachO(_) => Format::MachO,
            BinaryImage::Pe(_) => Format::Pe,
        }
    }

    fn markers(&self, names: &MarkerNames) -> Result<Option<Markers>> {
        match self {
            BinaryImage::Elf(image) => Ok(image.markers(names)),
            BinaryImage::MachO(image) => Ok(image.markers(names)),
            BinaryImage::Pe(image) => image.markers(names),
        }
    }

    fn data_region(&self) -> Result<SectionReader<'data>> {
        match self {
            BinaryImage::Elf(image) => image.data_region(),
            BinaryImage::MachO(image) => image.data_region(),
            BinaryImage::Pe(image) => image.data_region(),
        }
    }

    /// Extracts the packages listed in the embedded SBOM.
    ///
    /// An image without all three markers yields an empty list.
    pub fn fetch_packages(&self, names: &MarkerNames) -> Result<Vec<PackageRecord>> {
        let Some(markers) = self.markers(names)? else {
            debug!(
                format = ?self.format(),
                "one or more symbols are missing from the native image executable"
            );
            return Ok(Vec::new());
        };

        let region = self.data_region()?;
        if let Some(version) = region.c_str_at(markers.version) {
            trace!(region = region.name(), version, "native image version info");
        }

        let location = region.locate(&markers);
        trace!(
            region = region.name(),
            len = region.data().len(),
            payload_start = location.payload_start,
            length_offset = location.length_offset,
            "reading SBOM"
        );
        let bom = payload::decode(region.data(), location)?;
        Ok(bom.components.iter().map(PackageRecord::from).collect())
    }
}

/// Splits a file into the images it contains.
///
/// Universal Mach-O files yield one slice per architecture; anything else is
/// returned whole.
pub fn image_readers<'data>(data: &'data [u8], path: &str) -> Result<Vec<&'data [u8]>> {
    let resolver = |err: object::read::Error| Error::Resolver {
        path: path.to_string(),
        reason: err.to_string(),
    };

    match FileKind::parse(data) {
        Ok(FileKind::MachOFat32) => {
            let fat = MachOFatFile32::parse(data).map_err(resolver)?;
            fat.arches()
                .iter()
                .map(|arch| arch.data(data))
                .collect::<object::read::Result<Vec<_>>>()
                .map_err(resolver)
        }
        Ok(FileKind::MachOFat64) => {
            let fat = MachOFatFile64::parse(data).map_err(resolver)?;
            fat.arches()
                .iter()
                .map(|arch| arch.data(data))
                .collect::<object::read::Result<Vec<_>>>()
                .map_err(resolver)
        }
        _ => Ok(vec![data]),
    }
}
