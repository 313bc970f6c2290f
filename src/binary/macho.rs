//! Mach-O marker lookup.

use super::{MarkerNames, MarkerScan, Markers, SectionReader};
use crate::error::{Error, Result};
use object::{FileKind, Object, ObjectSegment, ObjectSymbol};
use tracing::debug;

/// Segment the native-image markers point into.
const DATA_SEGMENT: &str = "__DATA";

/// Prefix the Mach-O toolchain adds to C symbol names.
const SYMBOL_PREFIX: &str = "_";

pub struct MachOImage<'data> {
    file: object::File<'data>,
}

impl<'data> MachOImage<'data> {
    /// Returns `None` unless `data` is a readable thin Mach-O file.
    pub fn probe(data: &'data [u8]) -> Option<Self> {
        if !matches!(
            FileKind::parse(data),
            Ok(FileKind::MachO32 | FileKind::MachO64)
        ) {
            return None;
        }

        match object::File::parse(data) {
            Ok(file) => Some(Self { file }),
            Err(e) => {
                debug!("unable to read Mach-O executable: {}", e);
                None
            }
        }
    }

    /// Scans the symbol table for the underscore-prefixed marker names.
    pub fn markers(&self, names: &MarkerNames) -> Option<Markers> {
        let names = names.with_prefix(SYMBOL_PREFIX);
        let mut scan = MarkerScan::default();
        for symbol in self.file.symbols() {
            if let Ok(name) = symbol.name_bytes() {
                scan.observe(&names, name, symbol.address());
            }
        }
        scan.finish()
    }

    /// Uses the whole `__DATA` segment rather than a single section.
    pub fn data_region(&self) -> Result<SectionReader<'data>> {
        let segment = self
            .file
            .segments()
            .find(|s| matches!(s.name(), Ok(Some(DATA_SEGMENT))))
            .ok_or(Error::SectionMissing(DATA_SEGMENT))?;

        Ok(SectionReader::new(
            DATA_SEGMENT,
            segment.address(),
            segment.data()?,
        ))
    }
}
