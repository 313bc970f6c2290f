//! ELF marker lookup.

use super::{MarkerNames, MarkerScan, Markers, SectionReader};
use crate::error::{Error, Result};
use object::{FileKind, Object, ObjectSection, ObjectSymbol};
use tracing::debug;

/// Region the native-image markers point into.
const DATA_SECTION: &str = ".data";

pub struct ElfImage<'data> {
    file: object::File<'data>,
}

impl<'data> ElfImage<'data> {
    /// Returns `None` unless `data` is a readable ELF file.
    pub fn probe(data: &'data [u8]) -> Option<Self> {
        if !matches!(FileKind::parse(data), Ok(FileKind::Elf32 | FileKind::Elf64)) {
            return None;
        }

        match object::File::parse(data) {
            Ok(file) => Some(Self { file }),
            Err(e) => {
                debug!("unable to read ELF executable: {}", e);
                None
            }
        }
    }

    /// Looks in the static symbol table first, then in the dynamic one.
    pub fn markers(&self, names: &MarkerNames) -> Option<Markers> {
        let mut scan = MarkerScan::default();
        for symbol in self.file.symbols() {
            if let Ok(name) = symbol.name_bytes() {
                scan.observe(names, name, symbol.address());
            }
        }
        if let Some(markers) = scan.finish() {
            return Some(markers);
        }

        for symbol in self.file.dynamic_symbols() {
            if let Ok(name) = symbol.name_bytes() {
                scan.observe(names, name, symbol.address());
            }
        }
        scan.finish()
    }

    /// The `.data` section.
    pub fn data_region(&self) -> Result<SectionReader<'data>> {
        let section = self
            .file
            .section_by_name(DATA_SECTION)
            .ok_or(Error::SectionMissing(DATA_SECTION))?;

        Ok(SectionReader::new(
            DATA_SECTION,
            section.address(),
            section.data()?,
        ))
    }
}
