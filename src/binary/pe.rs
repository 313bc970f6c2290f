//! PE (Portable Executable) marker lookup.
//!
//! native-image executables for Windows carry no COFF symbol table, so the
//! markers are recovered from the export directory instead: the name
//! pointer table gives the index of each marker, and the export address
//! table at that index gives its RVA.

use super::{MarkerNames, Markers, SectionReader};
use crate::error::{Error, Result};
use object::pe::{
    ImageDataDirectory, ImageNtHeaders32, ImageNtHeaders64, IMAGE_DIRECTORY_ENTRY_EXPORT,
};
use object::read::pe::{ImageNtHeaders, PeFile, SectionTable};
use object::{FileKind, LittleEndian as LE};
use tracing::{debug, trace};

const DATA_SECTION: &str = ".data";

/// Size of the IMAGE_EXPORT_DIRECTORY fields ahead of the counts:
/// Characteristics, TimeDateStamp, MajorVersion, MinorVersion, Name, Base.
const EXPORT_PREFIX_SIZE: u64 = 20;
const ATTRIBUTE_SIZE: u64 = 4;
const POINTER_SIZE: u64 = 4;

// Attribute indices following the prefix.
const NUMBER_OF_FUNCTIONS: u64 = 0;
const NUMBER_OF_NAMES: u64 = 1;
const ADDRESS_OF_FUNCTIONS: u64 = 2;
const ADDRESS_OF_NAMES: u64 = 3;

/// A parsed PE file.
///
/// Only the headers are read up front; the export directory and the `.data`
/// section are mapped when they are first needed.
pub struct PeImage<'data> {
    data: &'data [u8],
    sections: SectionTable<'data>,
    export_directory: Option<&'data ImageDataDirectory>,
}

impl<'data> PeImage<'data> {
    /// Returns `None` unless `data` has readable PE32 or PE32+ headers.
    pub fn probe(data: &'data [u8]) -> Option<Self> {
        let image = match FileKind::parse(data) {
            Ok(FileKind::Pe32) => Self::load::<ImageNtHeaders32>(data),
            Ok(FileKind::Pe64) => Self::load::<ImageNtHeaders64>(data),
            _ => return None,
        };

        match image {
            Ok(image) => Some(image),
            Err(e) => {
                debug!("unable to read PE executable: {}", e);
                None
            }
        }
    }

    fn load<Pe: ImageNtHeaders>(data: &'data [u8]) -> Result<Self> {
        let file = PeFile::<Pe>::parse(data)?;
        let export_directory = file
            .data_directory(IMAGE_DIRECTORY_ENTRY_EXPORT)
            .filter(|dir| dir.size.get(LE) != 0);

        Ok(Self {
            data,
            sections: file.section_table(),
            export_directory,
        })
    }

    /// Resolves the markers through the export directory.
    pub fn markers(&self, names: &MarkerNames) -> Result<Option<Markers>> {
        let Some(dir) = self.export_directory else {
            debug!("exported data directory is missing");
            return Ok(None);
        };

        let bytes = dir.data(self.data, &self.sections)?;
        ExportDirectory::new(dir.virtual_address.get(LE), bytes).resolve(names)
    }

    /// The `.data` section.
    pub fn data_region(&self) -> Result<SectionReader<'data>> {
        let section = self
            .sections
            .iter()
            .find(|s| s.raw_name() == DATA_SECTION.as_bytes())
            .ok_or(Error::SectionMissing(DATA_SECTION))?;

        Ok(SectionReader::new(
            DATA_SECTION,
            u64::from(section.virtual_address.get(LE)),
            section.pe_data(self.data)?,
        ))
    }
}

/// The fixed header of an export directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportHeader {
    pub number_of_functions: u32,
    pub number_of_names: u32,
    pub address_of_functions: u32,
    pub address_of_names: u32,
}

/// Positions of the markers in the name pointer table.
#[derive(Debug, Default)]
struct MarkerIndices {
    sbom: Option<u32>,
    sbom_length: Option<u32>,
    version: Option<u32>,
}

/// Raw bytes of the export data directory, starting at `rva`.
#[derive(Debug, Clone, Copy)]
pub struct ExportDirectory<'data> {
    rva: u32,
    bytes: &'data [u8],
}

impl<'data> ExportDirectory<'data> {
    pub fn new(rva: u32, bytes: &'data [u8]) -> Self {
        Self { rva, bytes }
    }

    fn invalid_index(&self, index: u64) -> Error {
        debug!(index, len = self.bytes.len(), "invalid index into export directory");
        Error::InvalidIndex {
            index,
            len: self.bytes.len(),
        }
    }

    /// Converts an RVA into an offset within the directory bytes.
    fn relative(&self, address: u32) -> Result<u64> {
        u64::from(address)
            .checked_sub(u64::from(self.rva))
            .ok_or_else(|| self.invalid_index(u64::from(address)))
    }

    /// Reads a little-endian u32 at `offset`.
    ///
    /// A read ending exactly at the end of the buffer is rejected as well.
    fn read_u32(&self, offset: u64) -> Result<u32> {
        match offset.checked_add(4) {
            Some(end) if end < self.bytes.len() as u64 => {
                let start = offset as usize;
                let mut raw = [0u8; 4];
                raw.copy_from_slice(&self.bytes[start..start + 4]);
                Ok(u32::from_le_bytes(raw))
            }
            _ => Err(self.invalid_index(offset)),
        }
    }

    fn attribute(&self, index: u64) -> Result<u32> {
        self.read_u32(EXPORT_PREFIX_SIZE + index * ATTRIBUTE_SIZE)
    }

    pub fn header(&self) -> Result<ExportHeader> {
        Ok(ExportHeader {
            number_of_functions: self.attribute(NUMBER_OF_FUNCTIONS)?,
            number_of_names: self.attribute(NUMBER_OF_NAMES)?,
            address_of_functions: self.attribute(ADDRESS_OF_FUNCTIONS)?,
            address_of_names: self.attribute(ADDRESS_OF_NAMES)?,
        })
    }

    /// Whether the NUL-terminated string at `offset` equals `name`.
    fn name_matches(&self, offset: usize, name: &str) -> bool {
        let tail = &self.bytes[offset..];
        tail.starts_with(name.as_bytes()) && tail.get(name.len()) == Some(&0)
    }

    fn find_markers(&self, header: &ExportHeader, names: &MarkerNames) -> Result<MarkerIndices> {
        let mut indices = MarkerIndices::default();
        if header.number_of_names == 0 {
            return Ok(indices);
        }

        let names_base = self.relative(header.address_of_names)?;
        for i in 0..header.number_of_names {
            let name_address = self.read_u32(names_base + u64::from(i) * POINTER_SIZE)?;
            let name_offset = self.relative(name_address)?;
            if name_offset >= self.bytes.len() as u64 {
                return Err(self.invalid_index(name_offset));
            }

            let name_offset = name_offset as usize;
            if self.name_matches(name_offset, &names.sbom) {
                indices.sbom = Some(i);
            } else if self.name_matches(name_offset, &names.sbom_length) {
                indices.sbom_length = Some(i);
            } else if self.name_matches(name_offset, &names.version) {
                indices.version = Some(i);
            }
        }

        Ok(indices)
    }

    /// Reads entry `index` of the export address table.
    fn function_pointer(&self, header: &ExportHeader, index: u32) -> Result<u32> {
        let functions_base = self.relative(header.address_of_functions)?;
        self.read_u32(functions_base + u64::from(index) * POINTER_SIZE)
    }

    /// Resolves the marker RVAs, or `None` if any marker is not exported.
    pub fn resolve(&self, names: &MarkerNames) -> Result<Option<Markers>> {
        let header = self.header()?;
        trace!(?header, "export directory");

        let indices = self.find_markers(&header, names)?;
        let (Some(sbom), Some(sbom_length), Some(version)) =
            (indices.sbom, indices.sbom_length, indices.version)
        else {
            return Ok(None);
        };

        let version = match self.function_pointer(&header, version) {
            Ok(address) => address,
            Err(e) => {
                trace!("version info pointer unavailable: {}", e);
                0
            }
        };

        Ok(Some(Markers {
            sbom: u64::from(self.function_pointer(&header, sbom)?),
            sbom_length: u64::from(self.function_pointer(&header, sbom_length)?),
            version: u64::from(version),
        }))
    }
}
