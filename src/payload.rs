//! Embedded SBOM payload decoding.
//!
//! native-image stores the SBOM as a gzip-compressed CycloneDX document. The
//! `sbom_length` marker points at an 8-byte little-endian length and the
//! `sbom` marker at the compressed bytes, both inside the data region.

use crate::error::{Error, Result};
use flate2::read::MultiGzDecoder;
use serde::{Deserialize, Deserializer, Serialize};
use std::io::Read;
use tracing::trace;

/// Size of the length field the `sbom_length` marker points at.
pub const LENGTH_FIELD_SIZE: u64 = 8;

/// Offsets of the payload and its length field within the data region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadLocation {
    pub payload_start: u64,
    pub length_offset: u64,
}

/// The subset of CycloneDX native-image writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NativeImageBom {
    #[serde(deserialize_with = "null_as_default")]
    pub bom_format: String,
    #[serde(deserialize_with = "null_as_default")]
    pub spec_version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub version: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub components: Vec<ComponentRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentRecord {
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub component_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub group: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Property {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub value: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Returns the compressed payload after checking both reads against `region`.
pub fn compressed_payload(region: &[u8], location: PayloadLocation) -> Result<&[u8]> {
    let len = region.len();

    let length_end = location
        .length_offset
        .checked_add(LENGTH_FIELD_SIZE)
        .filter(|&end| end <= len as u64)
        .ok_or(Error::BoundsViolation {
            symbol: "sbom_length",
            end: location.length_offset.saturating_add(LENGTH_FIELD_SIZE),
            len,
        })? as usize;

    let mut raw = [0u8; LENGTH_FIELD_SIZE as usize];
    raw.copy_from_slice(&region[length_end - LENGTH_FIELD_SIZE as usize..length_end]);
    let declared = u64::from_le_bytes(raw);
    trace!("found SBOM of length {}", declared);

    let payload_end = location
        .payload_start
        .checked_add(declared)
        .filter(|&end| end <= len as u64)
        .ok_or(Error::BoundsViolation {
            symbol: "sbom",
            end: location.payload_start.saturating_add(declared),
            len,
        })? as usize;

    Ok(&region[location.payload_start as usize..payload_end])
}

/// Decompresses a gzip stream, following concatenated members.
pub fn inflate(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = MultiGzDecoder::new(compressed);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(Error::Decompress)?;
    Ok(decompressed)
}

/// Parses a decompressed CycloneDX document.
pub fn parse(document: &[u8]) -> Result<NativeImageBom> {
    Ok(serde_json::from_slice(document)?)
}

/// Reads, decompresses and parses the SBOM at `location`.
pub fn decode(region: &[u8], location: PayloadLocation) -> Result<NativeImageBom> {
    let compressed = compressed_payload(region, location)?;
    let document = inflate(compressed)?;
    parse(&document)
}
