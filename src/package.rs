//! Packages reported for a native image.

use crate::cpe::Cpe;
use crate::payload::ComponentRecord;
use serde::Serialize;
use tracing::debug;

/// Value of [`PackageRecord::found_by`].
pub const CATALOGER_NAME: &str = "graalvm-native-image-cataloger";

pub const LANGUAGE: &str = "java";
pub const PACKAGE_TYPE: &str = "graalvm-native-image";

/// A Java package recovered from a native image's embedded SBOM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    pub language: &'static str,
    #[serde(rename = "type")]
    pub package_type: &'static str,
    pub found_by: &'static str,
    pub cpes: Vec<Cpe>,
    pub metadata: JavaMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JavaMetadata {
    pub pom_properties: PomProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PomProperties {
    pub group_id: String,
}

impl PackageRecord {
    pub fn group(&self) -> &str {
        &self.metadata.pom_properties.group_id
    }
}

impl From<&ComponentRecord> for PackageRecord {
    /// Property values that are not valid CPEs are skipped.
    fn from(component: &ComponentRecord) -> Self {
        let cpes = component
            .properties
            .iter()
            .filter_map(|property| match property.value.parse::<Cpe>() {
                Ok(cpe) => Some(cpe),
                Err(e) => {
                    debug!(
                        package = %component.name,
                        value = %property.value,
                        "could not parse CPE: {}",
                        e
                    );
                    None
                }
            })
            .collect();

        Self {
            name: component.name.clone(),
            version: component.version.clone(),
            language: LANGUAGE,
            package_type: PACKAGE_TYPE,
            found_by: CATALOGER_NAME,
            cpes,
            metadata: JavaMetadata {
                pom_properties: PomProperties {
                    group_id: component.group.clone(),
                },
            },
        }
    }
}
