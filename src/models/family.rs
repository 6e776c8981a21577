use crate::utils::constants::{METADATA_SIDECAR_EXTENSION, SHAPEFILE_EXTENSIONS};
use std::collections::BTreeMap;

/// One file belonging to a shapefile family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyMember {
    pub file_name: String,
    /// Lowercased extension including the leading dot, e.g. `.shp.xml`
    pub extension: String,
}

/// Files sharing one base name that together define a single layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapefileFamily {
    pub base_name: String,
    pub members: Vec<FamilyMember>,
}

impl ShapefileFamily {
    pub fn new(base_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            members: Vec::new(),
        }
    }

    pub fn has_extension(&self, extension: &str) -> bool {
        self.members.iter().any(|m| m.extension == extension)
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.file_name.as_str())
    }

    /// Group a flat directory listing into families.
    ///
    /// Only primary extensions open a family; metadata sidecars are attached to an
    /// existing family and otherwise ignored. Unrecognised files are ignored.
    pub fn group<'a, I>(file_names: I) -> Vec<ShapefileFamily>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut families: BTreeMap<String, ShapefileFamily> = BTreeMap::new();
        let mut sidecars: Vec<(String, FamilyMember)> = Vec::new();

        for file_name in file_names {
            let Some((base, extension)) = split_family_extension(file_name) else {
                continue;
            };
            let member = FamilyMember {
                file_name: file_name.to_string(),
                extension: extension.clone(),
            };

            if extension == METADATA_SIDECAR_EXTENSION {
                sidecars.push((base, member));
            } else {
                families
                    .entry(base.clone())
                    .or_insert_with(|| ShapefileFamily::new(base))
                    .members
                    .push(member);
            }
        }

        for (base, member) in sidecars {
            if let Some(family) = families.get_mut(&base) {
                family.members.push(member);
            }
        }

        families
            .into_values()
            .map(|mut family| {
                family.members.sort_by(|a, b| a.file_name.cmp(&b.file_name));
                family
            })
            .collect()
    }
}

/// Split a filename into its base name and recognised family extension.
pub fn split_family_extension(file_name: &str) -> Option<(String, String)> {
    let lower = file_name.to_lowercase();

    if lower.ends_with(METADATA_SIDECAR_EXTENSION) && lower.len() > METADATA_SIDECAR_EXTENSION.len() {
        let base = &file_name[..file_name.len() - METADATA_SIDECAR_EXTENSION.len()];
        return Some((base.to_string(), METADATA_SIDECAR_EXTENSION.to_string()));
    }

    let dot = file_name.rfind('.')?;
    if dot == 0 {
        return None;
    }
    let extension = file_name[dot..].to_lowercase();
    if SHAPEFILE_EXTENSIONS.contains(&extension.as_str()) {
        Some((file_name[..dot].to_string(), extension))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_family_extension() {
        assert_eq!(
            split_family_extension("well001_s.shp"),
            Some(("well001_s".to_string(), ".shp".to_string()))
        );
        assert_eq!(
            split_family_extension("road01l.SHX"),
            Some(("road01l".to_string(), ".shx".to_string()))
        );
        assert_eq!(
            split_family_extension("surv01Labpt.shp.xml"),
            Some(("surv01Labpt".to_string(), ".shp.xml".to_string()))
        );
        assert_eq!(split_family_extension("readme.txt"), None);
        assert_eq!(split_family_extension(".shp"), None);
        assert_eq!(split_family_extension("noextension"), None);
    }

    #[test]
    fn test_group_families() {
        let files = [
            "well001_s.shp",
            "well001_s.shx",
            "well001_s.dbf",
            "well001_s.shp.xml",
            "road01l.shp",
            "notes.txt",
            "orphan.shp.xml",
        ];
        let families = ShapefileFamily::group(files.iter().copied());

        assert_eq!(families.len(), 2);
        assert_eq!(families[0].base_name, "road01l");
        assert_eq!(families[1].base_name, "well001_s");
        assert_eq!(families[1].members.len(), 4);
        assert!(families[1].has_extension(".shp.xml"));
        assert!(!families[0].has_extension(".dbf"));
    }
}
