//! Anatomical atlas labeling

use std::collections::BTreeMap;

use crate::error::DataIntegrityError;
use crate::types::Rgba;

/// A named anatomical region with its display colour
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: u32,
    pub name: String,
    pub color: Rgba,
}

/// Partition of a hemisphere's vertices into regions
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasLabeling {
    /// Region id per vertex
    labels: Vec<u32>,
    /// Region table keyed by id
    regions: BTreeMap<u32, Region>,
}

impl AtlasLabeling {
    /// Build a labeling, checking that every referenced region has a colour
    pub fn new(labels: Vec<u32>, regions: Vec<Region>) -> Result<Self, DataIntegrityError> {
        let regions: BTreeMap<u32, Region> = regions.into_iter().map(|r| (r.id, r)).collect();
        if let Some(&missing) = labels.iter().find(|id| !regions.contains_key(id)) {
            return Err(DataIntegrityError::MissingRegionColor { region: missing });
        }
        Ok(Self { labels, regions })
    }

    /// Check that the labeling covers exactly `vertex_count` vertices
    pub fn validate_against(&self, vertex_count: usize) -> Result<(), DataIntegrityError> {
        if self.labels.len() != vertex_count {
            return Err(DataIntegrityError::AtlasLengthMismatch {
                labels: self.labels.len(),
                vertices: vertex_count,
            });
        }
        Ok(())
    }

    pub fn vertex_count(&self) -> usize {
        self.labels.len()
    }

    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    pub fn region(&self, id: u32) -> Option<&Region> {
        self.regions.get(&id)
    }

    /// Region that owns a vertex
    pub fn region_of(&self, vertex: usize) -> Option<&Region> {
        self.labels.get(vertex).and_then(|id| self.regions.get(id))
    }

    /// Display colour of a vertex
    #[inline]
    pub fn color_of(&self, vertex: usize) -> Option<Rgba> {
        self.region_of(vertex).map(|r| r.color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions() -> Vec<Region> {
        vec![
            Region { id: 1, name: "G_frontal_sup".into(), color: [1.0, 0.0, 0.0, 1.0] },
            Region { id: 2, name: "S_central".into(), color: [0.0, 0.0, 1.0, 1.0] },
        ]
    }

    #[test]
    fn test_atlas_lookup() {
        let atlas = AtlasLabeling::new(vec![1, 2, 2], regions()).unwrap();
        assert_eq!(atlas.color_of(0), Some([1.0, 0.0, 0.0, 1.0]));
        assert_eq!(atlas.region_of(2).map(|r| r.name.as_str()), Some("S_central"));
        assert_eq!(atlas.color_of(3), None);
    }

    #[test]
    fn test_atlas_requires_colour_for_every_label() {
        let err = AtlasLabeling::new(vec![1, 7], regions()).unwrap_err();
        assert_eq!(err, DataIntegrityError::MissingRegionColor { region: 7 });
    }

    #[test]
    fn test_atlas_length_validation() {
        let atlas = AtlasLabeling::new(vec![1, 2], regions()).unwrap();
        assert!(atlas.validate_against(2).is_ok());
        assert!(matches!(
            atlas.validate_against(3),
            Err(DataIntegrityError::AtlasLengthMismatch { labels: 2, vertices: 3 })
        ));
    }
}
