//! FILENAME: core/hypercube/src/properties.rs
//! PURPOSE: Typed property tree of an engine object.
//! CONTEXT: An object hosts any number of hypercubes, each stored under a
//! property key, optionally nested inside named containers. Paths into the
//! tree are `CubePath`s. Entries are kept in key order so enumeration is
//! deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::definition::HyperCubeDefinition;
use crate::error::{HyperCubeError, HyperCubeResult};
use crate::path::{validate_key, CubePath};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Property {
    HyperCube(HyperCubeDefinition),
    Container(PropertyTree),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyTree {
    entries: BTreeMap<String, Property>,
}

impl PropertyTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Property> {
        self.entries.get(key)
    }

    /// Stores `property` under `key`, returning the previous entry.
    pub fn set(&mut self, key: &str, property: Property) -> HyperCubeResult<Option<Property>> {
        validate_key(key)?;
        Ok(self.entries.insert(key.to_string(), property))
    }

    pub fn remove(&mut self, key: &str) -> Option<Property> {
        self.entries.remove(key)
    }

    pub fn container(&self, key: &str) -> Option<&PropertyTree> {
        match self.entries.get(key) {
            Some(Property::Container(tree)) => Some(tree),
            _ => None,
        }
    }

    // ========================================================================
    // PATH ACCESS
    // ========================================================================

    pub fn hypercube(&self, path: &CubePath) -> HyperCubeResult<&HyperCubeDefinition> {
        let mut tree = self;
        for name in path.containers() {
            tree = tree
                .container(name)
                .ok_or_else(|| HyperCubeError::path_not_found(path.to_string()))?;
        }
        match tree.entries.get(path.property_key()) {
            Some(Property::HyperCube(def)) => Ok(def),
            _ => Err(HyperCubeError::path_not_found(path.to_string())),
        }
    }

    pub fn hypercube_mut(&mut self, path: &CubePath) -> HyperCubeResult<&mut HyperCubeDefinition> {
        let mut tree = self;
        for name in path.containers() {
            tree = match tree.entries.get_mut(name) {
                Some(Property::Container(inner)) => inner,
                _ => return Err(HyperCubeError::path_not_found(path.to_string())),
            };
        }
        match tree.entries.get_mut(path.property_key()) {
            Some(Property::HyperCube(def)) => Ok(def),
            _ => Err(HyperCubeError::path_not_found(path.to_string())),
        }
    }

    /// Stores a cube at `path`, creating missing containers on the way.
    /// A segment occupied by a cube cannot be turned into a container.
    pub fn set_hypercube(&mut self, path: &CubePath, definition: HyperCubeDefinition) -> HyperCubeResult<()> {
        let mut tree = self;
        for name in path.containers() {
            let entry = tree
                .entries
                .entry(name.clone())
                .or_insert_with(|| Property::Container(PropertyTree::new()));
            tree = match entry {
                Property::Container(inner) => inner,
                Property::HyperCube(_) => {
                    return Err(HyperCubeError::validation(format!(
                        "'{}' in {} holds a hypercube, not a container",
                        name, path
                    )))
                }
            };
        }
        tree.entries
            .insert(path.property_key().to_string(), Property::HyperCube(definition));
        Ok(())
    }

    pub fn remove_hypercube(&mut self, path: &CubePath) -> HyperCubeResult<HyperCubeDefinition> {
        let mut tree = self;
        for name in path.containers() {
            tree = match tree.entries.get_mut(name) {
                Some(Property::Container(inner)) => inner,
                _ => return Err(HyperCubeError::path_not_found(path.to_string())),
            };
        }
        match tree.entries.remove(path.property_key()) {
            Some(Property::HyperCube(def)) => Ok(def),
            Some(other) => {
                tree.entries.insert(path.property_key().to_string(), other);
                Err(HyperCubeError::path_not_found(path.to_string()))
            }
            None => Err(HyperCubeError::path_not_found(path.to_string())),
        }
    }

    /// Every cube path reachable from this tree, depth first in key order.
    pub fn cube_paths(&self) -> Vec<CubePath> {
        let mut paths = Vec::new();
        self.collect_cube_paths(&mut Vec::new(), &mut paths);
        paths
    }

    fn collect_cube_paths(&self, prefix: &mut Vec<String>, out: &mut Vec<CubePath>) {
        for (key, property) in &self.entries {
            prefix.push(key.clone());
            match property {
                Property::HyperCube(_) => {
                    // Keys were validated on insertion.
                    if let Ok(path) = CubePath::from_segments(prefix.iter().cloned()) {
                        out.push(path);
                    }
                }
                Property::Container(inner) => inner.collect_cube_paths(prefix, out),
            }
            prefix.pop();
        }
    }

    /// Validates every cube in the tree.
    pub fn validate(&self) -> HyperCubeResult<()> {
        for path in self.cube_paths() {
            self.hypercube(&path)?.validate().map_err(|e| match e {
                HyperCubeError::Validation(message) => {
                    HyperCubeError::Validation(format!("{}: {}", path, message))
                }
                other => other,
            })?;
        }
        Ok(())
    }
}

// ============================================================================
// OBJECT PROPERTIES
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Free-form type tag of the object, e.g. "mycustomtype".
    pub object_type: String,
}

/// All properties of one engine object, as committed in one unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectProperties {
    pub info: ObjectInfo,
    pub tree: PropertyTree,
}

impl ObjectProperties {
    pub fn new(object_type: impl Into<String>) -> Self {
        ObjectProperties {
            info: ObjectInfo {
                object_type: object_type.into(),
            },
            tree: PropertyTree::new(),
        }
    }

    pub fn hypercube(&self, path: &CubePath) -> HyperCubeResult<&HyperCubeDefinition> {
        self.tree.hypercube(path)
    }

    pub fn hypercube_mut(&mut self, path: &CubePath) -> HyperCubeResult<&mut HyperCubeDefinition> {
        self.tree.hypercube_mut(path)
    }

    pub fn set_hypercube(&mut self, path: &CubePath, definition: HyperCubeDefinition) -> HyperCubeResult<()> {
        self.tree.set_hypercube(path, definition)
    }

    pub fn cube_paths(&self) -> Vec<CubePath> {
        self.tree.cube_paths()
    }

    /// See `PropertyTree::validate`.
    pub fn validate(&self) -> HyperCubeResult<()> {
        self.tree.validate()
    }

    pub fn to_json(&self) -> HyperCubeResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| HyperCubeError::validation(format!("cannot serialize properties: {}", e)))
    }

    pub fn from_json(json: &str) -> HyperCubeResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| HyperCubeError::validation(format!("malformed properties: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(field: &str) -> HyperCubeDefinition {
        let mut def = HyperCubeDefinition::new();
        def.add_inline_dimension(field);
        def.add_inline_measure("Sum([Sales Amount])");
        def
    }

    fn path(p: &str) -> CubePath {
        CubePath::parse(p).unwrap()
    }

    #[test]
    fn test_set_creates_containers() {
        let mut tree = PropertyTree::new();
        tree.set_hypercube(&path("/container0/hyperCubeDef"), cube("Month")).unwrap();
        tree.set_hypercube(&path("/container1/hyperCubeDef"), cube("Year")).unwrap();

        assert!(tree.container("container0").is_some());
        let year = tree.hypercube(&path("/container1/hyperCubeDef")).unwrap();
        assert_eq!(year.dimensions[0].def.field_defs[0], "Year");
    }

    #[test]
    fn test_missing_segments_are_path_not_found() {
        let mut tree = PropertyTree::new();
        tree.set_hypercube(&path("/container0/hyperCubeDef"), cube("Month")).unwrap();

        for missing in ["/container9/hyperCubeDef", "/container0/other", "/hyperCubeDef", "/container0"] {
            assert!(
                matches!(tree.hypercube(&path(missing)), Err(HyperCubeError::PathNotFound(_))),
                "{} should not resolve",
                missing
            );
        }
    }

    #[test]
    fn test_cube_cannot_become_container() {
        let mut tree = PropertyTree::new();
        tree.set_hypercube(&path("/hyperCubeDef"), cube("Year")).unwrap();
        let result = tree.set_hypercube(&path("/hyperCubeDef/inner"), cube("Month"));
        assert!(matches!(result, Err(HyperCubeError::Validation(_))));
    }

    #[test]
    fn test_cube_paths_in_key_order() {
        let mut tree = PropertyTree::new();
        tree.set_hypercube(&path("/container1/hyperCubeDef"), cube("Year")).unwrap();
        tree.set_hypercube(&path("/container0/hyperCubeDef"), cube("Month")).unwrap();
        tree.set_hypercube(&path("/container0/nested/hyperCubeDef"), cube("Day")).unwrap();
        tree.set_hypercube(&path("/hyperCubeDef"), cube("YearMonth")).unwrap();

        let paths: Vec<String> = tree.cube_paths().iter().map(|p| p.to_string()).collect();
        assert_eq!(
            paths,
            vec![
                "/container0/hyperCubeDef",
                "/container0/nested/hyperCubeDef",
                "/container1/hyperCubeDef",
                "/hyperCubeDef",
            ]
        );
    }

    #[test]
    fn test_validate_reports_offending_path() {
        let mut tree = PropertyTree::new();
        let mut bad = cube("Year");
        bad.inter_column_sort_order = vec![0, 0];
        tree.set_hypercube(&path("/container0/hyperCubeDef"), bad).unwrap();

        match tree.validate() {
            Err(HyperCubeError::Validation(message)) => {
                assert!(message.starts_with("/container0/hyperCubeDef"))
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_object_properties_validate_covers_tree() {
        let mut props = ObjectProperties::new("mycustomtype");
        props.set_hypercube(&path("/container0/hyperCubeDef"), cube("Year")).unwrap();
        assert!(props.validate().is_ok());

        let mut bad = cube("Month");
        bad.inter_column_sort_order = vec![1, 1];
        props.set_hypercube(&path("/container1/hyperCubeDef"), bad).unwrap();
        match props.validate() {
            Err(HyperCubeError::Validation(message)) => {
                assert!(message.starts_with("/container1/hyperCubeDef"))
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_remove_hypercube() {
        let mut tree = PropertyTree::new();
        tree.set_hypercube(&path("/container0/hyperCubeDef"), cube("Year")).unwrap();
        assert!(tree.remove_hypercube(&path("/container0")).is_err());
        assert!(tree.remove_hypercube(&path("/container0/hyperCubeDef")).is_ok());
        assert!(tree.cube_paths().is_empty());
    }

    #[test]
    fn test_properties_json_keeps_sort_order() {
        let mut props = ObjectProperties::new("mycustomtype");
        let mut def = cube("Year");
        def.add_inline_dimension("Month");
        def.inter_column_sort_order = vec![1, 0, 2];
        props.set_hypercube(&CubePath::top_level(), def).unwrap();

        let parsed = ObjectProperties::from_json(&props.to_json().unwrap()).unwrap();
        assert_eq!(parsed, props);
        assert_eq!(
            parsed.hypercube(&CubePath::top_level()).unwrap().inter_column_sort_order,
            vec![1, 0, 2]
        );
    }
}
