//! FILENAME: core/hypercube/src/path.rs
//! PURPOSE: Slash-delimited addresses of hypercubes inside an object.
//! CONTEXT: "/container0/hyperCubeDef" names the cube stored under the
//! property key "hyperCubeDef" of the container "container0". Every segment
//! but the last is a container name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{HyperCubeError, HyperCubeResult};

/// Property key under which an object's top-level cube is stored.
pub const HYPERCUBE_PROPERTY: &str = "hyperCubeDef";

/// Serialized as its list of segments; deserialization goes through
/// `from_segments`, so a path always has at least one valid segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CubePath {
    segments: SmallVec<[String; 2]>,
}

impl CubePath {
    pub fn parse(path: &str) -> HyperCubeResult<CubePath> {
        let rest = path.strip_prefix('/').ok_or_else(|| {
            HyperCubeError::validation(format!("cube path '{}' must start with '/'", path))
        })?;

        let mut segments = SmallVec::new();
        for segment in rest.split('/') {
            validate_key(segment).map_err(|_| {
                HyperCubeError::validation(format!("cube path '{}' has an empty segment", path))
            })?;
            segments.push(segment.to_string());
        }
        Ok(CubePath { segments })
    }

    /// Path of the top-level cube, "/hyperCubeDef".
    pub fn top_level() -> CubePath {
        CubePath {
            segments: SmallVec::from_iter([HYPERCUBE_PROPERTY.to_string()]),
        }
    }

    pub fn from_segments<I, S>(segments: I) -> HyperCubeResult<CubePath>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: SmallVec<[String; 2]> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(HyperCubeError::validation("cube path has no segments"));
        }
        for segment in &segments {
            validate_key(segment)?;
        }
        Ok(CubePath { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Container names leading to the cube.
    pub fn containers(&self) -> &[String] {
        &self.segments[..self.segments.len() - 1]
    }

    /// Property key of the cube inside its innermost container.
    pub fn property_key(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    pub fn child(&self, key: &str) -> HyperCubeResult<CubePath> {
        validate_key(key)?;
        let mut segments = self.segments.clone();
        segments.push(key.to_string());
        Ok(CubePath { segments })
    }

    pub fn contains(&self, segment: &str) -> bool {
        self.segments.iter().any(|s| s == segment)
    }
}

/// Property keys are non-empty and may not contain '/'.
pub fn validate_key(key: &str) -> HyperCubeResult<()> {
    if key.is_empty() || key.contains('/') {
        return Err(HyperCubeError::validation(format!(
            "invalid property key '{}'",
            key
        )));
    }
    Ok(())
}

impl fmt::Display for CubePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl TryFrom<Vec<String>> for CubePath {
    type Error = HyperCubeError;

    fn try_from(segments: Vec<String>) -> Result<Self, Self::Error> {
        CubePath::from_segments(segments)
    }
}

impl From<CubePath> for Vec<String> {
    fn from(path: CubePath) -> Self {
        path.segments.into_vec()
    }
}

impl FromStr for CubePath {
    type Err = HyperCubeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CubePath::parse(s)
    }
}
