//! FILENAME: core/hypercube/src/object.rs
//! PURPOSE: Client handle of one engine object and its batched edits.
//! CONTEXT: Edits are staged on a private copy of the property tree and
//! committed to the engine as one unit. A concurrent fetch therefore sees
//! either the old tree or the new one, never a mix. Pagers handed out by
//! the object only remember a path and re-resolve it on every fetch.

use crate::config::PagerConfig;
use crate::definition::HyperCubeDefinition;
use crate::error::HyperCubeResult;
use crate::gateway::{EngineGateway, ObjectId};
use crate::pager::Pager;
use crate::path::CubePath;
use crate::properties::ObjectProperties;
use crate::{log_debug, log_info, log_warn};

pub struct GenericObject<'g, G: EngineGateway + ?Sized> {
    gateway: &'g G,
    id: ObjectId,
    /// Last successfully committed properties.
    properties: ObjectProperties,
    config: PagerConfig,
}

impl<'g, G: EngineGateway + ?Sized> GenericObject<'g, G> {
    /// Creates an empty object of `object_type` on the engine.
    pub fn create(gateway: &'g G, object_type: &str) -> HyperCubeResult<Self> {
        let id = gateway.create_object(object_type)?;
        log_info!("OBJECT", "created object {} of type '{}'", id, object_type);
        Ok(GenericObject {
            gateway,
            id,
            properties: ObjectProperties::new(object_type),
            config: PagerConfig::default(),
        })
    }

    /// Pager settings handed to every pager created from now on.
    pub fn with_config(mut self, config: PagerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn config(&self) -> &PagerConfig {
        &self.config
    }

    pub fn properties(&self) -> &ObjectProperties {
        &self.properties
    }

    /// A copy of the committed cube at `path`, for editing.
    pub fn hypercube(&self, path: &str) -> HyperCubeResult<HyperCubeDefinition> {
        let path = CubePath::parse(path)?;
        self.properties.hypercube(&path).cloned()
    }

    // ========================================================================
    // EDITING
    // ========================================================================

    /// Opens an edit batch on a copy of the committed properties. Nothing is
    /// sent to the engine until `EditBatch::apply`.
    pub fn begin_edit(&mut self) -> EditBatch<'_, 'g, G> {
        let staged = self.properties.clone();
        EditBatch {
            object: self,
            staged,
        }
    }

    /// Runs `edit` against a staged copy and commits the copy exactly once,
    /// whatever `edit` returns. An error from `edit` takes precedence over a
    /// commit error.
    pub fn with_suspended_layout<T, F>(&mut self, edit: F) -> HyperCubeResult<T>
    where
        F: FnOnce(&mut ObjectProperties) -> HyperCubeResult<T>,
    {
        let mut staged = self.properties.clone();
        let outcome = edit(&mut staged);
        let applied = self.apply(staged);
        match (outcome, applied) {
            (Err(e), _) => Err(e),
            (Ok(_), Err(e)) => Err(e),
            (Ok(value), Ok(())) => Ok(value),
        }
    }

    /// Stores `definition` at `path` and commits.
    pub fn set_hypercube(&mut self, path: &str, definition: HyperCubeDefinition) -> HyperCubeResult<()> {
        let path = CubePath::parse(path)?;
        self.with_suspended_layout(|props| props.set_hypercube(&path, definition))
    }

    fn apply(&mut self, staged: ObjectProperties) -> HyperCubeResult<()> {
        if let Err(e) = staged.tree.validate() {
            log_warn!("COMMIT", "object {} rejected: {}", self.id, e);
            return Err(e);
        }
        self.gateway.commit(self.id, &staged)?;
        let cubes = staged.cube_paths().len();
        self.properties = staged;
        log_info!("COMMIT", "object {} committed with {} cube(s)", self.id, cubes);
        Ok(())
    }

    // ========================================================================
    // PAGERS
    // ========================================================================

    /// A pager for the cube committed at `path`.
    pub fn get_pager(&self, path: &str) -> HyperCubeResult<Pager<'g, G>> {
        let path = CubePath::parse(path)?;
        self.pager_for(path)
    }

    /// One pager per cube reachable from the committed properties.
    pub fn get_all_pagers(&self) -> HyperCubeResult<Vec<Pager<'g, G>>> {
        self.properties
            .cube_paths()
            .into_iter()
            .map(|path| self.pager_for(path))
            .collect()
    }

    fn pager_for(&self, path: CubePath) -> HyperCubeResult<Pager<'g, G>> {
        let handle = self.gateway.resolve_path(self.id, &path)?;
        log_debug!(
            "OBJECT",
            "pager for {} on object {} ({} columns)",
            path,
            self.id,
            handle.column_count
        );
        Ok(Pager::new(self.gateway, self.id, path, self.config.clone()))
    }
}

// ============================================================================
// EDIT BATCH
// ============================================================================

/// Staged edits of one object. Consumed by `apply` or `cancel`; dropping a
/// batch discards its edits.
#[must_use = "an edit batch does nothing until it is applied"]
pub struct EditBatch<'o, 'g, G: EngineGateway + ?Sized> {
    object: &'o mut GenericObject<'g, G>,
    staged: ObjectProperties,
}

impl<'o, 'g, G: EngineGateway + ?Sized> EditBatch<'o, 'g, G> {
    pub fn properties(&self) -> &ObjectProperties {
        &self.staged
    }

    pub fn properties_mut(&mut self) -> &mut ObjectProperties {
        &mut self.staged
    }

    pub fn set_hypercube(&mut self, path: &str, definition: HyperCubeDefinition) -> HyperCubeResult<()> {
        let path = CubePath::parse(path)?;
        self.staged.set_hypercube(&path, definition)
    }

    pub fn hypercube_mut(&mut self, path: &str) -> HyperCubeResult<&mut HyperCubeDefinition> {
        let path = CubePath::parse(path)?;
        self.staged.hypercube_mut(&path)
    }

    /// Commits every staged edit as one unit.
    pub fn apply(self) -> HyperCubeResult<()> {
        let EditBatch { object, staged } = self;
        object.apply(staged)
    }

    pub fn cancel(self) {
        log_debug!("COMMIT", "edit batch on object {} cancelled", self.object.id);
    }
}
