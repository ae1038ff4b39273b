//! Clone nodes
//!
//! A clone re-traverses another node under its own world matrix, so one
//! subtree can appear at several places without duplicating its data.

use hecs::Entity;

use super::{NodeKind, SceneGraph};
use crate::core::{Property, SceneError};

/// Non-owning reference to the node a clone instances
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloneTarget {
    pub(crate) entity: Option<Entity>,
}

impl CloneTarget {
    #[must_use]
    pub fn entity(&self) -> Option<Entity> {
        self.entity
    }
}

impl SceneGraph {
    /// Spawn a clone node, optionally pointing at `target` right away
    pub fn spawn_clone(&mut self, name: impl Into<String>, target: Option<Entity>) -> Entity {
        let clone = self.spawn_node_with(name, NodeKind::Clone, CloneTarget::default());
        if let Some(target) = target {
            if let Err(err) = self.set_clone_target(clone, target) {
                log::warn!("Clone created without target: {err}");
            }
        }
        clone
    }

    /// # Errors
    ///
    /// Returns an error if the entity is not a clone
    pub fn clone_target(&self, entity: Entity) -> Result<Option<Entity>, SceneError> {
        Ok(self.component::<CloneTarget>(entity)?.entity)
    }

    /// Point a clone at `target`.
    ///
    /// A target without a parent is adopted by the clone, so changes to it
    /// invalidate the clone's scene. Adoption is skipped when the clone sits
    /// below the target, which would make the parent chain cyclic.
    ///
    /// # Errors
    ///
    /// Returns an error if `clone` is not a clone or `target` is not a node
    pub fn set_clone_target(&mut self, clone: Entity, target: Entity) -> Result<(), SceneError> {
        let orphan = self.node(target)?.parent.is_none();
        self.component_mut::<CloneTarget>(clone)?.entity = Some(target);

        if orphan && target != clone && !self.is_ancestor(target, clone) {
            self.adopt(clone, target)?;
        }

        self.notify(clone, Property::Entity);
        self.invalidate(clone);
        Ok(())
    }
}
