//! Scene graph storage, hierarchy and change protocol
//!
//! Nodes live in a `hecs::World`. Each one carries a [`Node`] plus, depending
//! on its kind, a [`Camera`](super::Camera), [`Light`](super::Light),
//! [`Collider`](super::Collider), [`CloneTarget`](super::CloneTarget) or
//! [`Mesh`](crate::renderer::Mesh) component.
//!
//! Every setter follows the same order: store the value, report the property,
//! report the matrix (transform fields only), then invalidate. Invalidation
//! names the topmost ancestor of the changed node, so however deep a change
//! happens there is one signal per scene.

use hecs::{Component, Entity};

use super::{CloneTarget, Deferred, Node, NodeKind};
use crate::core::{EventQueue, Property, SceneError, SceneEvent};
use crate::math::{Matrix4, Vector3};
use crate::renderer::RenderContext;

/// Retained scene graph
#[derive(Default)]
pub struct SceneGraph {
    pub(crate) world: hecs::World,
    pub(crate) events: EventQueue,
}

impl std::fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneGraph")
            .field("entities", &self.world.len())
            .field("pending_events", &self.events.pending_count())
            .finish()
    }
}

impl SceneGraph {
    /// Create an empty graph
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Underlying entity storage
    #[must_use]
    pub fn world(&self) -> &hecs::World {
        &self.world
    }

    /// Check if an entity exists
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.world.contains(entity)
    }

    // -------------------------------------------------------------------------
    // Spawning
    // -------------------------------------------------------------------------

    pub(crate) fn spawn_node(&mut self, name: impl Into<String>, kind: NodeKind) -> Entity {
        self.world.spawn((Node::new(name, kind),))
    }

    pub(crate) fn spawn_node_with<C: Component>(
        &mut self,
        name: impl Into<String>,
        kind: NodeKind,
        component: C,
    ) -> Entity {
        self.world.spawn((Node::new(name, kind), component))
    }

    /// Spawn a plain spatial node
    pub fn spawn_entity(&mut self, name: impl Into<String>) -> Entity {
        self.spawn_node(name, NodeKind::Entity)
    }

    /// Spawn a group that forwards traversal to its children
    pub fn spawn_group(&mut self, name: impl Into<String>) -> Entity {
        self.spawn_node(name, NodeKind::Group)
    }

    /// Despawn a node and, recursively, every child it owns
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist
    pub fn despawn(&mut self, entity: Entity) -> Result<(), SceneError> {
        let parent = self.node(entity)?.parent;
        if let Some(parent) = parent {
            if let Ok(mut p) = self.world.get::<&mut Node>(parent) {
                p.remove_child(entity);
            }
        }

        let mut stack = vec![entity];
        while let Some(e) = stack.pop() {
            if let Ok(node) = self.world.get::<&Node>(e) {
                stack.extend(node.children.iter().copied());
            }
            let target = self.world.get::<&CloneTarget>(e).ok().and_then(|t| t.entity);
            // A child may already be gone if it was despawned directly
            let _ = self.world.despawn(e);

            // Targets adopted by a clone are not its children and outlive it
            if let Some(target) = target {
                if let Ok(mut node) = self.world.get::<&mut Node>(target) {
                    if node.parent == Some(e) {
                        node.parent = None;
                    }
                }
            }
        }

        if let Some(parent) = parent.filter(|p| self.contains(*p)) {
            self.notify(parent, Property::Children);
            self.invalidate(parent);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Component access
    // -------------------------------------------------------------------------

    /// Borrow a node
    ///
    /// # Errors
    ///
    /// Returns an error if the entity does not exist or is not a scene node
    pub fn node(&self, entity: Entity) -> Result<hecs::Ref<'_, Node>, SceneError> {
        self.component::<Node>(entity)
    }

    pub(crate) fn node_mut(&self, entity: Entity) -> Result<hecs::RefMut<'_, Node>, SceneError> {
        self.component_mut::<Node>(entity)
    }

    pub(crate) fn component<T: Component>(&self, entity: Entity) -> Result<hecs::Ref<'_, T>, SceneError> {
        self.world
            .get::<&T>(entity)
            .map_err(|e| SceneError::from_component::<T>(entity, e))
    }

    pub(crate) fn component_mut<T: Component>(
        &self,
        entity: Entity,
    ) -> Result<hecs::RefMut<'_, T>, SceneError> {
        self.world
            .get::<&mut T>(entity)
            .map_err(|e| SceneError::from_component::<T>(entity, e))
    }

    /// Find the first node with the given name
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<Entity> {
        self.world
            .query::<&Node>()
            .iter()
            .find(|(_, node)| node.name == name)
            .map(|(e, _)| e)
    }

    // -------------------------------------------------------------------------
    // Getters
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the entity is not a scene node
    pub fn name(&self, entity: Entity) -> Result<String, SceneError> {
        Ok(self.node(entity)?.name.clone())
    }

    /// # Errors
    ///
    /// Returns an error if the entity is not a scene node
    pub fn kind(&self, entity: Entity) -> Result<NodeKind, SceneError> {
        Ok(self.node(entity)?.kind)
    }

    /// # Errors
    ///
    /// Returns an error if the entity is not a scene node
    pub fn location(&self, entity: Entity) -> Result<Vector3, SceneError> {
        Ok(self.node(entity)?.transform.location())
    }

    /// # Errors
    ///
    /// Returns an error if the entity is not a scene node
    pub fn rotation_axis(&self, entity: Entity) -> Result<Vector3, SceneError> {
        Ok(self.node(entity)?.transform.rotation_axis())
    }

    /// Rotation angle in degrees
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not a scene node
    pub fn rotation_angle(&self, entity: Entity) -> Result<f32, SceneError> {
        Ok(self.node(entity)?.transform.rotation_angle())
    }

    /// # Errors
    ///
    /// Returns an error if the entity is not a scene node
    pub fn scale(&self, entity: Entity) -> Result<Vector3, SceneError> {
        Ok(self.node(entity)?.transform.scale())
    }

    /// Local matrix
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not a scene node
    pub fn matrix(&self, entity: Entity) -> Result<Matrix4, SceneError> {
        Ok(self.node(entity)?.transform.matrix())
    }

    /// Inverse of the local matrix
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not a scene node
    pub fn inverse_matrix(&self, entity: Entity) -> Result<Matrix4, SceneError> {
        Ok(self.node(entity)?.transform.inverse_matrix())
    }

    /// # Errors
    ///
    /// Returns an error if the entity is not a scene node
    pub fn is_visible(&self, entity: Entity) -> Result<bool, SceneError> {
        Ok(self.node(entity)?.visible)
    }

    /// # Errors
    ///
    /// Returns an error if the entity is not a scene node
    pub fn parent(&self, entity: Entity) -> Result<Option<Entity>, SceneError> {
        Ok(self.node(entity)?.parent)
    }

    /// # Errors
    ///
    /// Returns an error if the entity is not a scene node
    pub fn children(&self, entity: Entity) -> Result<Vec<Entity>, SceneError> {
        Ok(self.node(entity)?.children.to_vec())
    }

    /// Composed matrix from the top of the parent chain down to `entity`
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not a scene node
    pub fn world_matrix(&self, entity: Entity) -> Result<Matrix4, SceneError> {
        let mut matrix = self.matrix(entity)?;
        let mut current = self.parent(entity)?;
        let mut guard = 0;
        while let Some(e) = current {
            guard += 1;
            if guard > super::MAX_DEPTH {
                break;
            }
            let node = self.node(e)?;
            matrix = node.transform.matrix() * matrix;
            current = node.parent;
        }
        Ok(matrix)
    }

    /// Topmost ancestor of `entity` (itself if it has no parent)
    #[must_use]
    pub fn root_of(&self, entity: Entity) -> Entity {
        let mut root = entity;
        let mut guard = 0;
        while let Ok(Some(parent)) = self.parent(root) {
            guard += 1;
            if guard > super::MAX_DEPTH {
                break;
            }
            root = parent;
        }
        root
    }

    /// Check if `ancestor` appears on the parent chain of `entity`
    #[must_use]
    pub fn is_ancestor(&self, ancestor: Entity, entity: Entity) -> bool {
        let mut current = self.parent(entity).ok().flatten();
        let mut guard = 0;
        while let Some(e) = current {
            if e == ancestor {
                return true;
            }
            guard += 1;
            if guard > super::MAX_DEPTH {
                break;
            }
            current = self.parent(e).ok().flatten();
        }
        false
    }

    // -------------------------------------------------------------------------
    // Transform setters
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the entity is not a scene node
    pub fn set_location(&mut self, entity: Entity, location: Vector3) -> Result<(), SceneError> {
        self.node_mut(entity)?.transform.set_location(location);
        self.notify(entity, Property::Location);
        self.matrix_changed(entity);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the entity is not a scene node
    pub fn set_rotation_axis(&mut self, entity: Entity, axis: Vector3) -> Result<(), SceneError> {
        self.node_mut(entity)?.transform.set_rotation_axis(axis);
        self.notify(entity, Property::RotationAxis);
        self.matrix_changed(entity);
        Ok(())
    }

    /// Set the rotation angle in degrees
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not a scene node
    pub fn set_rotation_angle(&mut self, entity: Entity, degrees: f32) -> Result<(), SceneError> {
        self.node_mut(entity)?.transform.set_rotation_angle(degrees);
        self.notify(entity, Property::RotationAngle);
        self.matrix_changed(entity);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the entity is not a scene node
    pub fn set_scale(&mut self, entity: Entity, scale: Vector3) -> Result<(), SceneError> {
        self.node_mut(entity)?.transform.set_scale(scale);
        self.notify(entity, Property::Scale);
        self.matrix_changed(entity);
        Ok(())
    }

    /// Show or hide a node and everything below it
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not a scene node
    pub fn set_visible(&mut self, entity: Entity, visible: bool) -> Result<(), SceneError> {
        self.node_mut(entity)?.visible = visible;
        self.notify(entity, Property::Visible);
        self.invalidate(entity);
        Ok(())
    }

    /// Rename a node. Names are not drawn, so nothing is invalidated.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not a scene node
    pub fn set_name(&mut self, entity: Entity, name: impl Into<String>) -> Result<(), SceneError> {
        self.node_mut(entity)?.name = name.into();
        self.notify(entity, Property::Name);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Hierarchy
    // -------------------------------------------------------------------------

    /// Attach `child` under `parent`, detaching it from any previous parent
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::HierarchyCycle`] if `child` is `parent` or one of
    /// its ancestors, or an error if either entity is not a scene node
    pub fn add_child(&mut self, parent: Entity, child: Entity) -> Result<(), SceneError> {
        self.node(parent)?;
        let previous = self.node(child)?.parent;

        if child == parent || self.is_ancestor(child, parent) {
            return Err(SceneError::HierarchyCycle { parent, child });
        }

        if let Some(previous) = previous.filter(|&p| p != parent) {
            if let Ok(mut p) = self.world.get::<&mut Node>(previous) {
                p.remove_child(child);
            }
            self.notify(previous, Property::Children);
            self.invalidate(previous);
        }

        self.node_mut(parent)?.add_child(child);
        self.node_mut(child)?.parent = Some(parent);
        self.notify(parent, Property::Children);
        self.invalidate(parent);
        Ok(())
    }

    /// Detach `child` from `parent`. Returns `false` if it was not a child.
    ///
    /// # Errors
    ///
    /// Returns an error if either entity is not a scene node
    pub fn remove_child(&mut self, parent: Entity, child: Entity) -> Result<bool, SceneError> {
        let removed = self.node_mut(parent)?.remove_child(child);
        {
            let mut c = self.node_mut(child)?;
            if c.parent == Some(parent) {
                c.parent = None;
            }
        }
        if removed {
            self.notify(parent, Property::Children);
            self.invalidate(parent);
        }
        Ok(removed)
    }

    /// Set the parent link without listing `child` among the parent's
    /// children. Used when a clone adopts its orphan target.
    pub(crate) fn adopt(&mut self, parent: Entity, child: Entity) -> Result<(), SceneError> {
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Deferred jobs
    // -------------------------------------------------------------------------

    /// Queue a job for the next prepare of `entity`
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not a scene node
    pub fn schedule(&mut self, entity: Entity, job: Deferred) -> Result<(), SceneError> {
        self.node_mut(entity)?.queue.push(job);
        Ok(())
    }

    /// Queue a closure for the next prepare of `entity`
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not a scene node
    pub fn schedule_fn<F>(&mut self, entity: Entity, f: F) -> Result<(), SceneError>
    where
        F: FnOnce(&mut dyn RenderContext) + Send + Sync + 'static,
    {
        self.schedule(entity, Deferred::Custom(Box::new(f)))
    }

    // -------------------------------------------------------------------------
    // Notifications
    // -------------------------------------------------------------------------

    pub(crate) fn notify(&mut self, entity: Entity, property: Property) {
        self.events.push(SceneEvent::PropertyChanged { entity, property });
    }

    fn matrix_changed(&mut self, entity: Entity) {
        self.events.push(SceneEvent::MatrixChanged { entity });
        self.invalidate(entity);
    }

    /// Report that something visible changed at `entity`
    pub fn invalidate(&mut self, entity: Entity) {
        let root = self.root_of(entity);
        self.events.push(SceneEvent::Invalidate { root, source: entity });
    }

    /// Take every event pushed since the last drain, oldest first
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        self.events.swap();
        self.events.drain().collect()
    }

    /// Number of events waiting to be drained
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.events.pending_count()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::math::m4;

    #[test]
    fn test_setter_event_order() {
        let mut graph = SceneGraph::new();
        let e = graph.spawn_entity("cube");

        graph.set_location(e, Vec3::new(0.0, 0.0, -5.0)).unwrap();
        let events = graph.drain_events();

        assert_eq!(
            events,
            vec![
                SceneEvent::PropertyChanged {
                    entity: e,
                    property: Property::Location
                },
                SceneEvent::MatrixChanged { entity: e },
                SceneEvent::Invalidate { root: e, source: e },
            ]
        );
        assert_eq!(graph.matrix(e).unwrap(), m4::translation(Vec3::new(0.0, 0.0, -5.0)));
    }

    #[test]
    fn test_visibility_skips_matrix_event() {
        let mut graph = SceneGraph::new();
        let e = graph.spawn_entity("e");

        graph.set_visible(e, false).unwrap();
        let events = graph.drain_events();

        assert_eq!(events.len(), 2);
        assert!(!events.iter().any(|ev| matches!(ev, SceneEvent::MatrixChanged { .. })));
        assert!(!graph.is_visible(e).unwrap());
    }

    #[test]
    fn test_invalidate_names_topmost_ancestor() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn_group("root");
        let inner = graph.spawn_group("inner");
        let leaf = graph.spawn_entity("leaf");
        graph.add_child(root, inner).unwrap();
        graph.add_child(inner, leaf).unwrap();
        graph.drain_events();

        graph.set_scale(leaf, Vec3::splat(2.0)).unwrap();
        let invalidations: Vec<_> = graph
            .drain_events()
            .into_iter()
            .filter_map(|ev| match ev {
                SceneEvent::Invalidate { root, source } => Some((root, source)),
                _ => None,
            })
            .collect();

        assert_eq!(invalidations, vec![(root, leaf)]);
    }

    #[test]
    fn test_add_child_rejects_cycles() {
        let mut graph = SceneGraph::new();
        let a = graph.spawn_group("a");
        let b = graph.spawn_group("b");
        graph.add_child(a, b).unwrap();

        assert_eq!(
            graph.add_child(b, a),
            Err(SceneError::HierarchyCycle { parent: b, child: a })
        );
        assert_eq!(
            graph.add_child(a, a),
            Err(SceneError::HierarchyCycle { parent: a, child: a })
        );
    }

    #[test]
    fn test_reparenting_moves_child() {
        let mut graph = SceneGraph::new();
        let a = graph.spawn_group("a");
        let b = graph.spawn_group("b");
        let c = graph.spawn_entity("c");

        graph.add_child(a, c).unwrap();
        graph.add_child(b, c).unwrap();

        assert!(graph.children(a).unwrap().is_empty());
        assert_eq!(graph.children(b).unwrap(), vec![c]);
        assert_eq!(graph.parent(c).unwrap(), Some(b));

        assert!(graph.remove_child(b, c).unwrap());
        assert_eq!(graph.parent(c).unwrap(), None);
    }

    #[test]
    fn test_world_matrix_walks_parents() {
        let mut graph = SceneGraph::new();
        let outer = graph.spawn_group("outer");
        let inner = graph.spawn_group("inner");
        let leaf = graph.spawn_entity("leaf");
        graph.add_child(outer, inner).unwrap();
        graph.add_child(inner, leaf).unwrap();

        graph.set_location(outer, Vec3::X).unwrap();
        graph.set_location(inner, Vec3::X).unwrap();
        graph.set_location(leaf, Vec3::new(2.0, 3.0, 4.0)).unwrap();

        let origin = m4::origin_of(&graph.world_matrix(leaf).unwrap());
        assert!(origin.abs_diff_eq(Vec3::new(4.0, 3.0, 4.0), 1e-6));
    }

    #[test]
    fn test_despawn_is_recursive() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn_group("root");
        let group = graph.spawn_group("group");
        let leaf = graph.spawn_entity("leaf");
        graph.add_child(root, group).unwrap();
        graph.add_child(group, leaf).unwrap();

        graph.despawn(group).unwrap();

        assert!(!graph.contains(group));
        assert!(!graph.contains(leaf));
        assert!(graph.children(root).unwrap().is_empty());
        assert_eq!(graph.despawn(leaf), Err(SceneError::NoSuchEntity(leaf)));
    }

    #[test]
    fn test_find_by_name() {
        let mut graph = SceneGraph::new();
        let e = graph.spawn_entity("needle");
        graph.spawn_entity("hay");

        assert_eq!(graph.find_by_name("needle"), Some(e));
        assert_eq!(graph.find_by_name("missing"), None);

        graph.set_name(e, "renamed").unwrap();
        assert_eq!(graph.find_by_name("renamed"), Some(e));
    }

    #[test]
    fn test_missing_entity_errors() {
        let mut graph = SceneGraph::new();
        let e = graph.spawn_entity("gone");
        graph.despawn(e).unwrap();

        assert_eq!(graph.set_location(e, Vec3::ONE), Err(SceneError::NoSuchEntity(e)));
        assert_eq!(graph.pending_events(), 0);
    }
}
