//! Collider nodes and collision queries
//!
//! Colliders only report. Each visible collider contributes its world-space
//! point during the prepare phase; after the whole scene is prepared the view
//! asks the scene root's [`CollisionQuery`] which entities contain that
//! point and hands the answer back through [`SceneGraph::collide`]. What
//! counts as a collision is entirely up to the query.

use glam::Vec3;
use hecs::Entity;
use rustc_hash::FxHashSet;

use super::{NodeKind, SceneGraph, SceneInfo};
use crate::core::{Property, SceneError};
use crate::math::Vector3;

/// Last collision result of a collider node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collider {
    pub(crate) collisions: Vec<Entity>,
}

impl Collider {
    /// Entities this collider collided with in the last resolved frame
    #[must_use]
    pub fn collisions(&self) -> &[Entity] {
        &self.collisions
    }
}

/// Spatial query answering "which entities contain this point?"
pub trait CollisionQuery: Send + Sync {
    /// Entities colliding with `point` (world space)
    fn collisions_with(&self, point: Vector3, scene: &SceneInfo) -> Vec<Entity>;
}

impl<F> CollisionQuery for F
where
    F: Fn(Vector3, &SceneInfo) -> Vec<Entity> + Send + Sync,
{
    fn collisions_with(&self, point: Vector3, scene: &SceneInfo) -> Vec<Entity> {
        self(point, scene)
    }
}

pub(crate) struct CollisionProvider(pub(crate) Box<dyn CollisionQuery>);

/// World-space axis-aligned box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    #[must_use]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    #[must_use]
    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Inclusive containment test
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// Collision query over a fixed list of boxes
#[derive(Debug, Clone, Default)]
pub struct BoxVolumes {
    volumes: Vec<(Entity, Aabb)>,
}

impl BoxVolumes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a box owned by `entity`
    pub fn push(&mut self, entity: Entity, volume: Aabb) {
        self.volumes.push((entity, volume));
    }

    #[must_use]
    pub fn with(mut self, entity: Entity, volume: Aabb) -> Self {
        self.push(entity, volume);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}

impl CollisionQuery for BoxVolumes {
    fn collisions_with(&self, point: Vector3, _scene: &SceneInfo) -> Vec<Entity> {
        self.volumes
            .iter()
            .filter(|(_, volume)| volume.contains(point))
            .map(|(entity, _)| *entity)
            .collect()
    }
}

impl SceneGraph {
    /// Spawn a collider node
    pub fn spawn_collider(&mut self, name: impl Into<String>) -> Entity {
        self.spawn_node_with(name, NodeKind::Collider, Collider::default())
    }

    /// Entities the collider collided with in the last resolved frame
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not a collider
    pub fn collisions(&self, entity: Entity) -> Result<Vec<Entity>, SceneError> {
        Ok(self.component::<Collider>(entity)?.collisions.clone())
    }

    /// Replace the collider's collision set.
    ///
    /// Duplicates are dropped, first occurrence wins. Reporting a collision
    /// changes nothing visible, so the scene is not invalidated.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not a collider
    pub fn collide(&mut self, entity: Entity, collisions: Vec<Entity>) -> Result<(), SceneError> {
        let mut seen = FxHashSet::default();
        let collisions: Vec<Entity> = collisions.into_iter().filter(|e| seen.insert(*e)).collect();

        self.component_mut::<Collider>(entity)?.collisions = collisions;
        self.notify(entity, Property::Collisions);
        Ok(())
    }

    /// Give `entity` a spatial query capability, replacing any previous one
    ///
    /// # Errors
    ///
    /// Returns an error if the entity does not exist
    pub fn set_collision_query(
        &mut self,
        entity: Entity,
        query: impl CollisionQuery + 'static,
    ) -> Result<(), SceneError> {
        self.world
            .insert_one(entity, CollisionProvider(Box::new(query)))
            .map_err(|_| SceneError::NoSuchEntity(entity))
    }

    /// Remove the spatial query capability of `entity`
    pub fn clear_collision_query(&mut self, entity: Entity) {
        let _ = self.world.remove_one::<CollisionProvider>(entity);
    }

    /// Ask `entity` which entities collide with `point`.
    ///
    /// Entities without a query capability collide with nothing.
    #[must_use]
    pub fn collisions_with(&self, entity: Entity, point: Vector3, scene: &SceneInfo) -> Vec<Entity> {
        match self.world.get::<&CollisionProvider>(entity) {
            Ok(provider) => provider.0.collisions_with(point, scene),
            Err(_) => Vec::new(),
        }
    }

    /// Resolve every probe gathered by a prepare pass against `root`
    pub fn resolve_collisions(&mut self, root: Entity, scene: &SceneInfo) {
        for probe in &scene.colliders {
            let hits = self.collisions_with(root, probe.world_point, scene);
            if let Err(err) = self.collide(probe.target, hits) {
                log::warn!("Dropping collision result: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SceneEvent;

    #[test]
    fn test_aabb_contains_is_inclusive() {
        let volume = Aabb::from_center(Vec3::ZERO, Vec3::splat(0.5));
        assert!(volume.contains(Vec3::ZERO));
        assert!(volume.contains(Vec3::splat(0.5)));
        assert!(!volume.contains(Vec3::new(0.6, 0.0, 0.0)));
    }

    #[test]
    fn test_aabb_normalizes_corners() {
        let volume = Aabb::new(Vec3::ONE, Vec3::ZERO);
        assert_eq!(volume.min, Vec3::ZERO);
        assert_eq!(volume.max, Vec3::ONE);
    }

    #[test]
    fn test_collide_dedupes_in_order_without_invalidating() {
        let mut graph = SceneGraph::new();
        let probe = graph.spawn_collider("probe");
        let a = graph.spawn_entity("a");
        let b = graph.spawn_entity("b");

        graph.collide(probe, vec![b, a, b, a]).unwrap();

        assert_eq!(graph.collisions(probe).unwrap(), vec![b, a]);
        assert_eq!(
            graph.drain_events(),
            vec![SceneEvent::PropertyChanged {
                entity: probe,
                property: Property::Collisions
            }]
        );
    }

    #[test]
    fn test_default_query_is_empty() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn_group("root");
        let info = SceneInfo::new(None, Vec3::ZERO);

        assert!(graph.collisions_with(root, Vec3::ZERO, &info).is_empty());
    }

    #[test]
    fn test_closure_query() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn_group("root");
        let wall = graph.spawn_entity("wall");
        graph
            .set_collision_query(root, move |p: Vector3, _: &SceneInfo| {
                if p.x > 1.0 { vec![wall] } else { Vec::new() }
            })
            .unwrap();

        let info = SceneInfo::new(None, Vec3::ZERO);
        assert_eq!(graph.collisions_with(root, Vec3::new(2.0, 0.0, 0.0), &info), vec![wall]);
        assert!(graph.collisions_with(root, Vec3::ZERO, &info).is_empty());

        graph.clear_collision_query(root);
        assert!(graph.collisions_with(root, Vec3::new(2.0, 0.0, 0.0), &info).is_empty());
    }

    #[test]
    fn test_box_volumes_query() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn_group("root");
        let a = graph.spawn_entity("a");
        let b = graph.spawn_entity("b");
        let volumes = BoxVolumes::new()
            .with(a, Aabb::from_center(Vec3::ZERO, Vec3::ONE))
            .with(b, Aabb::from_center(Vec3::new(1.5, 0.0, 0.0), Vec3::ONE));
        assert_eq!(volumes.len(), 2);
        graph.set_collision_query(root, volumes).unwrap();

        let info = SceneInfo::new(None, Vec3::ZERO);
        assert_eq!(graph.collisions_with(root, Vec3::new(0.75, 0.0, 0.0), &info), vec![a, b]);
    }
}
