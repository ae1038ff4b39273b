//! Two-phase scene traversal
//!
//! `prepare_scene` walks the visible tree once to run deferred jobs and to
//! gather the camera, lights and collider probes into a [`SceneInfo`].
//! `render_scene` walks it again and draws, reading that finished info. The
//! graph is only borrowed immutably in both phases; components are reached
//! through hecs' runtime borrow checks one at a time, never across a
//! recursive call.

use hecs::Entity;
use smallvec::SmallVec;

use super::{CloneTarget, Collider, ColliderProbe, Deferred, Light, LightRecord, NodeKind, SceneGraph, SceneInfo};
use crate::math::{Matrix4, m4};
use crate::renderer::{MaterialSlot, Mesh, RenderContext, RenderError};

/// Entities from the traversal root down to the node being visited
type Path = SmallVec<[Entity; 16]>;

/// What the phases need from a node, copied out so no borrow outlives it
struct Visit {
    kind: NodeKind,
    world: Matrix4,
    children: SmallVec<[Entity; 8]>,
}

impl SceneGraph {
    fn visit(&self, entity: Entity, parent: &Matrix4, path: &Path) -> Option<Visit> {
        if path.len() > super::MAX_DEPTH {
            log::warn!("Traversal deeper than {} nodes at {entity:?}, skipping", super::MAX_DEPTH);
            return None;
        }
        let node = match self.node(entity) {
            Ok(node) => node,
            Err(err) => {
                log::warn!("Skipping node during traversal: {err}");
                return None;
            }
        };
        if !node.visible {
            return None;
        }
        Some(Visit {
            kind: node.kind,
            world: m4::multiply(parent, &node.transform.matrix()),
            children: node.children.clone(),
        })
    }

    /// Run the prepare phase on the subtree at `entity`
    pub fn prepare_scene(
        &self,
        ctx: &mut dyn RenderContext,
        entity: Entity,
        parent: &Matrix4,
        info: &mut SceneInfo,
    ) {
        self.prepare_node(ctx, entity, parent, info, &mut Path::new());
    }

    fn prepare_node(
        &self,
        ctx: &mut dyn RenderContext,
        entity: Entity,
        parent: &Matrix4,
        info: &mut SceneInfo,
        path: &mut Path,
    ) {
        let Some(visit) = self.visit(entity, parent, path) else {
            return;
        };
        self.flush(ctx, entity);
        path.push(entity);

        match visit.kind {
            NodeKind::Group => {
                for child in visit.children {
                    self.prepare_node(ctx, child, &visit.world, info, path);
                }
            }
            NodeKind::Camera => {
                if info.active_camera == Some(entity) {
                    if let Ok(camera) = self.camera(entity) {
                        info.view_matrix = camera.view_matrix(&visit.world);
                        info.camera_resolved = true;
                    }
                }
            }
            NodeKind::Light => {
                if let Ok(light) = self.component::<Light>(entity) {
                    info.lights.push(LightRecord {
                        position: m4::origin_of(&visit.world),
                        color: light.color,
                        range: light.range,
                    });
                }
            }
            NodeKind::Collider => {
                if self.component::<Collider>(entity).is_ok() {
                    info.colliders.push(ColliderProbe {
                        world_point: m4::origin_of(&visit.world),
                        target: entity,
                    });
                }
            }
            NodeKind::Clone => {
                if let Some(target) = self.clone_target_of(entity, path) {
                    self.prepare_node(ctx, target, &visit.world, info, path);
                }
            }
            NodeKind::Entity | NodeKind::Mesh => {}
        }
        path.pop();
    }

    /// Run the render phase on the subtree at `entity`.
    ///
    /// Returns the number of draw calls issued.
    pub fn render_scene(
        &self,
        ctx: &mut dyn RenderContext,
        entity: Entity,
        parent: &Matrix4,
        info: &SceneInfo,
    ) -> usize {
        self.render_node(ctx, entity, parent, info, &mut Path::new())
    }

    fn render_node(
        &self,
        ctx: &mut dyn RenderContext,
        entity: Entity,
        parent: &Matrix4,
        info: &SceneInfo,
        path: &mut Path,
    ) -> usize {
        let Some(visit) = self.visit(entity, parent, path) else {
            return 0;
        };

        path.push(entity);
        let draws = match visit.kind {
            NodeKind::Group => visit
                .children
                .iter()
                .map(|&child| self.render_node(ctx, child, &visit.world, info, path))
                .sum(),
            NodeKind::Clone => self
                .clone_target_of(entity, path)
                .map_or(0, |target| self.render_node(ctx, target, &visit.world, info, path)),
            NodeKind::Mesh => self.render_mesh(ctx, entity, &visit.world, info),
            NodeKind::Entity | NodeKind::Camera | NodeKind::Light | NodeKind::Collider => 0,
        };
        path.pop();
        draws
    }

    /// Target of a clone, unless it is already being traversed above the
    /// clone. Following such a target would never terminate.
    fn clone_target_of(&self, entity: Entity, path: &Path) -> Option<Entity> {
        let target = self.component::<CloneTarget>(entity).ok()?.entity?;
        if path.contains(&target) {
            log::warn!(
                "Clone {} instances its own ancestor {}, skipping",
                self.describe(entity),
                self.describe(target)
            );
            return None;
        }
        Some(target)
    }

    fn render_mesh(&self, ctx: &mut dyn RenderContext, entity: Entity, world: &Matrix4, info: &SceneInfo) -> usize {
        self.flush(ctx, entity);

        let (ranges, mesh_info) = {
            let Ok(mesh) = self.component::<Mesh>(entity) else {
                return 0;
            };
            let Some(mesh_info) = mesh.info else {
                log::error!("{}", RenderError::MissingGeometry(self.describe(entity)));
                return 0;
            };
            if mesh_info.vertex_count == 0 {
                return 0;
            }
            if mesh.material.is_none() && !matches!(mesh.shape, crate::renderer::Shape::Model(_)) {
                log::error!("Mesh {} has no material", self.describe(entity));
                return 0;
            }
            (mesh.draw_ranges(&mesh_info), mesh_info)
        };

        let mut draws = 0;
        for range in ranges {
            let Some(id) = range.material else {
                continue;
            };
            let bound = match self.component_mut::<MaterialSlot>(id.entity()) {
                Ok(mut slot) => slot.0.bind(ctx, world, info, &mesh_info),
                Err(_) => {
                    log::error!("Mesh {} uses a removed material", self.describe(entity));
                    continue;
                }
            };
            match bound {
                Ok(()) => {
                    ctx.draw_arrays(range.first, range.count);
                    draws += 1;
                }
                Err(err) => log::error!("Cannot bind material of {}: {err}", self.describe(entity)),
            }
        }
        draws
    }

    /// Run every job queued on `entity`, oldest first
    pub fn flush(&self, ctx: &mut dyn RenderContext, entity: Entity) {
        let jobs = match self.node_mut(entity) {
            Ok(mut node) if !node.queue.is_empty() => node.queue.take(),
            _ => return,
        };

        for job in jobs {
            match job {
                Deferred::BuildGeometry => {
                    if let Ok(mut mesh) = self.component_mut::<Mesh>(entity) {
                        mesh.build(ctx);
                    }
                }
                Deferred::InitMaterial(id) => {
                    if let Ok(mut slot) = self.component_mut::<MaterialSlot>(id.entity()) {
                        if let Err(err) = slot.0.init_gl(ctx) {
                            log::error!("Failed to initialize material: {err}");
                        }
                    }
                }
                Deferred::ApplyMaterial(id) => {
                    let Some(mesh_info) = self.component::<Mesh>(entity).ok().and_then(|m| m.info) else {
                        log::debug!("No geometry on {entity:?} yet, skipping material apply");
                        continue;
                    };
                    if let Ok(mut slot) = self.component_mut::<MaterialSlot>(id.entity()) {
                        slot.0.apply(ctx, &mesh_info);
                    }
                }
                Deferred::Custom(f) => f(ctx),
            }
        }
    }

    fn describe(&self, entity: Entity) -> String {
        match self.node(entity) {
            Ok(node) => format!("'{}' ({entity:?})", node.name),
            Err(_) => format!("{entity:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use glam::Vec3;

    use super::*;
    use crate::renderer::{Command, RecordingContext, SolidMaterial};
    use crate::scene::Camera;

    fn prepare(graph: &SceneGraph, ctx: &mut RecordingContext, root: Entity, camera: Option<Entity>) -> SceneInfo {
        let mut info = SceneInfo::new(camera, Vec3::ZERO);
        graph.prepare_scene(ctx, root, &Matrix4::IDENTITY, &mut info);
        info
    }

    #[test]
    fn test_jobs_run_once_in_order() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn_group("root");
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        for i in 0..3 {
            let log = Arc::clone(&log);
            graph
                .schedule_fn(root, move |_| log.lock().unwrap().push(i))
                .unwrap();
        }

        let mut ctx = RecordingContext::new();
        prepare(&graph, &mut ctx, root, None);
        prepare(&graph, &mut ctx, root, None);

        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(graph.node(root).unwrap().pending_jobs(), 0);
    }

    #[test]
    fn test_only_groups_recurse() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn_group("root");
        let plain = graph.spawn_entity("plain");
        let light = graph.spawn_light("light", Light::default());
        graph.add_child(root, plain).unwrap();
        graph.add_child(plain, light).unwrap();

        let mut ctx = RecordingContext::new();
        let info = prepare(&graph, &mut ctx, root, None);
        assert!(info.lights.is_empty());
    }

    #[test]
    fn test_invisible_group_hides_subtree() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn_group("root");
        let group = graph.spawn_group("group");
        let light = graph.spawn_light("light", Light::default());
        let probe = graph.spawn_collider("probe");
        graph.add_child(root, group).unwrap();
        graph.add_child(group, light).unwrap();
        graph.add_child(group, probe).unwrap();

        let mut ctx = RecordingContext::new();
        assert_eq!(prepare(&graph, &mut ctx, root, None).lights.len(), 1);

        graph.set_visible(group, false).unwrap();
        let info = prepare(&graph, &mut ctx, root, None);
        assert!(info.lights.is_empty());
        assert!(info.colliders.is_empty());
    }

    #[test]
    fn test_only_active_camera_sets_view() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn_group("root");
        let a = graph.spawn_camera("a", Camera::perspective(90.0, 2.0));
        let b = graph.spawn_camera("b", Camera::default());
        graph.add_child(root, a).unwrap();
        graph.add_child(root, b).unwrap();
        graph.set_location(b, Vec3::new(0.0, 0.0, 3.0)).unwrap();

        let mut ctx = RecordingContext::new();
        let info = prepare(&graph, &mut ctx, root, Some(b));

        assert!(info.camera_resolved());
        let expected = m4::multiply(
            &m4::perspective(45.0, 1.0, 1.0, 100.0),
            &m4::inverse(&m4::translation(Vec3::new(0.0, 0.0, 3.0))),
        );
        assert!(info.view_matrix.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_clone_instances_target_under_its_matrix() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn_group("root");
        let light = graph.spawn_light("lamp", Light::default());
        graph.add_child(root, light).unwrap();
        let clone = graph.spawn_clone("copy", Some(light));
        graph.add_child(root, clone).unwrap();
        graph.set_location(clone, Vec3::new(5.0, 0.0, 0.0)).unwrap();

        let mut ctx = RecordingContext::new();
        let info = prepare(&graph, &mut ctx, root, None);

        let positions: Vec<Vec3> = info.lights.iter().map(|l| l.position).collect();
        assert_eq!(positions, vec![Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0)]);
    }

    #[test]
    fn test_clone_of_ancestor_is_skipped() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn_group("root");
        let light = graph.spawn_light("lamp", Light::default());
        graph.add_child(root, light).unwrap();
        for name in ["left", "right"] {
            let clone = graph.spawn_clone(name, None);
            graph.add_child(root, clone).unwrap();
            graph.set_clone_target(clone, root).unwrap();
        }

        let mut ctx = RecordingContext::new();
        let info = prepare(&graph, &mut ctx, root, None);
        assert_eq!(info.lights.len(), 1);
        assert_eq!(graph.render_scene(&mut ctx, root, &Matrix4::IDENTITY, &info), 0);
    }

    #[test]
    fn test_sibling_clone_of_clone_still_draws() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn_group("root");
        let light = graph.spawn_light("lamp", Light::default());
        let first = graph.spawn_clone("first", Some(light));
        let second = graph.spawn_clone("second", Some(first));
        for child in [light, first, second] {
            graph.add_child(root, child).unwrap();
        }

        let mut ctx = RecordingContext::new();
        assert_eq!(prepare(&graph, &mut ctx, root, None).lights.len(), 3);
    }

    #[test]
    fn test_mesh_without_material_is_skipped() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn_group("root");
        let bare = graph.spawn_cube("bare");
        let painted = graph.spawn_cube("painted");
        let material = graph.add_material(SolidMaterial::default());
        graph.set_material(painted, material).unwrap();
        graph.add_child(root, bare).unwrap();
        graph.add_child(root, painted).unwrap();

        let mut ctx = RecordingContext::new();
        let info = prepare(&graph, &mut ctx, root, None);
        let draws = graph.render_scene(&mut ctx, root, &Matrix4::IDENTITY, &info);

        assert_eq!(draws, 1);
        assert_eq!(ctx.draw_calls(), 1);
        assert!(ctx.commands().contains(&Command::DrawArrays { first: 0, count: 36 }));
    }

    #[test]
    fn test_apply_runs_after_geometry() {
        #[derive(Debug, Clone, Default)]
        struct Counting(Arc<AtomicUsize>);

        impl crate::renderer::Material for Counting {
            fn init_gl(&mut self, _ctx: &mut dyn RenderContext) -> Result<(), RenderError> {
                Ok(())
            }
            fn apply(&mut self, _ctx: &mut dyn RenderContext, info: &crate::renderer::MeshInfo) {
                assert_eq!(info.vertex_count, 36);
                self.0.fetch_add(1, Ordering::SeqCst);
            }
            fn bind(
                &mut self,
                _ctx: &mut dyn RenderContext,
                _world: &Matrix4,
                _scene: &SceneInfo,
                _info: &crate::renderer::MeshInfo,
            ) -> Result<(), RenderError> {
                Ok(())
            }
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
                self
            }
        }

        let applied = Arc::new(AtomicUsize::new(0));
        let mut graph = SceneGraph::new();
        let cube = graph.spawn_cube("cube");
        let material = graph.add_material(Counting(Arc::clone(&applied)));
        graph.set_material(cube, material).unwrap();

        let mut ctx = RecordingContext::new();
        let info = prepare(&graph, &mut ctx, cube, None);
        assert_eq!(applied.load(Ordering::SeqCst), 1);
        assert_eq!(graph.render_scene(&mut ctx, cube, &Matrix4::IDENTITY, &info), 1);
    }
}
