//! The view: one scene, one camera, one render target

use std::time::Instant;

use glam::{Vec3, Vec4};
use hecs::Entity;

use super::FrameHost;
use crate::core::{FrameStats, SceneEvent, ViewConfig};
use crate::math::Matrix4;
use crate::renderer::RenderContext;
use crate::scene::{SceneGraph, SceneInfo};

/// Owns a scene graph and renders it into a [`RenderContext`].
///
/// Changes to the graph turn into at most one pending frame: the first
/// [`invalidate_scene`](Self::invalidate_scene) asks the host for a frame and
/// every further call is absorbed until [`on_frame`](Self::on_frame) runs.
pub struct View<C: RenderContext> {
    ctx: C,
    config: ViewConfig,
    graph: SceneGraph,
    scene: Option<Entity>,
    camera: Option<Entity>,
    render_pending: bool,
    state_applied: bool,
    host: Box<dyn FrameHost>,
    stats: FrameStats,
}

impl<C: RenderContext> View<C> {
    /// Create a view with an empty scene graph
    pub fn new(ctx: C, config: ViewConfig, host: impl FrameHost + 'static) -> Self {
        Self::with_graph(ctx, config, host, SceneGraph::new())
    }

    /// Create a view around an existing scene graph
    pub fn with_graph(ctx: C, config: ViewConfig, host: impl FrameHost + 'static, graph: SceneGraph) -> Self {
        log::info!(
            "Creating view {}x{} (depth test: {}, culling: {})",
            config.width,
            config.height,
            config.render_state.depth_test,
            config.render_state.cull_faces
        );

        Self {
            ctx,
            config,
            graph,
            scene: None,
            camera: None,
            render_pending: false,
            state_applied: false,
            host: Box::new(host),
            stats: FrameStats::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn context(&self) -> &C {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.ctx
    }

    #[must_use]
    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    #[must_use]
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Mutable access to the graph.
    ///
    /// Events raised through this reference wait in the graph until
    /// [`pump_events`](Self::pump_events) runs; prefer [`edit`](Self::edit).
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    #[must_use]
    pub fn scene(&self) -> Option<Entity> {
        self.scene
    }

    #[must_use]
    pub fn camera(&self) -> Option<Entity> {
        self.camera
    }

    #[must_use]
    pub fn ambience(&self) -> Vec3 {
        self.config.ambience
    }

    #[must_use]
    pub fn background(&self) -> Vec4 {
        self.config.background
    }

    /// Whether a frame has been requested and not yet rendered
    #[must_use]
    pub fn render_pending(&self) -> bool {
        self.render_pending
    }

    #[must_use]
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    // -------------------------------------------------------------------------
    // Setters
    // -------------------------------------------------------------------------

    pub fn set_scene(&mut self, scene: Option<Entity>) {
        self.scene = scene;
        self.invalidate_scene();
    }

    /// Choose the camera whose view is rendered.
    ///
    /// The camera does not have to be part of the scene tree.
    pub fn set_camera(&mut self, camera: Option<Entity>) {
        self.camera = camera;
        self.invalidate_scene();
    }

    pub fn set_ambience(&mut self, ambience: Vec3) {
        self.config.ambience = ambience;
        self.invalidate_scene();
    }

    pub fn set_background(&mut self, background: Vec4) {
        self.config.background = background;
        self.invalidate_scene();
    }

    /// Change the viewport size
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == self.config.width && height == self.config.height {
            return;
        }
        log::debug!("Resizing view to {width}x{height}");
        self.config.width = width;
        self.config.height = height;
        self.invalidate_scene();
    }

    // -------------------------------------------------------------------------
    // Scheduling
    // -------------------------------------------------------------------------

    /// Request a frame unless one is already pending
    pub fn invalidate_scene(&mut self) {
        if self.render_pending {
            return;
        }
        self.render_pending = true;
        self.host.request_frame();
    }

    /// Run `f` against the graph, then react to whatever it changed
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut SceneGraph) -> R) -> R {
        let result = f(&mut self.graph);
        self.pump_events();
        result
    }

    /// Drain graph events, invalidating the view for changes inside the
    /// scene or on the camera's parent chain. Returns the drained events.
    pub fn pump_events(&mut self) -> Vec<SceneEvent> {
        let events = self.graph.drain_events();

        let touches_view = events.iter().any(|event| match event {
            SceneEvent::Invalidate { source, .. } => self.touches_view(*source),
            _ => false,
        });
        if touches_view {
            self.invalidate_scene();
        }
        events
    }

    /// Whether a change at `source` can alter what the view draws
    fn touches_view(&self, source: Entity) -> bool {
        let in_scene = self
            .scene
            .is_some_and(|scene| source == scene || self.graph.is_ancestor(scene, source));
        let moves_camera = self
            .camera
            .is_some_and(|camera| source == camera || self.graph.is_ancestor(source, camera));
        in_scene || moves_camera
    }

    /// Whether `camera` is reached by traversing `scene`
    fn in_scene(&self, scene: Entity, camera: Entity) -> bool {
        camera == scene || self.graph.is_ancestor(scene, camera)
    }

    /// Frame callback. Clears the pending flag first so changes made while
    /// rendering schedule the next frame. Returns the number of draw calls.
    pub fn on_frame(&mut self) -> usize {
        self.render_pending = false;
        self.render_scene()
    }

    // -------------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------------

    /// Render one frame: clear, prepare the whole scene, resolve collisions,
    /// then draw. Does nothing without a scene and a camera.
    pub fn render_scene(&mut self) -> usize {
        let (Some(scene), Some(camera)) = (self.scene, self.camera) else {
            log::debug!("Skipping frame: no scene or camera");
            return 0;
        };
        let start = Instant::now();

        if !self.state_applied {
            self.ctx.set_state(&self.config.render_state);
            self.state_applied = true;
        }
        self.ctx.clear(self.config.background);
        self.ctx.viewport(self.config.width, self.config.height);

        let mut info = SceneInfo::new(Some(camera), self.config.ambience);
        self.graph.prepare_scene(&mut self.ctx, scene, &Matrix4::IDENTITY, &mut info);

        // A camera inside the scene that went unresolved is hidden and
        // contributes nothing; one outside the scene is placed by its own chain
        if !info.camera_resolved() && !self.in_scene(scene, camera) {
            match (self.graph.camera(camera), self.graph.world_matrix(camera)) {
                (Ok(c), Ok(world)) => info.view_matrix = c.view_matrix(&world),
                (Err(err), _) | (_, Err(err)) => log::warn!("Active camera unavailable: {err}"),
            }
        }

        self.graph.resolve_collisions(scene, &info);
        let draw_calls = self.graph.render_scene(&mut self.ctx, scene, &Matrix4::IDENTITY, &info);

        self.stats
            .record_frame(start.elapsed(), info.lights.len(), info.colliders.len(), draw_calls);
        log::debug!(
            "Frame {}: {} lights, {} probes, {} draw calls",
            self.stats.frames_rendered(),
            info.lights.len(),
            info.colliders.len(),
            draw_calls
        );
        draw_calls
    }
}
