//! Node component and deferred initialization queue

use hecs::Entity;
use smallvec::SmallVec;

use super::Transform;
use crate::renderer::{MaterialId, RenderContext};

/// What a node does during traversal.
///
/// Only groups forward the two phases to their children; every other kind
/// owns its children for lifetime purposes but does not draw them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Plain spatial node, no traversal behavior
    Entity,
    Group,
    Camera,
    Light,
    Collider,
    Clone,
    Mesh,
}

/// A context-dependent job queued on a node.
///
/// Jobs run in the order they were scheduled, exactly once, the next time
/// the node is prepared or rendered with a context available.
pub enum Deferred {
    /// Upload the node's mesh geometry
    BuildGeometry,
    /// Link the material's program
    InitMaterial(MaterialId),
    /// Let the material do its CPU-side work against the node's geometry
    ApplyMaterial(MaterialId),
    /// Anything else
    Custom(Box<dyn FnOnce(&mut dyn RenderContext) + Send + Sync>),
}

impl std::fmt::Debug for Deferred {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BuildGeometry => f.write_str("BuildGeometry"),
            Self::InitMaterial(id) => f.debug_tuple("InitMaterial").field(id).finish(),
            Self::ApplyMaterial(id) => f.debug_tuple("ApplyMaterial").field(id).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Ordered list of [`Deferred`] jobs
#[derive(Debug, Default)]
pub struct ScheduleQueue(Vec<Deferred>);

impl ScheduleQueue {
    /// Append a job
    pub fn push(&mut self, job: Deferred) {
        self.0.push(job);
    }

    /// Take every queued job, leaving the queue empty
    pub fn take(&mut self) -> Vec<Deferred> {
        std::mem::take(&mut self.0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// State every scene node carries
#[derive(Debug)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) transform: Transform,
    pub(crate) visible: bool,
    pub(crate) parent: Option<Entity>,
    pub(crate) children: SmallVec<[Entity; 8]>,
    pub(crate) queue: ScheduleQueue,
}

impl Node {
    /// Create a visible node at the origin
    #[must_use]
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            transform: Transform::new(),
            visible: true,
            parent: None,
            children: SmallVec::new(),
            queue: ScheduleQueue::default(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[must_use]
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[must_use]
    pub fn parent(&self) -> Option<Entity> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[Entity] {
        &self.children
    }

    /// Number of jobs waiting for the next prepare
    #[must_use]
    pub fn pending_jobs(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn add_child(&mut self, child: Entity) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    pub(crate) fn remove_child(&mut self, child: Entity) -> bool {
        if let Some(pos) = self.children.iter().position(|&e| e == child) {
            self.children.remove(pos);
            true
        } else {
            false
        }
    }
}
