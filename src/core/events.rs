//! Scene change notifications
//!
//! Every setter on the scene graph reports what it changed by pushing typed
//! events into a double-buffered queue. The view drains the queue to find
//! out whether a redraw is needed; applications can inspect the same events
//! to react to collisions or property changes.
//!
//! # Example
//!
//! ```ignore
//! graph.set_location(cube, Vec3::new(0.0, 0.0, -5.0))?;
//!
//! // PropertyChanged(Location), MatrixChanged, Invalidate
//! for event in graph.drain_events() {
//!     if let SceneEvent::Invalidate { root, .. } = event {
//!         view.invalidate_scene();
//!     }
//! }
//! ```

use std::collections::VecDeque;

use hecs::Entity;

/// Observable node properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Property {
    Location,
    RotationAxis,
    RotationAngle,
    Scale,
    Visible,
    Name,
    Children,
    /// Light color
    Color,
    /// Light range
    Range,
    Aspect,
    FieldOfView,
    Projection,
    ClipPlanes,
    /// Clone target
    Entity,
    Material,
    Collisions,
    /// Height map or model source
    Source,
}

/// Something that happened to the scene graph.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SceneEvent {
    /// A single property was stored
    PropertyChanged {
        /// Entity (or material) whose property changed
        entity: Entity,
        /// Which property
        property: Property,
    },

    /// The local matrix of an entity was recomputed
    MatrixChanged {
        /// Entity whose matrix changed
        entity: Entity,
    },

    /// Visible state changed somewhere below `root`.
    ///
    /// `root` is the topmost ancestor of `source`, so one change produces
    /// exactly one top-level signal no matter how deep it happened.
    Invalidate {
        /// Topmost ancestor of the changed entity
        root: Entity,
        /// Entity that changed
        source: Entity,
    },
}

/// Double-buffered event queue.
///
/// Events pushed during frame N are available for reading after the next
/// `swap()`. This keeps a traversal from observing its own notifications.
#[derive(Debug)]
pub struct EventQueue {
    /// Written by setters since the last swap
    pending: VecDeque<SceneEvent>,
    /// Visible to readers
    processing: VecDeque<SceneEvent>,
}

impl EventQueue {
    const DEFAULT_CAPACITY: usize = 64;

    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Queue with room for `capacity` events per side before reallocating
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            processing: VecDeque::with_capacity(capacity),
        }
    }

    /// Push an event to be processed after the next swap.
    #[inline]
    pub fn push(&mut self, event: SceneEvent) {
        self.pending.push_back(event);
    }

    /// Publish everything pushed since the last swap.
    ///
    /// Unread events from the previous swap are discarded.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.processing);
        self.pending.clear();
    }

    /// Iterate over events made visible by the last swap.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &SceneEvent> {
        self.processing.iter()
    }

    /// Take ownership of the events made visible by the last swap.
    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = SceneEvent> + '_ {
        self.processing.drain(..)
    }

    /// Nothing published
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processing.is_empty()
    }

    /// Number of events ready for processing.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.processing.len()
    }

    /// Number of events waiting for the next swap.
    #[must_use]
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drop published and unpublished events alike
    pub fn clear(&mut self) {
        self.pending.clear();
        self.processing.clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
