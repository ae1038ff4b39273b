//! Light nodes

use glam::Vec3;
use hecs::Entity;

use super::{NodeKind, SceneGraph};
use crate::core::{Property, SceneError};

/// Point light. Contributes one record per frame while visible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub(crate) color: Vec3,
    /// Distance until full fall-off
    pub(crate) range: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            range: 100.0,
        }
    }
}

/// Shortest range a light keeps; fall-off divides by it
pub const MIN_LIGHT_RANGE: f32 = 1e-3;

fn clamp_range(range: f32) -> f32 {
    if range >= MIN_LIGHT_RANGE {
        return range;
    }
    log::warn!("Light range {range} is not positive, using {MIN_LIGHT_RANGE}");
    MIN_LIGHT_RANGE
}

impl Light {
    /// Ranges below [`MIN_LIGHT_RANGE`] (and NaN) are clamped up to it
    #[must_use]
    pub fn new(color: Vec3, range: f32) -> Self {
        Self {
            color,
            range: clamp_range(range),
        }
    }

    #[must_use]
    pub fn color(&self) -> Vec3 {
        self.color
    }

    #[must_use]
    pub fn range(&self) -> f32 {
        self.range
    }
}

impl SceneGraph {
    /// Spawn a light node
    pub fn spawn_light(&mut self, name: impl Into<String>, light: Light) -> Entity {
        self.spawn_node_with(name, NodeKind::Light, light)
    }

    /// # Errors
    ///
    /// Returns an error if the entity is not a light
    pub fn light(&self, entity: Entity) -> Result<Light, SceneError> {
        Ok(*self.component::<Light>(entity)?)
    }

    /// # Errors
    ///
    /// Returns an error if the entity is not a light
    pub fn set_light_color(&mut self, entity: Entity, color: Vec3) -> Result<(), SceneError> {
        self.component_mut::<Light>(entity)?.color = color;
        self.notify(entity, Property::Color);
        self.invalidate(entity);
        Ok(())
    }

    /// Set the fall-off distance, clamped like [`Light::new`]
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not a light
    pub fn set_light_range(&mut self, entity: Entity, range: f32) -> Result<(), SceneError> {
        self.component_mut::<Light>(entity)?.range = clamp_range(range);
        self.notify(entity, Property::Range);
        self.invalidate(entity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SceneEvent;

    #[test]
    fn test_default_light_is_white() {
        let light = Light::default();
        assert_eq!(light.color(), Vec3::ONE);
        assert_eq!(light.range(), 100.0);
    }

    #[test]
    fn test_color_setter() {
        let mut graph = SceneGraph::new();
        let light = graph.spawn_light("sun", Light::default());

        graph.set_light_color(light, Vec3::new(1.0, 0.5, 0.0)).unwrap();
        graph.set_light_range(light, 50.0).unwrap();

        assert_eq!(graph.light(light).unwrap(), Light::new(Vec3::new(1.0, 0.5, 0.0), 50.0));
        assert_eq!(
            graph.drain_events()[0],
            SceneEvent::PropertyChanged {
                entity: light,
                property: Property::Color
            }
        );
    }

    #[test]
    fn test_range_stays_positive() {
        assert_eq!(Light::new(Vec3::ONE, 0.0).range(), MIN_LIGHT_RANGE);
        assert_eq!(Light::new(Vec3::ONE, -5.0).range(), MIN_LIGHT_RANGE);
        assert_eq!(Light::new(Vec3::ONE, f32::NAN).range(), MIN_LIGHT_RANGE);
        assert_eq!(Light::new(Vec3::ONE, 0.5).range(), 0.5);

        let mut graph = SceneGraph::new();
        let light = graph.spawn_light("sun", Light::default());
        graph.set_light_range(light, -1.0).unwrap();
        assert_eq!(graph.light(light).unwrap().range(), MIN_LIGHT_RANGE);
    }
}
