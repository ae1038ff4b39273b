//! View configuration

use std::fs;
use std::path::Path;

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use super::SceneError;

/// Fixed-function state applied once when a view first renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderState {
    /// Depth testing with a less-or-equal comparison
    pub depth_test: bool,
    /// Back-face culling
    pub cull_faces: bool,
    /// Source-alpha blending
    pub blending: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            depth_test: true,
            cull_faces: true,
            blending: true,
        }
    }
}

/// View configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Viewport width in pixels
    pub width: u32,
    /// Viewport height in pixels
    pub height: u32,
    /// Ambient light color handed to materials
    pub ambience: Vec3,
    /// Framebuffer clear color (RGBA)
    pub background: Vec4,
    /// Fixed-function render state
    pub render_state: RenderState,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            ambience: Vec3::ZERO,
            background: Vec4::new(0.0, 0.0, 0.0, 1.0),
            render_state: RenderState::default(),
        }
    }
}

impl ViewConfig {
    /// Set viewport dimensions
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the ambient light color
    #[must_use]
    pub fn with_ambience(mut self, ambience: Vec3) -> Self {
        self.ambience = ambience;
        self
    }

    /// Set the clear color
    #[must_use]
    pub fn with_background(mut self, background: Vec4) -> Self {
        self.background = background;
        self
    }

    /// Set the fixed-function render state
    #[must_use]
    pub fn with_render_state(mut self, render_state: RenderState) -> Self {
        self.render_state = render_state;
        self
    }

    /// Width over height, guarding against a zero height
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Save the configuration to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SceneError::SerializeError(e.to_string()))?;
        fs::write(path, ron_string).map_err(|e| SceneError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Load a configuration from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let content = fs::read_to_string(path).map_err(|e| SceneError::IoError(e.to_string()))?;
        ron::from_str(&content).map_err(|e| SceneError::DeserializeError(e.to_string()))
    }

    /// Save the configuration to a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SceneError::SerializeError(e.to_string()))?;
        fs::write(path, json).map_err(|e| SceneError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Load a configuration from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let content = fs::read_to_string(path).map_err(|e| SceneError::IoError(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| SceneError::DeserializeError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = ViewConfig::default()
            .with_size(1024, 512)
            .with_ambience(Vec3::splat(0.2))
            .with_background(Vec4::new(0.1, 0.1, 0.1, 1.0));

        assert_eq!(config.width, 1024);
        assert!((config.aspect_ratio() - 2.0).abs() < f32::EPSILON);
        assert_eq!(config.ambience, Vec3::splat(0.2));
    }

    #[test]
    fn test_zero_height_aspect() {
        let config = ViewConfig::default().with_size(640, 0);
        assert!((config.aspect_ratio() - 640.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ViewConfig = serde_json::from_str(r#"{ "width": 320 }"#).unwrap();
        assert_eq!(config.width, 320);
        assert_eq!(config.height, 600);
        assert_eq!(config.render_state, RenderState::default());
    }

    #[test]
    fn test_ron_file_roundtrip() {
        let path = std::env::temp_dir().join("trellis_view_config_test.ron");
        let config = ViewConfig::default().with_size(300, 200);

        config.save_ron(&path).unwrap();
        let loaded = ViewConfig::load_ron(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ViewConfig::load_json("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, SceneError::IoError(_)));
    }
}
