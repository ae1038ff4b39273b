//! Scene descriptions
//!
//! A serializable tree of nodes that can be saved as RON or JSON and
//! instantiated into a [`SceneGraph`]. Nodes refer to each other and to
//! materials by name.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;
use hecs::Entity;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::SceneError;
use crate::renderer::{HeightField, MaterialId, Model, ModelGeometry, SolidMaterial, TextureMaterial};
use crate::scene::{Camera, Light, NodeKind, Projection, SceneGraph, Transform};

/// Local transform of a described node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformDescription {
    pub location: Vec3,
    pub rotation_axis: Vec3,
    /// Degrees
    pub rotation_angle: f32,
    pub scale: Vec3,
}

impl Default for TransformDescription {
    fn default() -> Self {
        Self {
            location: Vec3::ZERO,
            rotation_axis: Vec3::Y,
            rotation_angle: 0.0,
            scale: Vec3::ONE,
        }
    }
}

impl TransformDescription {
    #[must_use]
    pub fn at(location: Vec3) -> Self {
        Self {
            location,
            ..Self::default()
        }
    }
}

/// Kind of a described node plus its kind-specific settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum KindDescription {
    #[default]
    Entity,
    Group,
    Camera {
        #[serde(default)]
        projection: Projection,
        field_of_view: f32,
        aspect: f32,
    },
    Light {
        color: Vec3,
        range: f32,
    },
    Collider,
    /// Instances the node named `target`
    Clone {
        target: String,
    },
    Cube,
    Sphere,
    HeightField {
        columns: u32,
        rows: u32,
        #[serde(default)]
        source: Option<PathBuf>,
    },
    Model {
        source: PathBuf,
        #[serde(default)]
        clockwise: bool,
        #[serde(default)]
        auto_normals: bool,
    },
}

/// Named material shared by described meshes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MaterialDescription {
    Solid { color: Vec3, shininess: f32 },
    Texture { source: PathBuf },
}

/// One node and its subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeDescription {
    pub name: String,
    pub transform: TransformDescription,
    pub visible: bool,
    pub kind: KindDescription,
    /// Material name, for meshes
    pub material: Option<String>,
    pub children: Vec<NodeDescription>,
}

impl Default for NodeDescription {
    fn default() -> Self {
        Self {
            name: String::new(),
            transform: TransformDescription::default(),
            visible: true,
            kind: KindDescription::Entity,
            material: None,
            children: Vec::new(),
        }
    }
}

impl NodeDescription {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: KindDescription) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_transform(mut self, transform: TransformDescription) -> Self {
        self.transform = transform;
        self
    }

    #[must_use]
    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: NodeDescription) -> Self {
        self.children.push(child);
        self
    }

    fn count(&self) -> usize {
        1 + self.children.iter().map(Self::count).sum::<usize>()
    }
}

/// A complete, serializable scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    pub name: String,
    /// Format version for compatibility
    pub version: u32,
    #[serde(default)]
    pub materials: BTreeMap<String, MaterialDescription>,
    pub root: NodeDescription,
    /// Name of the camera to render through
    #[serde(default)]
    pub active_camera: Option<String>,
}

/// Entities created by [`SceneDescription::instantiate`]
#[derive(Debug, Clone)]
pub struct SceneHandles {
    pub root: Entity,
    pub active_camera: Option<Entity>,
    pub named: FxHashMap<String, Entity>,
    pub materials: FxHashMap<String, MaterialId>,
}

impl SceneHandles {
    /// Entity created for the node called `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Entity> {
        self.named.get(name).copied()
    }
}

impl SceneDescription {
    #[must_use]
    pub fn new(name: impl Into<String>, root: NodeDescription) -> Self {
        Self {
            name: name.into(),
            version: 1,
            materials: BTreeMap::new(),
            root,
            active_camera: None,
        }
    }

    #[must_use]
    pub fn with_material(mut self, name: impl Into<String>, material: MaterialDescription) -> Self {
        self.materials.insert(name.into(), material);
        self
    }

    #[must_use]
    pub fn with_active_camera(mut self, name: impl Into<String>) -> Self {
        self.active_camera = Some(name.into());
        self
    }

    /// Number of described nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.root.count()
    }

    /// Save the scene to a RON file
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

    /// Load a scene from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let content = fs::read_to_string(path).map_err(|e| SceneError::IoError(e.to_string()))?;
        ron::from_str(&content).map_err(|e| SceneError::DeserializeError(e.to_string()))
    }

    /// Save the scene to a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let json_string = serde_json::to_string_pretty(self)
            .map_err(|e| SceneError::SerializeError(e.to_string()))?;
        fs::write(path, json_string).map_err(|e| SceneError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Load a scene from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let content = fs::read_to_string(path).map_err(|e| SceneError::IoError(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| SceneError::DeserializeError(e.to_string()))
    }

    /// Spawn the described scene into `graph`.
    ///
    /// Clone targets that name no node are logged and left empty. On error
    /// every node and material spawned so far is removed again.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownReference`] if a mesh names a material
    /// that is not described, or the active camera names no camera node
    pub fn instantiate(&self, graph: &mut SceneGraph) -> Result<SceneHandles, SceneError> {
        let mut materials = FxHashMap::default();
        for (name, description) in &self.materials {
            let id = match description {
                MaterialDescription::Solid { color, shininess } => {
                    graph.add_material(SolidMaterial::new(*color).with_shininess(*shininess))
                }
                MaterialDescription::Texture { source } => graph.add_material(TextureMaterial::from_path(source)),
            };
            materials.insert(name.clone(), id);
        }

        let mut spawned = Vec::new();
        match self.build(graph, &materials, &mut spawned) {
            Ok((root, active_camera, named)) => {
                log::debug!("Instantiated scene '{}' with {} nodes", self.name, self.node_count());
                Ok(SceneHandles {
                    root,
                    active_camera,
                    named,
                    materials,
                })
            }
            Err(e) => {
                log::warn!("Failed to instantiate scene '{}': {}", self.name, e);
                for entity in spawned {
                    if graph.contains(entity) {
                        let _ = graph.despawn(entity);
                    }
                }
                for &id in materials.values() {
                    let _ = graph.remove_material(id);
                }
                Err(e)
            }
        }
    }

    fn build(
        &self,
        graph: &mut SceneGraph,
        materials: &FxHashMap<String, MaterialId>,
        spawned: &mut Vec<Entity>,
    ) -> Result<(Entity, Option<Entity>, FxHashMap<String, Entity>), SceneError> {
        let mut builder = Builder {
            graph,
            materials,
            spawned,
            named: FxHashMap::default(),
            clones: Vec::new(),
        };
        let root = builder.spawn(&self.root)?;
        let Builder { graph, named, clones, .. } = builder;

        for (clone, target) in clones {
            match named.get(&target) {
                Some(&entity) => graph.set_clone_target(clone, entity)?,
                None => log::warn!("Clone target '{target}' does not name a node"),
            }
        }

        let active_camera = match &self.active_camera {
            Some(name) => {
                let camera = named
                    .get(name)
                    .copied()
                    .filter(|&e| graph.kind(e).ok() == Some(NodeKind::Camera))
                    .ok_or_else(|| SceneError::UnknownReference(name.clone()))?;
                Some(camera)
            }
            None => None,
        };
        Ok((root, active_camera, named))
    }
}

struct Builder<'a> {
    graph: &'a mut SceneGraph,
    materials: &'a FxHashMap<String, MaterialId>,
    spawned: &'a mut Vec<Entity>,
    named: FxHashMap<String, Entity>,
    clones: Vec<(Entity, String)>,
}

impl Builder<'_> {
    fn spawn(&mut self, node: &NodeDescription) -> Result<Entity, SceneError> {
        let graph = &mut *self.graph;
        let name = node.name.clone();
        let entity = match &node.kind {
            KindDescription::Entity => graph.spawn_entity(name),
            KindDescription::Group => graph.spawn_group(name),
            KindDescription::Camera {
                projection,
                field_of_view,
                aspect,
            } => {
                let mut camera = Camera::perspective(*field_of_view, *aspect);
                camera.projection = *projection;
                graph.spawn_camera(name, camera)
            }
            KindDescription::Light { color, range } => graph.spawn_light(name, Light::new(*color, *range)),
            KindDescription::Collider => graph.spawn_collider(name),
            KindDescription::Clone { target } => {
                let clone = graph.spawn_clone(name, None);
                self.clones.push((clone, target.clone()));
                clone
            }
            KindDescription::Cube => graph.spawn_cube(name),
            KindDescription::Sphere => graph.spawn_sphere(name),
            KindDescription::HeightField { columns, rows, .. } => {
                graph.spawn_height_field(name, HeightField::new(*columns, *rows))
            }
            KindDescription::Model {
                clockwise,
                auto_normals,
                ..
            } => {
                let model = Model::new(ModelGeometry::default())
                    .with_clockwise(*clockwise)
                    .with_auto_normals(*auto_normals);
                graph.spawn_model(name, model)
            }
        };
        self.spawned.push(entity);

        match &node.kind {
            KindDescription::HeightField {
                source: Some(source), ..
            } => graph.set_height_source(entity, source)?,
            KindDescription::Model { source, .. } => graph.load_model(entity, source)?,
            _ => {}
        }

        {
            let mut state = graph.node_mut(entity)?;
            let t = node.transform;
            state.transform = Transform::from_parts(t.location, t.rotation_axis, t.rotation_angle, t.scale);
            state.visible = node.visible;
        }

        if let Some(material) = &node.material {
            let id = self
                .materials
                .get(material)
                .copied()
                .ok_or_else(|| SceneError::UnknownReference(material.clone()))?;
            graph.set_material(entity, id)?;
        }

        if self.named.insert(node.name.clone(), entity).is_some() {
            log::warn!("Node name '{}' is used more than once; keeping the last", node.name);
        }

        for child in &node.children {
            let child = self.spawn(child)?;
            self.graph.node_mut(entity)?.add_child(child);
            self.graph.node_mut(child)?.parent = Some(entity);
        }
        Ok(entity)
    }
}
