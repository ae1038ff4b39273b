//! Face-indexed models with per-range materials
//!
//! Geometry comes from RON or JSON files holding a [`ModelGeometry`], or is
//! imported from glTF. Every material range names a material; the model keeps
//! a name-to-material library and creates a plain white material for names
//! it has not seen.

use std::fs;
use std::path::{Path, PathBuf};

use glam::{Vec2, Vec3};
use hecs::Entity;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::{Geometry, Mesh, Shape};
use crate::core::{Property, SceneError};
use crate::math::geometry::{surface_normal, surface_tangent};
use crate::renderer::{MaterialId, SolidMaterial, TextureMaterial};
use crate::scene::{Deferred, SceneGraph};

/// One corner of a face, as indices into the model's attribute lists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceVertex {
    pub position: usize,
    #[serde(default)]
    pub tex_coord: Option<usize>,
    #[serde(default)]
    pub normal: Option<usize>,
}

impl FaceVertex {
    #[must_use]
    pub fn new(position: usize) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}

/// Faces `first_face..=last_face` are drawn with the material called `name`.
///
/// A range without `last_face` is still open and draws nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialRange {
    pub name: String,
    pub first_face: usize,
    #[serde(default)]
    pub last_face: Option<usize>,
}

impl MaterialRange {
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.last_face
            .map_or(0, |last| last.saturating_sub(self.first_face) + 1)
    }
}

/// Material properties applied by name to a model's library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialSpec {
    pub name: String,
    pub diffuse: Vec3,
    pub shininess: f32,
    /// Image replacing the diffuse color
    pub diffuse_map: Option<PathBuf>,
}

impl Default for MaterialSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse: Vec3::ONE,
            shininess: 1.0,
            diffuse_map: None,
        }
    }
}

/// Indexed model data as stored on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelGeometry {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tex_coords: Vec<Vec2>,
    pub faces: Vec<[FaceVertex; 3]>,
    pub ranges: Vec<MaterialRange>,
    pub materials: Vec<MaterialSpec>,
}

impl ModelGeometry {
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Load geometry, picking the format from the file extension
    /// (`ron`, `json`, `gltf` or `glb`).
    ///
    /// Relative image paths in the material specs are resolved against the
    /// file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the format is unknown, the file cannot be read
    /// or parsed, or an index points outside its attribute list
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let mut geometry = match extension.as_str() {
            "ron" => Self::load_ron(path)?,
            "json" => Self::load_json(path)?,
            "gltf" | "glb" => Self::from_gltf(path)?,
            _ => {
                return Err(SceneError::ImportError(format!(
                    "Unsupported model format: {}",
                    path.display()
                )));
            }
        };

        if let Some(dir) = path.parent() {
            for spec in &mut geometry.materials {
                if let Some(map) = spec.diffuse_map.as_mut().filter(|m| m.is_relative()) {
                    *map = dir.join(&*map);
                }
            }
        }
        geometry.validate()?;
        Ok(geometry)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let content = fs::read_to_string(path).map_err(|e| SceneError::IoError(e.to_string()))?;
        ron::from_str(&content).map_err(|e| SceneError::DeserializeError(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let content = fs::read_to_string(path).map_err(|e| SceneError::IoError(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| SceneError::DeserializeError(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SceneError::SerializeError(e.to_string()))?;
        fs::write(path, ron_string).map_err(|e| SceneError::IoError(e.to_string()))
    }

    /// Import the triangle primitives of a glTF file.
    ///
    /// Each primitive becomes one material range named after its material.
    /// Base color and roughness become a [`MaterialSpec`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be imported
    pub fn from_gltf(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let (document, buffers, _) =
            gltf::import(path.as_ref()).map_err(|e| SceneError::ImportError(e.to_string()))?;

        let mut geometry = Self::default();
        for mesh in document.meshes() {
            for primitive in mesh.primitives() {
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    log::warn!(
                        "Skipping {:?} primitive of mesh {}",
                        primitive.mode(),
                        mesh.name().unwrap_or("<unnamed>")
                    );
                    continue;
                }

                let reader =
                    primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
                let Some(positions) = reader.read_positions() else {
                    continue;
                };

                let base = geometry.positions.len();
                geometry.positions.extend(positions.map(Vec3::from));
                let count = geometry.positions.len() - base;

                let normals = reader.read_normals();
                let has_normals = normals.is_some();
                geometry.normals.extend(normals.into_iter().flatten().map(Vec3::from));
                geometry.normals.resize(base + count, Vec3::ZERO);

                let tex_coords = reader.read_tex_coords(0).map(|t| t.into_f32());
                let has_tex_coords = tex_coords.is_some();
                geometry.tex_coords.extend(tex_coords.into_iter().flatten().map(Vec2::from));
                geometry.tex_coords.resize(base + count, Vec2::ZERO);

                let indices: Vec<usize> = match reader.read_indices() {
                    Some(indices) => indices.into_u32().map(|i| base + i as usize).collect(),
                    None => (base..base + count).collect(),
                };

                let first_face = geometry.faces.len();
                for tri in indices.chunks_exact(3) {
                    geometry.faces.push([tri[0], tri[1], tri[2]].map(|i| FaceVertex {
                        position: i,
                        tex_coord: has_tex_coords.then_some(i),
                        normal: has_normals.then_some(i),
                    }));
                }
                if geometry.faces.len() == first_face {
                    continue;
                }

                let material = primitive.material();
                let name = material.name().unwrap_or("default").to_string();
                if !geometry.materials.iter().any(|spec| spec.name == name) {
                    let pbr = material.pbr_metallic_roughness();
                    let [r, g, b, _] = pbr.base_color_factor();
                    let diffuse_map =
                        pbr.base_color_texture()
                            .and_then(|info| match info.texture().source().source() {
                                gltf::image::Source::Uri { uri, .. } => Some(PathBuf::from(uri)),
                                gltf::image::Source::View { .. } => None,
                            });
                    geometry.materials.push(MaterialSpec {
                        name: name.clone(),
                        diffuse: Vec3::new(r, g, b),
                        shininess: (1.0 - pbr.roughness_factor()).max(0.0) * 128.0,
                        diffuse_map,
                    });
                }
                geometry.ranges.push(MaterialRange {
                    name,
                    first_face,
                    last_face: Some(geometry.faces.len() - 1),
                });
            }
        }

        log::debug!(
            "Imported {} faces in {} ranges from {}",
            geometry.faces.len(),
            geometry.ranges.len(),
            path.as_ref().display()
        );
        Ok(geometry)
    }

    /// Check every index against its attribute list
    ///
    /// # Errors
    ///
    /// Returns an error naming the first index out of range
    pub fn validate(&self) -> Result<(), SceneError> {
        let out_of_range = |what: &str, face: usize, index: usize, len: usize| {
            SceneError::ImportError(format!("face {face}: {what} index {index} out of range ({len})"))
        };

        for (i, face) in self.faces.iter().enumerate() {
            for v in face {
                if v.position >= self.positions.len() {
                    return Err(out_of_range("position", i, v.position, self.positions.len()));
                }
                if let Some(t) = v.tex_coord.filter(|&t| t >= self.tex_coords.len()) {
                    return Err(out_of_range("texture coordinate", i, t, self.tex_coords.len()));
                }
                if let Some(n) = v.normal.filter(|&n| n >= self.normals.len()) {
                    return Err(out_of_range("normal", i, n, self.normals.len()));
                }
            }
        }

        for range in &self.ranges {
            if let Some(last) = range.last_face {
                if range.first_face > last || last >= self.faces.len() {
                    return Err(SceneError::ImportError(format!(
                        "material range {} covers faces {}..={last} of {}",
                        range.name,
                        range.first_face,
                        self.faces.len()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Model shape: geometry plus winding, normal policy and material library
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    geometry: ModelGeometry,
    clockwise: bool,
    auto_normals: bool,
    source: Option<PathBuf>,
    library: FxHashMap<String, MaterialId>,
}

impl Model {
    #[must_use]
    pub fn new(geometry: ModelGeometry) -> Self {
        Self {
            geometry,
            ..Self::default()
        }
    }

    /// Treat faces as clockwise and flip them
    #[must_use]
    pub fn with_clockwise(mut self, clockwise: bool) -> Self {
        self.clockwise = clockwise;
        self
    }

    /// Replace the model's normals with generated face normals
    #[must_use]
    pub fn with_auto_normals(mut self, auto_normals: bool) -> Self {
        self.auto_normals = auto_normals;
        self
    }

    #[must_use]
    pub fn geometry(&self) -> &ModelGeometry {
        &self.geometry
    }

    #[must_use]
    pub fn clockwise(&self) -> bool {
        self.clockwise
    }

    #[must_use]
    pub fn auto_normals(&self) -> bool {
        self.auto_normals
    }

    /// File the geometry was loaded from
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    #[must_use]
    pub fn material_for(&self, name: &str) -> Option<MaterialId> {
        self.library.get(name).copied()
    }

    /// Material library entries
    pub fn library(&self) -> impl Iterator<Item = (&str, MaterialId)> {
        self.library.iter().map(|(name, &id)| (name.as_str(), id))
    }

    pub(super) fn closed_ranges(&self) -> impl Iterator<Item = &MaterialRange> {
        self.geometry.ranges.iter().filter(|r| r.last_face.is_some())
    }

    pub(super) fn triangulate(&self) -> Geometry {
        let g = &self.geometry;
        let position = |i: usize| g.positions.get(i).copied().unwrap_or(Vec3::ZERO);
        let tex_coord = |i: Option<usize>| i.and_then(|i| g.tex_coords.get(i).copied());

        let vertex_count = g.faces.len() * 3;
        let mut out = Geometry {
            positions: Vec::with_capacity(vertex_count),
            normals: Vec::with_capacity(vertex_count),
            tex_coords: Vec::with_capacity(vertex_count),
            tangents: Vec::with_capacity(vertex_count),
        };

        for face in &g.faces {
            let mut face = *face;
            if self.clockwise {
                face.swap(1, 2);
            }

            let [p1, p2, p3] = face.map(|v| position(v.position));
            let auto_normal = if face[0].normal.is_none() || self.auto_normals {
                surface_normal(p1, p2, p3)
            } else {
                Vec3::ZERO
            };
            let tangent = match face.map(|v| tex_coord(v.tex_coord)) {
                [Some(uv1), Some(uv2), Some(uv3)] => surface_tangent(p1, p2, p3, uv1, uv2, uv3),
                _ => Vec3::ZERO,
            };

            for v in face {
                let normal = match v.normal {
                    Some(n) if !self.auto_normals => g.normals.get(n).copied().unwrap_or(auto_normal),
                    _ => auto_normal,
                };
                out.positions.push(position(v.position));
                out.normals.push(normal);
                out.tex_coords.push(tex_coord(v.tex_coord).unwrap_or(Vec2::ZERO));
                out.tangents.push(tangent);
            }
        }
        out
    }
}

impl SceneGraph {
    fn with_model<R>(&self, entity: Entity, f: impl FnOnce(&mut Model) -> R) -> Result<R, SceneError> {
        let mut mesh = self.component_mut::<Mesh>(entity)?;
        match &mut mesh.shape {
            Shape::Model(model) => Ok(f(model)),
            _ => Err(SceneError::MissingComponent {
                entity,
                component: "Model",
            }),
        }
    }

    /// Give every range name a library entry, then apply the geometry's
    /// own material specs
    pub(crate) fn sync_model_library(&mut self, entity: Entity) {
        let Ok((missing, specs)) = self.with_model(entity, |model| {
            let mut missing: Vec<String> = Vec::new();
            for range in &model.geometry.ranges {
                if !model.library.contains_key(&range.name) && !missing.contains(&range.name) {
                    missing.push(range.name.clone());
                }
            }
            (missing, model.geometry.materials.clone())
        }) else {
            return;
        };

        for name in missing {
            let id = self.add_material(SolidMaterial::new(Vec3::ONE).with_shininess(1.0));
            if self.with_model(entity, |model| model.library.insert(name, id)).is_ok() {
                let _ = self.schedule(entity, Deferred::InitMaterial(id));
            }
        }

        if let Err(err) = self.apply_material_library(entity, &specs) {
            log::warn!("Failed to apply material library: {err}");
        }
    }

    /// Material a model draws the range `name` with
    ///
    /// # Errors
    ///
    /// Returns an error if `entity` is not a model mesh
    pub fn model_material(&self, entity: Entity, name: &str) -> Result<Option<MaterialId>, SceneError> {
        self.with_model(entity, |model| model.material_for(name))
    }

    /// Replace a model's geometry and rebuild it
    ///
    /// # Errors
    ///
    /// Returns an error if `entity` is not a model mesh or an index in
    /// `geometry` is out of range
    pub fn set_model_geometry(&mut self, entity: Entity, geometry: ModelGeometry) -> Result<(), SceneError> {
        geometry.validate()?;
        self.with_model(entity, |model| model.geometry = geometry)?;
        self.sync_model_library(entity);
        self.rebuild_geometry(entity)
    }

    /// Load model geometry from `path`.
    ///
    /// A file that fails to load is logged and the model keeps its current
    /// geometry.
    ///
    /// # Errors
    ///
    /// Returns an error if `entity` is not a model mesh
    pub fn load_model(&mut self, entity: Entity, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let path = path.as_ref();
        self.with_model(entity, |_| ())?;
        log::debug!("Loading model {}", path.display());

        match ModelGeometry::load(path) {
            Ok(geometry) => {
                self.with_model(entity, |model| model.source = Some(path.to_path_buf()))?;
                self.set_model_geometry(entity, geometry)
            }
            Err(err) => {
                log::error!("Failed to load model {}: {err}", path.display());
                Ok(())
            }
        }
    }

    /// Flip face winding
    ///
    /// # Errors
    ///
    /// Returns an error if `entity` is not a model mesh
    pub fn set_model_clockwise(&mut self, entity: Entity, clockwise: bool) -> Result<(), SceneError> {
        self.with_model(entity, |model| model.clockwise = clockwise)?;
        self.rebuild_geometry(entity)
    }

    /// # Errors
    ///
    /// Returns an error if `entity` is not a model mesh
    pub fn set_model_auto_normals(&mut self, entity: Entity, auto_normals: bool) -> Result<(), SceneError> {
        self.with_model(entity, |model| model.auto_normals = auto_normals)?;
        self.rebuild_geometry(entity)
    }

    /// Apply material specs by name to a model's library.
    ///
    /// A spec with a diffuse map swaps the entry for a texture material;
    /// otherwise the existing solid material takes the spec's color and
    /// shininess. Names the model does not use are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if `entity` is not a model mesh
    pub fn apply_material_library(&mut self, entity: Entity, specs: &[MaterialSpec]) -> Result<(), SceneError> {
        if specs.is_empty() {
            return self.with_model(entity, |_| ());
        }
        for spec in specs {
            let Some(id) = self.with_model(entity, |model| model.material_for(&spec.name))? else {
                log::debug!("Model does not use material {}", spec.name);
                continue;
            };

            if let Some(map) = &spec.diffuse_map {
                let texture = self.add_material(TextureMaterial::from_path(map));
                self.with_model(entity, |model| model.library.insert(spec.name.clone(), texture))?;
                self.schedule(entity, Deferred::InitMaterial(texture))?;
                self.schedule(entity, Deferred::ApplyMaterial(texture))?;
                if self.meshes_using(id).is_empty() {
                    let _ = self.remove_material(id);
                }
            } else if let Err(err) = self.update_material::<SolidMaterial>(id, |m| {
                m.set_color(spec.diffuse);
                m.set_shininess(spec.shininess);
            }) {
                log::warn!("Cannot apply color to material {}: {err}", spec.name);
            }
        }

        self.notify(entity, Property::Material);
        self.invalidate(entity);
        Ok(())
    }
}
