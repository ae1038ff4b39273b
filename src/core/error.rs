//! Scene graph errors

use hecs::Entity;

/// Errors that can occur while building or mutating a scene
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The entity does not exist (or was despawned)
    NoSuchEntity(Entity),
    /// The entity exists but is not of the requested kind
    MissingComponent {
        /// Entity that was accessed
        entity: Entity,
        /// Name of the missing component type
        component: &'static str,
    },
    /// Attaching `child` under `parent` would make the hierarchy cyclic
    HierarchyCycle {
        /// Requested parent
        parent: Entity,
        /// Requested child
        child: Entity,
    },
    /// A name used in a scene description does not resolve to a node
    UnknownReference(String),
    /// IO error
    IoError(String),
    /// Serialization error
    SerializeError(String),
    /// Deserialization error
    DeserializeError(String),
    /// Import of an external asset format failed
    ImportError(String),
}

impl SceneError {
    /// Map a hecs component lookup failure for `entity` onto a scene error
    pub(crate) fn from_component<T>(entity: Entity, err: hecs::ComponentError) -> Self {
        match err {
            hecs::ComponentError::NoSuchEntity => Self::NoSuchEntity(entity),
            hecs::ComponentError::MissingComponent(_) => Self::MissingComponent {
                entity,
                component: short_type_name::<T>(),
            },
        }
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSuchEntity(e) => write!(f, "No such entity: {e:?}"),
            Self::MissingComponent { entity, component } => {
                write!(f, "Entity {entity:?} has no {component} component")
            }
            Self::HierarchyCycle { parent, child } => {
                write!(f, "Adding {child:?} under {parent:?} would create a cycle")
            }
            Self::UnknownReference(name) => write!(f, "Unknown node reference: {name}"),
            Self::IoError(e) => write!(f, "IO error: {e}"),
            Self::SerializeError(e) => write!(f, "Serialization error: {e}"),
            Self::DeserializeError(e) => write!(f, "Deserialization error: {e}"),
            Self::ImportError(e) => write!(f, "Import error: {e}"),
        }
    }
}

impl std::error::Error for SceneError {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Light;

    #[test]
    fn test_missing_component_names_type() {
        let mut world = hecs::World::new();
        let e = world.spawn(());
        let err = world.get::<&Light>(e).map(|_| ()).unwrap_err();

        let scene_err = SceneError::from_component::<Light>(e, err);
        assert_eq!(
            scene_err,
            SceneError::MissingComponent {
                entity: e,
                component: "Light"
            }
        );
        assert!(scene_err.to_string().contains("Light"));
    }

    #[test]
    fn test_despawned_entity_maps_to_no_such_entity() {
        let mut world = hecs::World::new();
        let e = world.spawn(());
        world.despawn(e).unwrap();
        let err = world.get::<&Light>(e).map(|_| ()).unwrap_err();

        assert_eq!(
            SceneError::from_component::<Light>(e, err),
            SceneError::NoSuchEntity(e)
        );
    }
}
