use oxy_common::Color;
use serde::{Deserialize, Serialize};

/// Surface description consumed by the GPU backend.
///
/// Texture slots hold asset keys; `None` means the backend binds its
/// built-in 1x1 fallback for that slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub base_color: Color,
    pub metallic: f32,
    pub roughness: f32,
    pub diffuse_texture: Option<String>,
    pub normal_texture: Option<String>,
    pub metallic_roughness_texture: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            base_color: Color::WHITE,
            metallic: 0.0,
            roughness: 0.5,
            diffuse_texture: None,
            normal_texture: None,
            metallic_roughness_texture: None,
        }
    }
}

impl Material {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// True when any texture slot is populated.
    pub fn has_textures(&self) -> bool {
        self.diffuse_texture.is_some()
            || self.normal_texture.is_some()
            || self.metallic_roughness_texture.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_material_is_untextured() {
        let mat = Material::default();
        assert_eq!(mat.base_color, Color::WHITE);
        assert!(!mat.has_textures());
    }

    #[test]
    fn named_keeps_defaults() {
        let mat = Material::named("brick");
        assert_eq!(mat.name, "brick");
        assert_eq!(mat.roughness, 0.5);
    }

    #[test]
    fn texture_slot_flips_has_textures() {
        let mat = Material {
            diffuse_texture: Some("brick_diffuse".to_string()),
            ..Material::default()
        };
        assert!(mat.has_textures());
    }
}
