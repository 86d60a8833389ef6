use serde::{Deserialize, Serialize};

/// Primitive topology, backend-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Topology {
    #[default]
    TriangleList,
    LineList,
    PointList,
}

/// Face culling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CullMode {
    #[default]
    Back,
    Front,
    None,
}

/// Color blend mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Replace,
    Alpha,
    Additive,
}

/// Pipeline configuration with builder-style overrides.
///
/// Defaults describe an opaque lit mesh: triangles, back-face culling,
/// depth test and write on, no blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOptions {
    pub topology: Topology,
    pub cull_mode: CullMode,
    pub depth_test: bool,
    pub depth_write: bool,
    pub blend: BlendMode,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            topology: Topology::TriangleList,
            cull_mode: CullMode::Back,
            depth_test: true,
            depth_write: true,
            blend: BlendMode::Replace,
        }
    }
}

impl PipelineOptions {
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_cull_mode(mut self, cull_mode: CullMode) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    pub fn with_depth_test(mut self, enabled: bool) -> Self {
        self.depth_test = enabled;
        self
    }

    pub fn with_depth_write(mut self, enabled: bool) -> Self {
        self.depth_write = enabled;
        self
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    /// Preset for transparent geometry: alpha blend, depth test without
    /// depth write.
    pub fn transparent() -> Self {
        Self::default()
            .with_blend(BlendMode::Alpha)
            .with_depth_write(false)
    }

    /// Preset for debug line overlays.
    pub fn lines() -> Self {
        Self::default()
            .with_topology(Topology::LineList)
            .with_cull_mode(CullMode::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_opaque_mesh() {
        let opts = PipelineOptions::default();
        assert_eq!(opts.topology, Topology::TriangleList);
        assert_eq!(opts.cull_mode, CullMode::Back);
        assert!(opts.depth_test);
        assert!(opts.depth_write);
        assert_eq!(opts.blend, BlendMode::Replace);
    }

    #[test]
    fn builder_overrides_compose() {
        let opts = PipelineOptions::default()
            .with_topology(Topology::LineList)
            .with_depth_test(false);
        assert_eq!(opts.topology, Topology::LineList);
        assert!(!opts.depth_test);
        // Untouched fields keep their defaults.
        assert_eq!(opts.cull_mode, CullMode::Back);
    }

    #[test]
    fn transparent_preset() {
        let opts = PipelineOptions::transparent();
        assert_eq!(opts.blend, BlendMode::Alpha);
        assert!(opts.depth_test);
        assert!(!opts.depth_write);
    }
}
