use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use oxy_render::RenderView;

/// CPU-side mirror of the engine's `CameraUniform` WGSL struct.
///
/// Field order and padding must match the GPU layout exactly; the test
/// below checks the byte size against shader reflection.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub position: [f32; 4],
}

/// Fly camera: position plus yaw/pitch, perspective projection.
#[derive(Debug, Clone, Copy)]
pub struct FlyCamera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub speed: f32,
    pub sensitivity: f32,
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 10.0, 15.0),
            yaw: -90.0_f32.to_radians(),
            pitch: -30.0_f32.to_radians(),
            fov: 60.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
            speed: 10.0,
            sensitivity: 0.003,
        }
    }
}

impl FlyCamera {
    /// Derive a camera from a view description.
    pub fn from_view(view: &RenderView, aspect: f32) -> Self {
        let dir = (view.target - view.eye).normalize_or(Vec3::NEG_Z);
        Self {
            position: view.eye,
            yaw: dir.z.atan2(dir.x),
            pitch: dir.y.asin(),
            fov: view.fov_degrees.to_radians(),
            aspect,
            ..Self::default()
        }
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    /// Move along the camera's local axes: x = right, y = world up,
    /// z = forward.
    pub fn move_local(&mut self, local: Vec3, dt: f32) {
        let step = self.speed * dt;
        self.position += self.right() * local.x * step;
        self.position.y += local.y * step;
        self.position += self.forward() * local.z * step;
    }

    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch -= dy * self.sensitivity;
        self.pitch = self
            .pitch
            .clamp(-89.0_f32.to_radians(), 89.0_f32.to_radians());
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Pack this camera into the GPU uniform.
    pub fn uniform(&self) -> CameraUniform {
        CameraUniform {
            view_proj: self.view_projection().to_cols_array_2d(),
            view: self.view_matrix().to_cols_array_2d(),
            position: Vec4::from((self.position, 1.0)).to_array(),
        }
    }
}
