//! Error types for VPE.
//!
//! Construction-time problems (bad configuration, malformed mesh data, GPU
//! setup) are reported through these types. The per-frame update path never
//! returns an error: a broken particle effect degrades the picture, it does
//! not take the host down.

use std::fmt;

/// Errors raised while validating or loading an engine configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// A parameter is outside its allowed range.
    InvalidParam {
        /// Parameter name as it appears in the config.
        name: &'static str,
        /// Human readable description of the allowed range.
        expected: &'static str,
        /// The rejected value.
        value: f32,
    },
    /// Stride must be at least 1.
    ZeroStride,
    /// Failed to parse or serialize JSON.
    Json(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidParam { name, expected, value } => {
                write!(f, "Invalid parameter `{}` = {}: expected {}", name, value, expected)
            }
            ConfigError::ZeroStride => write!(f, "Stride must be at least 1"),
            ConfigError::Json(e) => write!(f, "Config JSON error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

/// Errors raised while assembling a [`MeshSource`](crate::mesh::MeshSource).
#[derive(Debug, Clone, PartialEq)]
pub enum MeshError {
    /// Flat position buffer length is not a multiple of 3.
    RaggedPositions(usize),
    /// Per-vertex skin arrays do not match the vertex count.
    SkinLengthMismatch {
        /// Number of vertices in the position buffer.
        vertices: usize,
        /// Number of joint index entries.
        joints: usize,
        /// Number of weight entries.
        weights: usize,
    },
    /// A vertex references a joint the skeleton does not have.
    JointOutOfRange {
        /// Offending joint index.
        joint: u16,
        /// Number of joints in the skeleton.
        joint_count: usize,
    },
    /// A joint names a parent that does not precede it.
    BadParent {
        /// Joint index.
        joint: usize,
        /// Parent index it references.
        parent: usize,
    },
    /// A skinned primitive references a skeleton that was never added.
    UnknownSkeleton(usize),
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshError::RaggedPositions(len) => {
                write!(f, "Position buffer length {} is not a multiple of 3", len)
            }
            MeshError::SkinLengthMismatch { vertices, joints, weights } => write!(
                f,
                "Skin data mismatch: {} vertices, {} joint entries, {} weight entries",
                vertices, joints, weights
            ),
            MeshError::JointOutOfRange { joint, joint_count } => write!(
                f,
                "Joint index {} out of range for skeleton with {} joints",
                joint, joint_count
            ),
            MeshError::BadParent { joint, parent } => write!(
                f,
                "Joint {} has parent {} which does not precede it",
                joint, parent
            ),
            MeshError::UnknownSkeleton(id) => write!(f, "Unknown skeleton {}", id),
        }
    }
}

impl std::error::Error for MeshError {}

/// Errors that can occur during GPU initialization.
#[derive(Debug)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            GpuError::NoAdapter => write!(f, "No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support."),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::SurfaceCreation(e) => Some(e),
            GpuError::DeviceCreation(e) => Some(e),
            GpuError::NoAdapter => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for GpuError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        GpuError::SurfaceCreation(e)
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

/// Errors that can occur when running the viewer.
#[derive(Debug)]
pub enum ViewerError {
    /// Failed to create event loop.
    EventLoop(winit::error::EventLoopError),
    /// The OS refused to create the window.
    Window(winit::error::OsError),
    /// GPU initialization failed.
    Gpu(GpuError),
    /// The engine configuration was rejected.
    Config(ConfigError),
    /// No mesh source provided.
    NoSource,
}

impl fmt::Display for ViewerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerError::EventLoop(e) => write!(f, "Failed to create event loop: {}", e),
            ViewerError::Window(e) => write!(f, "Failed to create window: {}", e),
            ViewerError::Gpu(e) => write!(f, "GPU error: {}", e),
            ViewerError::Config(e) => write!(f, "Config error: {}", e),
            ViewerError::NoSource => write!(f, "No mesh source provided. Use .with_source() to set one."),
        }
    }
}

impl std::error::Error for ViewerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ViewerError::EventLoop(e) => Some(e),
            ViewerError::Window(e) => Some(e),
            ViewerError::Gpu(e) => Some(e),
            ViewerError::Config(e) => Some(e),
            ViewerError::NoSource => None,
        }
    }
}

impl From<winit::error::EventLoopError> for ViewerError {
    fn from(e: winit::error::EventLoopError) -> Self {
        ViewerError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for ViewerError {
    fn from(e: winit::error::OsError) -> Self {
        ViewerError::Window(e)
    }
}

impl From<GpuError> for ViewerError {
    fn from(e: GpuError) -> Self {
        ViewerError::Gpu(e)
    }
}

impl From<ConfigError> for ViewerError {
    fn from(e: ConfigError) -> Self {
        ViewerError::Config(e)
    }
}
