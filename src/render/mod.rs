//! Rasterization and the Frame Scheduler.

/// Per-job background image and font bytes.
pub mod assets;
/// `vello_cpu` display-list rasterizer.
pub mod cpu;
/// Parallel frame rendering to PNG files.
pub mod scheduler;
/// Recycled raster surfaces.
pub mod surface_pool;
/// Parley text shaping.
pub mod text;

pub use assets::RenderAssets;
pub use cpu::CpuRasterizer;
pub use scheduler::{FrameRenderer, SceneFrameRenderer, ScheduleOpts, render_frames, write_png};
pub use surface_pool::{Surface, SurfaceGuard, SurfacePool};
