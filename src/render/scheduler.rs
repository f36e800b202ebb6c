use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use rayon::prelude::*;

use crate::audio::waveform::WaveformSummary;
use crate::foundation::core::{CancelToken, Canvas, FrameIndex, Fps};
use crate::foundation::error::{AudiogramError, AudiogramResult};
use crate::foundation::math::unpremultiply_rgba8_in_place;
use crate::layout::{FrameScene, layout_frame};
use crate::render::assets::RenderAssets;
use crate::render::cpu::CpuRasterizer;
use crate::render::surface_pool::{Surface, SurfacePool};

/// Produces the raster for one frame index.
///
/// `Worker` is per-thread scratch state created once per pool thread.
pub trait FrameRenderer: Sync {
    type Worker: Send;

    fn worker(&self) -> Self::Worker;

    fn render(
        &self,
        worker: &mut Self::Worker,
        frame: FrameIndex,
        surface: &mut Surface,
    ) -> AudiogramResult<()>;
}

/// The production renderer: layout of the job scene at `frame / fps`, rasterized on the CPU.
pub struct SceneFrameRenderer {
    scene: Arc<FrameScene>,
    summary: Arc<WaveformSummary>,
    assets: Arc<RenderAssets>,
    fps: Fps,
}

impl SceneFrameRenderer {
    pub fn new(
        scene: Arc<FrameScene>,
        summary: Arc<WaveformSummary>,
        assets: Arc<RenderAssets>,
        fps: Fps,
    ) -> Self {
        Self {
            scene,
            summary,
            assets,
            fps,
        }
    }

    pub fn canvas(&self) -> Canvas {
        self.scene.theme.canvas()
    }

    /// Render a single frame straight to a PNG file (preview path, no pool).
    pub fn render_to_png(&self, frame: FrameIndex, path: &Path) -> AudiogramResult<()> {
        let pool = SurfacePool::new(1, self.canvas())?;
        let mut surface = pool.acquire();
        let mut worker = self.worker();
        self.render(&mut worker, frame, &mut surface)?;
        write_png(path, surface.pixmap())
    }
}

impl FrameRenderer for SceneFrameRenderer {
    type Worker = CpuRasterizer;

    fn worker(&self) -> CpuRasterizer {
        CpuRasterizer::new(self.assets.clone())
    }

    fn render(
        &self,
        worker: &mut CpuRasterizer,
        frame: FrameIndex,
        surface: &mut Surface,
    ) -> AudiogramResult<()> {
        let t = self.fps.frame_time_secs(frame);
        let points = usize::try_from(frame.0)
            .map(|i| self.summary.frame(i))
            .unwrap_or(&[]);
        let list = layout_frame(&self.scene, points, t, worker.text_engine());
        worker.rasterize(&list, surface.pixmap_mut())
    }
}

/// Frame Scheduler options.
#[derive(Clone, Copy, Debug)]
pub struct ScheduleOpts {
    pub num_frames: u64,
    /// Concurrent frame tasks and pooled surfaces.
    pub pool_width: usize,
}

/// Render `num_frames` frames into `out_dir` as `frame-NNNNNN.png`.
///
/// Frames render on a dedicated pool of `pool_width` threads, each frame holding one pooled
/// surface until its PNG is written. `tick` receives the running count of completed frames.
/// The first failure (or cancellation) stops the batch; files already written are left in place.
#[tracing::instrument(skip(renderer, out_dir, cancel, tick), fields(out_dir = %out_dir.display()))]
pub fn render_frames<R: FrameRenderer>(
    renderer: &R,
    canvas: Canvas,
    opts: ScheduleOpts,
    out_dir: &Path,
    cancel: &CancelToken,
    tick: &(dyn Fn(u64) + Sync),
) -> AudiogramResult<()> {
    if opts.pool_width == 0 {
        return Err(AudiogramError::validation("render pool width must be >= 1"));
    }
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create frame dir '{}'", out_dir.display()))?;

    let surfaces = SurfacePool::new(opts.pool_width, canvas)?;
    let threads = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.pool_width)
        .thread_name(|i| format!("audiogram-frame-{i}"))
        .build()
        .map_err(|e| AudiogramError::render(format!("failed to build rayon thread pool: {e}")))?;
    let completed = AtomicU64::new(0);

    tracing::info!(frames = opts.num_frames, width = opts.pool_width, "rendering frames");
    threads.install(|| {
        (0..opts.num_frames).into_par_iter().try_for_each_init(
            || renderer.worker(),
            |worker, i| -> AudiogramResult<()> {
                cancel.check()?;
                let frame = FrameIndex(i);
                let mut surface = surfaces.acquire();
                renderer.render(worker, frame, &mut surface)?;
                write_png(&out_dir.join(frame.file_name()), surface.pixmap())?;
                drop(surface);

                tick(completed.fetch_add(1, Ordering::Relaxed) + 1);
                Ok(())
            },
        )
    })?;
    tracing::debug!(frames = opts.num_frames, "frames written");
    Ok(())
}

/// Encode a premultiplied pixmap as a straight-alpha RGBA PNG.
pub fn write_png(path: &Path, pixmap: &vello_cpu::Pixmap) -> AudiogramResult<()> {
    let mut data = pixmap.data_as_u8_slice().to_vec();
    unpremultiply_rgba8_in_place(&mut data);
    image::save_buffer_with_format(
        path,
        &data,
        u32::from(pixmap.width()),
        u32::from(pixmap.height()),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .map_err(|e| AudiogramError::render(format!("write '{}': {e}", path.display())))
}

#[cfg(test)]
#[path = "../../tests/unit/render/scheduler.rs"]
mod tests;
