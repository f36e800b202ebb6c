use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use audiogram::audio::decode::FfmpegPcmStream;
use audiogram::audio::probe::probe_audio;
use audiogram::audio::waveform::{WaveformOpts, analyze};
use audiogram::job::{FileJobStore, JobStage, JobStore, LocalStorage, MemoryJobStore, Orchestrator};
use audiogram::render::{RenderAssets, SceneFrameRenderer};
use audiogram::{Fps, FrameIndex, FrameScene, JobSubmission, Settings, WaveformSummary};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "audiogram", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a job to MP4 through the job orchestrator (requires `ffmpeg`/`ffprobe`).
    Render(RenderArgs),
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Analyze an audio file and print the waveform summary as JSON.
    Waveform(WaveformArgs),
}

#[derive(Args, Debug)]
struct JobArgs {
    /// Job submission JSON (theme, captions, formatting, trim window).
    #[arg(long)]
    job: PathBuf,

    /// Audio file, overriding the submission's `audioFile`.
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Root for relative theme asset paths. Defaults to the job file's directory.
    #[arg(long)]
    asset_root: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SettingsArgs {
    /// Settings JSON file.
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long)]
    work_dir: Option<PathBuf>,

    #[arg(long)]
    storage: Option<PathBuf>,

    /// Concurrent frame renders.
    #[arg(long)]
    pool_width: Option<usize>,

    #[arg(long)]
    keep_work_dir: bool,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    job: JobArgs,

    #[command(flatten)]
    settings: SettingsArgs,

    /// Copy the finished video here.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Persist job state as JSON files in this directory.
    #[arg(long)]
    state_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    job: JobArgs,

    #[command(flatten)]
    settings: SettingsArgs,

    /// Frame index (0-based).
    #[arg(long, default_value_t = 0)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Outline caption zones.
    #[arg(long)]
    zones: bool,
}

#[derive(Parser, Debug)]
struct WaveformArgs {
    #[arg(long)]
    audio: PathBuf,

    #[command(flatten)]
    settings: SettingsArgs,

    #[arg(long)]
    fps: Option<u32>,

    #[arg(long)]
    samples_per_frame: Option<usize>,

    /// Frame count. Defaults to `floor(duration * fps)`.
    #[arg(long)]
    frames: Option<usize>,

    /// Output JSON path. Defaults to stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Waveform(args) => cmd_waveform(args),
    }
}

fn load_settings(args: &SettingsArgs) -> anyhow::Result<Settings> {
    let mut settings = match &args.settings {
        Some(p) => Settings::from_path(p)?,
        None => Settings::default(),
    };
    if let Some(d) = &args.work_dir {
        settings.working_directory = d.clone();
    }
    if let Some(d) = &args.storage {
        settings.storage_path = d.clone();
    }
    if let Some(w) = args.pool_width {
        settings.render_pool_width = w;
    }
    settings.keep_work_dir |= args.keep_work_dir;
    settings.validate()?;
    Ok(settings)
}

/// Read the submission and make its audio path absolute.
fn load_job(args: &JobArgs, settings: &mut Settings) -> anyhow::Result<JobSubmission> {
    let text = std::fs::read_to_string(&args.job)
        .with_context(|| format!("read job '{}'", args.job.display()))?;
    let mut job = JobSubmission::from_json_str(&text)?;
    let job_dir = args.job.parent().unwrap_or_else(|| Path::new("."));

    let audio = match &args.audio {
        Some(p) => p.clone(),
        None => job_dir.join(&job.audio_file),
    };
    let audio = std::fs::canonicalize(&audio)
        .with_context(|| format!("audio '{}' not found", audio.display()))?;
    job.audio_file = audio.to_string_lossy().into_owned();

    settings.theme_asset_root = args
        .asset_root
        .clone()
        .unwrap_or_else(|| job_dir.to_path_buf());
    job.validate()?;
    Ok(job)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut settings = load_settings(&args.settings)?;
    let job = load_job(&args.job, &mut settings)?;

    let storage = Arc::new(LocalStorage::new(settings.storage_path.clone()));
    let store: Arc<dyn JobStore> = match &args.state_dir {
        Some(dir) => Arc::new(FileJobStore::open(dir)?),
        None => Arc::new(MemoryJobStore::new()),
    };
    let orchestrator = Orchestrator::start(settings, store, storage.clone())?;
    let id = orchestrator.submit(job)?;
    eprintln!("job {id} queued");

    let mut last = String::new();
    let report = orchestrator.wait(id, Duration::from_millis(250), |r| {
        if r.message != last {
            eprintln!("  {}", r.message);
            last = r.message.clone();
        }
    })?;
    orchestrator.shutdown();

    if report.status != JobStage::Ready {
        anyhow::bail!(
            "render failed: {}",
            report.error.unwrap_or_else(|| report.message.clone())
        );
    }
    let video = storage.video_path(id);
    match args.out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            std::fs::copy(&video, &out)
                .with_context(|| format!("copy video to '{}'", out.display()))?;
            eprintln!("wrote {}", out.display());
        }
        None => eprintln!("wrote {}", video.display()),
    }
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let mut settings = load_settings(&args.settings)?;
    let mut job = load_job(&args.job, &mut settings)?;
    job.theme.resolve_paths(&settings.theme_asset_root);

    let fps = Fps::whole(job.theme.frames_per_second.unwrap_or(settings.default_fps))?;
    let samples_per_frame = job
        .theme
        .samples_per_frame
        .unwrap_or(settings.default_samples_per_frame);
    let summary = summarize_file(
        &settings,
        Path::new(&job.audio_file),
        fps,
        samples_per_frame,
        None,
    )?;

    let mut scene = FrameScene::from_submission(&job)?;
    scene.show_zone_boundaries = args.zones;
    let assets = RenderAssets::load(&scene.theme)?;
    let renderer =
        SceneFrameRenderer::new(Arc::new(scene), Arc::new(summary), Arc::new(assets), fps);

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    renderer.render_to_png(FrameIndex(args.frame), &args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_waveform(args: WaveformArgs) -> anyhow::Result<()> {
    let settings = load_settings(&args.settings)?;
    let fps = Fps::whole(args.fps.unwrap_or(settings.default_fps))?;
    let samples_per_frame = args
        .samples_per_frame
        .unwrap_or(settings.default_samples_per_frame);
    let summary = summarize_file(&settings, &args.audio, fps, samples_per_frame, args.frames)?;

    let json = serde_json::to_vec(&summary).context("serialize waveform")?;
    match &args.out {
        Some(out) => {
            std::fs::write(out, &json).with_context(|| format!("write '{}'", out.display()))?;
            eprintln!("wrote {} ({} frames)", out.display(), summary.num_frames());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&json)?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn summarize_file(
    settings: &Settings,
    audio: &Path,
    fps: Fps,
    samples_per_frame: usize,
    frames: Option<usize>,
) -> anyhow::Result<WaveformSummary> {
    let info = probe_audio(&settings.ffprobe_path, audio)?;
    let num_frames = match frames {
        Some(n) => n,
        None => usize::try_from(fps.secs_to_frames_floor(info.duration_secs))
            .context("frame count overflow")?,
    };
    if num_frames == 0 {
        anyhow::bail!("audio '{}' is too short to render", audio.display());
    }
    let opts = WaveformOpts {
        max_samples: settings.max_waveform_samples,
        oversampling: settings.waveform_oversampling,
        ..WaveformOpts::new(num_frames, samples_per_frame)
    };
    let mut stream = FfmpegPcmStream::spawn(&settings.ffmpeg_path, audio, info.channels)?;
    Ok(analyze(&mut stream, opts)?)
}
