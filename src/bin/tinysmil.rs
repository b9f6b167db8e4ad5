use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tinysmil::{
    CanvasUpdate, CpuGraphics, Document, EngineConfig, FsFetcher, ImageLoader, SceneDef,
    RepaintScheduler, SimpleCanvasManager, SmilResult, preload_images,
};

#[derive(Parser, Debug)]
#[command(name = "tinysmil", version)]
struct Cli {
    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print trait values of every element with an id at one time.
    Sample(SampleArgs),
    /// Step through a time range and report the repaint work per frame.
    Frames(FramesArgs),
    /// Render one frame as a PNG.
    Render(RenderArgs),
}

#[derive(Args, Debug)]
struct SceneArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Engine config JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SampleArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Document time in ms.
    #[arg(long)]
    at: i64,
}

#[derive(Args, Debug)]
struct FramesArgs {
    #[command(flatten)]
    scene: SceneArgs,

    #[arg(long, default_value_t = 0)]
    from: i64,

    #[arg(long)]
    to: i64,

    /// Step in ms. Defaults to the configured frame interval.
    #[arg(long)]
    step: Option<i64>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    scene: SceneArgs,

    #[arg(long)]
    at: i64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

/// Frames are consumed as soon as they are painted, so a retry is never
/// needed.
struct NoRetry;

impl RepaintScheduler for NoRetry {
    fn queued(&self) -> usize {
        0
    }

    fn schedule_retry(&self) -> SmilResult<()> {
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Sample(args) => cmd_sample(args),
        Command::Frames(args) => cmd_frames(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn load(args: &SceneArgs) -> anyhow::Result<(Document, EngineConfig, ImageLoader)> {
    let def = SceneDef::from_path(&args.in_path)?;
    let doc = def
        .build()
        .with_context(|| format!("build scene '{}'", args.in_path.display()))?;
    let config = match &args.config {
        Some(p) => EngineConfig::from_path(p)?,
        None => EngineConfig::default(),
    };
    let assets_root = args.in_path.parent().unwrap_or_else(|| Path::new("."));
    let images = ImageLoader::new(Arc::new(FsFetcher::new(assets_root)));
    Ok((doc, config, images))
}

fn canvas_for(doc: &Document, config: &EngineConfig) -> anyhow::Result<SimpleCanvasManager> {
    let gfx = CpuGraphics::new(doc.scene().viewport())?;
    Ok(SimpleCanvasManager::new(
        Box::new(gfx),
        config.tile_min_size,
        config.dirty_areas,
        config.clear_color(),
    )?)
}

/// Samples from document begin up to `at`.
fn sample_to(doc: &mut Document, at: i64) -> anyhow::Result<()> {
    doc.sample(0)?;
    if at != 0 {
        doc.sample(at)?;
    }
    Ok(())
}

fn cmd_sample(args: SampleArgs) -> anyhow::Result<()> {
    let (mut doc, _, _) = load(&args.scene)?;
    sample_to(&mut doc, args.at)?;
    let scene = doc.scene();
    for id in scene.paint_order() {
        let Some(name) = scene.element_id(id) else {
            continue;
        };
        for (t, value) in scene.traits(id) {
            println!("{name}.{t} = {value}");
        }
    }
    Ok(())
}

fn cmd_frames(args: FramesArgs) -> anyhow::Result<()> {
    let (mut doc, config, images) = load(&args.scene)?;
    let step = args.step.unwrap_or(config.frame_interval_ms as i64);
    anyhow::ensure!(step > 0, "--step must be > 0");
    anyhow::ensure!(args.to >= args.from, "--to must not be before --from");

    preload_images(doc.scene(), &images);
    let mut canvas = canvas_for(&doc, &config)?;
    let last: Arc<Mutex<Option<CanvasUpdate>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&last);
    canvas.set_update_listener(move |u| {
        if let Ok(mut slot) = sink.lock() {
            *slot = Some(u.clone());
        }
    });
    let consumer = canvas.consumer();

    let mut t = args.from;
    while t <= args.to {
        doc.sample(t)?;
        let painted = canvas.update_canvas(doc.scene_mut(), &images, &NoRetry)?;
        let update = last.lock().ok().and_then(|mut s| s.take());
        match update {
            Some(u) if painted => println!(
                "t={t}ms tiles={} painted={} skipped={} full={}",
                u.stats.tiles, u.stats.painted_nodes, u.stats.skipped_nodes, u.full
            ),
            _ => println!("t={t}ms tiles=0"),
        }
        consumer.consume();
        t += step;
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let (mut doc, config, images) = load(&args.scene)?;
    sample_to(&mut doc, args.at)?;
    preload_images(doc.scene(), &images);

    let mut canvas = canvas_for(&doc, &config)?;
    let consumer = canvas.consumer();
    canvas.update_canvas(doc.scene_mut(), &images, &NoRetry)?;
    let frame = consumer
        .latest_frame()
        .context("renderer produced no frame")?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &frame.to_straight_rgba8(),
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
