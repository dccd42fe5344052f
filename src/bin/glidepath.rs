use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "glidepath", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single preview frame as a PNG.
    Frame(FrameArgs),
    /// Export an MP4 video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Print per-frame export positions as JSON.
    Positions(PositionsArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Milliseconds since preview start.
    #[arg(long)]
    time_ms: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Loop every item regardless of its own setting.
    #[arg(long = "loop")]
    looping: bool,

    /// Skip curve outlines and direction arrows.
    #[arg(long)]
    no_overlay: bool,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value_t = 30)]
    fps: u32,

    #[arg(long, default_value_t = 5.0)]
    seconds: f64,

    /// Output width; defaults to the scene canvas.
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Output height; defaults to the scene canvas.
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// Submit frames in real time (one frame every 1000/fps ms).
    #[arg(long)]
    paced: bool,
}

#[derive(Parser, Debug)]
struct PositionsArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    #[arg(long, default_value_t = 30)]
    fps: u32,

    #[arg(long, default_value_t = 5.0)]
    seconds: f64,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct FramePositions {
    frame: u64,
    time_ms: f64,
    commands: Vec<glidepath::DrawCommand>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
        Command::Positions(args) => cmd_positions(args),
    }
}

fn load_editor(path: &Path) -> anyhow::Result<glidepath::EditorState> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("read scene '{}'", path.display()))?;
    let mut doc = glidepath::SceneDocument::from_json(&json)
        .with_context(|| format!("parse scene '{}'", path.display()))?;
    if let Some(n) = std::env::var("GLIDEPATH_ARC_SUBDIVISIONS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&n| n > 0)
    {
        doc.subdivisions = Some(n);
    }
    Ok(doc.into_editor(glidepath::EditorOpts::default())?)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let editor = load_editor(&args.in_path)?;

    let clock = glidepath::ManualClock::default();
    let opts = glidepath::PreviewOpts {
        loop_policy: if args.looping {
            glidepath::LoopPolicy::Always
        } else {
            glidepath::LoopPolicy::PerItem
        },
        overlay: !args.no_overlay,
        ..glidepath::PreviewOpts::default()
    };
    let preview = glidepath::Preview::new(opts, &clock);

    let mut canvas = glidepath::CpuCanvas::new(editor.canvas())?;
    preview.render(&mut canvas, &editor, args.time_ms);
    let frame = canvas.snapshot()?;
    let rgba = frame.flattened(opts.background)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &rgba,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut editor = load_editor(&args.in_path)?;

    let mut opts = glidepath::ExportOpts::new(glidepath::Fps::whole(args.fps)?, args.seconds);
    if let (Some(w), Some(h)) = (args.width, args.height) {
        opts.output = Some(glidepath::CanvasSize::new(w, h)?);
    }

    let sink = glidepath::FfmpegSink::new(glidepath::FfmpegSinkOpts {
        background: opts.background,
        ..glidepath::FfmpegSinkOpts::new(&args.out)
    });
    let mut scheduler = glidepath::ExportScheduler::new(sink);
    scheduler.start(&mut editor, &opts)?;

    let end = if args.paced {
        let mut clock = glidepath::SystemClock::new();
        scheduler.run_paced(&mut editor, &mut clock)?
    } else {
        scheduler.run_to_completion(&mut editor)?
    };

    match end {
        glidepath::ExportStep::Completed(glidepath::Deliverable::File(path)) => {
            eprintln!("wrote {}", path.display());
        }
        other => eprintln!("export ended: {other:?}"),
    }
    Ok(())
}

fn cmd_positions(args: PositionsArgs) -> anyhow::Result<()> {
    let editor = load_editor(&args.in_path)?;
    let opts = glidepath::ExportOpts::new(glidepath::Fps::whole(args.fps)?, args.seconds);
    opts.validate()?;

    let frames: Vec<FramePositions> = (0..opts.total_frames())
        .map(|n| {
            let idx = glidepath::FrameIndex(n);
            FramePositions {
                frame: n,
                time_ms: opts.fps.frame_to_ms(idx),
                commands: glidepath::export_frame_commands(editor.scene(), opts.fps, idx),
            }
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&frames)?);
    Ok(())
}
