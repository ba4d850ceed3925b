use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "spinrig", version)]
struct Cli {
    /// Rendering service base URL.
    #[arg(long, default_value = "http://localhost:4000")]
    api_url: String,

    /// Bearer token for the service. Falls back to SPINRIG_API_TOKEN.
    #[arg(long)]
    auth_token: Option<String>,

    /// Service environment tag, forwarded as a query parameter.
    #[arg(long)]
    environment: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a build and write one turntable frame as a PNG.
    Frame(FrameArgs),
    /// List a page of the part catalog.
    Parts(PartsArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Part selection as CATEGORY=ID (e.g. CPU=amd-7800x3d). Repeatable.
    #[arg(long = "part", value_name = "CATEGORY=ID")]
    parts: Vec<String>,

    /// Render a saved build by share code instead of explicit parts.
    #[arg(long)]
    share_code: Option<String>,

    /// Turntable frame to extract (0-based).
    #[arg(long, default_value_t = 0)]
    frame: u32,

    /// Frame density of the sprite render.
    #[arg(long, value_enum, default_value_t = QualityChoice::Standard)]
    quality: QualityChoice,

    /// Zoom factor applied when compositing.
    #[arg(long, default_value_t = 1.0)]
    zoom: f64,

    /// Use the synchronous render endpoint instead of the job protocol.
    #[arg(long)]
    sync: bool,

    /// Output square size in pixels.
    #[arg(long, default_value_t = 640)]
    size: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct PartsArgs {
    /// Restrict to one category (service wire name, e.g. GPU or PCCase).
    #[arg(long)]
    category: Option<String>,

    /// Page size.
    #[arg(long, default_value_t = 20)]
    limit: u32,

    /// Page offset.
    #[arg(long, default_value_t = 0)]
    skip: u32,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum QualityChoice {
    Standard,
    High,
}

impl QualityChoice {
    fn to_quality(self) -> spinrig::FrameQuality {
        match self {
            Self::Standard => spinrig::FrameQuality::Standard,
            Self::High => spinrig::FrameQuality::High,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = base_config(&cli);
    match cli.cmd {
        Command::Frame(args) => cmd_frame(config, args).await,
        Command::Parts(args) => cmd_parts(config, args).await,
    }
}

fn base_config(cli: &Cli) -> spinrig::RenderApiConfig {
    let token = cli
        .auth_token
        .clone()
        .or_else(|| std::env::var("SPINRIG_API_TOKEN").ok());

    let mut config = spinrig::RenderApiConfig::new(cli.api_url.clone());
    if let Some(token) = token {
        config = config.with_auth_token(token);
    }
    if let Some(env) = &cli.environment {
        config = config.with_environment(env.clone());
    }
    config
}

fn parse_parts(specs: &[String]) -> anyhow::Result<spinrig::PartsMap> {
    let mut parts = spinrig::PartsMap::new();
    for spec in specs {
        let (cat, id) = spec
            .split_once('=')
            .with_context(|| format!("part '{spec}' is not CATEGORY=ID"))?;
        let cat = spinrig::PartCategory::from_wire(cat)?;
        parts.entry(cat).or_default().push(id.to_string());
    }
    Ok(parts)
}

async fn cmd_frame(config: spinrig::RenderApiConfig, args: FrameArgs) -> anyhow::Result<()> {
    let config = if args.sync {
        config.with_protocol(spinrig::RenderProtocol::Sync)
    } else {
        config
    };
    let client = spinrig::RenderClient::new(config)?;

    let parts = parse_parts(&args.parts)?;
    let parts = (!parts.is_empty()).then_some(parts);
    let mut input = spinrig::RenderInput::normalize(parts, args.share_code.clone())?
        .with_format(spinrig::RenderFormat::Sprite);
    input.options.frame_quality = Some(args.quality.to_quality());

    let asset = spinrig::load_render(&client, &input).await?;
    if args.frame >= asset.sheet.total_frames {
        anyhow::bail!(
            "frame {} out of range (sheet has {})",
            args.frame,
            asset.sheet.total_frames
        );
    }

    let mut surface = spinrig::Surface::new(args.size, args.size)?;
    let settings = spinrig::CompositorSettings {
        clear_rgba: Some([18, 20, 28, 255]),
    };
    spinrig::draw_frame(
        &mut surface,
        &asset.image,
        asset.sheet,
        args.frame,
        args.zoom,
        &settings,
    )?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &surface.to_straight_rgba8(),
        surface.width,
        surface.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

async fn cmd_parts(config: spinrig::RenderApiConfig, args: PartsArgs) -> anyhow::Result<()> {
    let client = spinrig::RenderClient::new(config)?;
    let category = args
        .category
        .as_deref()
        .map(spinrig::PartCategory::from_wire)
        .transpose()?;

    let page = client
        .available_parts(category, args.limit, args.skip)
        .await?;
    for part in &page.data {
        let cat = part.category.map(|c| c.as_str()).unwrap_or("-");
        let name = part.name.as_deref().unwrap_or("");
        println!("{:<28} {:<12} {}", part.id, cat, name);
    }
    if let Some(total) = page.pagination.as_ref().and_then(|p| p.total) {
        eprintln!("{} of {} parts", page.data.len(), total);
    }
    Ok(())
}
