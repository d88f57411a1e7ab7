use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dom_core::{render_to_png, Dom, NodeDescription, RenderConfig};
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Scene description (.json, or .rhai returning a description map)
    #[arg(value_name = "SCENE")]
    scene: PathBuf,

    /// Output PNG path
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// JSON file with width, height and background
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output width in pixels
    #[arg(long)]
    width: Option<i32>,

    /// Output height in pixels
    #[arg(long)]
    height: Option<i32>,

    /// Background color, e.g. "#202020" or "transparent"
    #[arg(long)]
    background: Option<String>,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogFormat {
    Pretty,
    Json,
}

fn init_logging(cli: &Cli) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(cli.log_level.to_string().parse()?)
        .from_env_lossy();

    let subscriber_builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match cli.log_format {
        LogFormat::Json => subscriber_builder.json().init(),
        LogFormat::Pretty => subscriber_builder.pretty().init(),
    }
    Ok(())
}

/// Config file values, then command line overrides.
fn render_config(cli: &Cli) -> Result<RenderConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => RenderConfig::default(),
    };
    if let Some(width) = cli.width {
        config.width = width;
    }
    if let Some(height) = cli.height {
        config.height = height;
    }
    if let Some(background) = &cli.background {
        config.background = background.clone();
    }
    Ok(config)
}

fn run(cli: &Cli) -> Result<()> {
    let output_path = cli.output.clone().unwrap_or_else(|| {
        let mut p = cli.scene.clone();
        p.set_extension("png");
        p
    });
    let config = render_config(cli)?;

    info!("Scene: {:?}", cli.scene);
    info!("Output: {:?}", output_path);
    info!(
        "Size: {}x{}, background {}",
        config.width, config.height, config.background
    );

    let description = NodeDescription::load(&cli.scene)
        .with_context(|| format!("loading scene {}", cli.scene.display()))?;
    let (dom, mut graph) = Dom::new();
    description.mount(&dom)?;

    let png = render_to_png(&mut graph, &config).context("rendering scene")?;
    fs::write(&output_path, png)
        .with_context(|| format!("writing {}", output_path.display()))?;
    info!("Render complete.");
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = init_logging(&cli) {
        eprintln!("Invalid log level: {}", e);
        std::process::exit(2);
    }
    if let Err(e) = run(&cli) {
        error!("Render failed: {:#}", e);
        std::process::exit(1);
    }
}
