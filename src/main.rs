// this_file: src/main.rs
//! imgbridge CLI - text measurement, rendering and JPEG XL probing

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use imgbridge::{
    capabilities, check_signature, logging, Config, Direction, Font, FontSource, LayoutEngine,
    PixelFormat, Raster, RenderMode, Signature, TextOptions,
};
use log::info;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// imgbridge - text layout and JPEG XL decoding glue
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Set log level (error, warn, info, debug, trace); debug builds default to debug
    #[arg(short = 'l', long, global = true)]
    log_level: Option<String>,

    /// Enable quiet mode (only errors)
    #[arg(short = 'q', long, global = true, conflicts_with = "log_level")]
    quiet: bool,

    /// JSON configuration file; flags override its values
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FontArgs {
    /// Font file
    font: PathBuf,

    /// Pixel size
    #[arg(short, long)]
    size: Option<f32>,

    /// Face index within a collection
    #[arg(long)]
    index: Option<u32>,

    /// Charmap encoding tag (unic, symb, armn, ...)
    #[arg(long)]
    encoding: Option<String>,

    /// Force basic layout even when complex shaping is available
    #[arg(long)]
    basic: bool,
}

#[derive(Args)]
struct TextArgs {
    /// Text to lay out
    text: String,

    /// Render 1-bit glyphs
    #[arg(long)]
    mono: bool,

    /// Writing direction (ltr, rtl, ttb)
    #[arg(short, long)]
    direction: Option<String>,

    /// OpenType feature such as liga, -kern or aalt=2 (repeatable)
    #[arg(short = 'F', long = "feature")]
    features: Vec<String>,

    /// BCP 47 language tag
    #[arg(long)]
    language: Option<String>,

    /// Two-character anchor such as la or ms
    #[arg(short, long)]
    anchor: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the size of a text and its offset from the anchor as JSON
    Measure {
        #[command(flatten)]
        font: FontArgs,

        #[command(flatten)]
        text: TextArgs,
    },

    /// Render a text into a grayscale PNG
    Render {
        #[command(flatten)]
        font: FontArgs,

        #[command(flatten)]
        text: TextArgs,

        /// Output PNG file
        #[arg(short, long)]
        output: PathBuf,

        /// Stroke radius in pixels; 0 fills the glyphs
        #[arg(long, default_value_t = 0)]
        stroke: u32,
    },

    /// List variation axes and named instances as JSON
    Variations {
        #[command(flatten)]
        font: FontArgs,
    },

    /// Check whether a file starts with a JPEG XL signature
    Signature {
        /// File to check
        file: PathBuf,
    },

    /// Show the text shaping engine in use
    Capabilities,

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = cli
        .log_level
        .as_deref()
        .unwrap_or_else(|| logging::default_level());
    logging::init_logging(log_level, cli.quiet);

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Measure { font, text } => {
            let font = open_font(&font, &config)?;
            let extent = font.measure(&text.text, &text_options(&text)?)?;
            println!("{}", serde_json::to_string_pretty(&extent)?);
        }
        Commands::Render {
            font,
            text,
            output,
            stroke,
        } => {
            let font = open_font(&font, &config)?;
            render_png(&font, &text, stroke, &output)?;
        }
        Commands::Variations { font } => {
            let font = open_font(&font, &config)?;
            let report = serde_json::json!({
                "axes": font.variation_axes()?,
                "instances": font.named_instances()?,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Signature { file } => {
            let signature = read_signature(&file)?;
            let name = match signature {
                Some(Signature::Codestream) => "codestream",
                Some(Signature::Container) => "container",
                None => "none",
            };
            println!("{}", name);
        }
        Commands::Capabilities => {
            let report = serde_json::json!({
                "version": imgbridge::VERSION,
                "shaping": capabilities::shaping(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Version => {
            println!("imgbridge version {}", imgbridge::VERSION);
            println!("Text layout and JPEG XL decoding glue");
            println!("Shaping engine: {}", capabilities::shaping().engine);
        }
    }

    Ok(())
}

fn open_font(args: &FontArgs, config: &Config) -> Result<Font> {
    let mut options = config.font.clone();
    if let Some(size) = args.size {
        options.size = size;
    }
    if let Some(index) = args.index {
        options.index = index;
    }
    if args.encoding.is_some() {
        options.encoding = args.encoding.clone();
    }
    if args.basic {
        options.layout_engine = LayoutEngine::Basic;
    }

    let font = Font::open(FontSource::Path(args.font.clone()), &options)
        .with_context(|| format!("failed to open font {}", args.font.display()))?;
    info!(
        "Opened {} at {}px with {:?} layout",
        args.font.display(),
        font.size(),
        font.layout_engine()
    );
    Ok(font)
}

fn text_options(args: &TextArgs) -> Result<TextOptions> {
    let mut options = TextOptions::new();
    if args.mono {
        options = options.mode(RenderMode::Mono);
    }
    if let Some(direction) = &args.direction {
        options = options.direction(direction.parse::<Direction>()?);
    }
    if !args.features.is_empty() {
        options = options.features(args.features.iter().cloned());
    }
    if let Some(language) = &args.language {
        options = options.language(language.clone());
    }
    if let Some(anchor) = &args.anchor {
        options = options.anchor(anchor.clone());
    }
    Ok(options)
}

/// Measure, allocate a raster with room for the stroke, render and save.
fn render_png(font: &Font, args: &TextArgs, stroke: u32, output: &Path) -> Result<()> {
    let options = text_options(args)?;
    let extent = font.measure(&args.text, &options)?;
    let width = (extent.width.max(0) as u32 + 2 * stroke).max(1);
    let height = (extent.height.max(0) as u32 + 2 * stroke).max(1);

    let mut raster = Raster::new(PixelFormat::L, width, height);
    font.render(&args.text, &mut raster, &options, stroke)?;

    let image = image::GrayImage::from_raw(width, height, raster.into_data())
        .context("raster size does not match its dimensions")?;
    image
        .save(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!("Wrote {}x{} image to {}", width, height, output.display());
    Ok(())
}

fn read_signature(path: &Path) -> Result<Option<Signature>> {
    let mut prefix = Vec::with_capacity(imgbridge::codec::CONTAINER_SIGNATURE.len());
    File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .take(imgbridge::codec::CONTAINER_SIGNATURE.len() as u64)
        .read_to_end(&mut prefix)?;
    Ok(check_signature(&prefix)?)
}
