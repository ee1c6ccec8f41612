use anyhow::Context;
use clap::{Parser, ValueEnum};
use image::{GrayImage, RgbImage};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use planeseg::{
    Method, ResultSink, SegmentationConfig, SegmentationError, Segmenter, Session,
    StageObserver,
};

#[derive(Parser)]
#[command(name = "planeseg")]
#[command(about = "Count plane-like regions in a still image")]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// Segmentation method to run
    #[arg(short, long, value_enum, default_value_t = MethodArg::Otsu)]
    method: MethodArg,

    /// Where to write the annotated image (with --method all, one file per method)
    #[arg(short, long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// JSON file overriding the default parameters
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Canny hysteresis low threshold
    #[arg(long)]
    canny_low: Option<f32>,

    /// Canny hysteresis high threshold
    #[arg(long)]
    canny_high: Option<f32>,

    /// Minimum region area in pixels for the pixel and otsu methods
    #[arg(long)]
    min_area: Option<u32>,

    /// Save every intermediate stage to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MethodArg {
    Canny,
    Pixel,
    Otsu,
    All,
}

impl MethodArg {
    fn methods(self) -> Vec<Method> {
        match self {
            MethodArg::Canny => vec![Method::Canny],
            MethodArg::Pixel => vec![Method::PixelDifference],
            MethodArg::Otsu => vec![Method::Otsu],
            MethodArg::All => Method::ALL.to_vec(),
        }
    }
}

/// Writes every stage of a run to `<dir>/<method>/NN_<stage>.png`
struct DebugDump {
    dir: PathBuf,
}

impl DebugDump {
    /// The directory must be empty or non-existent
    fn new(dir: PathBuf) -> anyhow::Result<Self> {
        if dir.exists() {
            let entries = std::fs::read_dir(&dir)?;
            if entries.count() > 0 {
                anyhow::bail!("Debug directory is not empty: {}", dir.display());
            }
        } else {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(Self { dir })
    }

    fn for_method(&self, method: Method) -> anyhow::Result<MethodDump> {
        let dir = self.dir.join(method.name());
        std::fs::create_dir_all(&dir)?;
        Ok(MethodDump { dir })
    }
}

struct MethodDump {
    dir: PathBuf,
}

impl StageObserver for MethodDump {
    fn on_stage(&mut self, index: usize, name: &str, image: &GrayImage) -> planeseg::Result<()> {
        let slug = name.to_lowercase().replace(' ', "_");
        let path = self.dir.join(format!("{:02}_{}.png", index, slug));
        image.save(&path).map_err(to_io)?;
        tracing::debug!("Debug: saved {}", path.display());
        Ok(())
    }
}

/// Prints the summary and optionally saves the annotated image
struct OutputSink {
    out: Option<PathBuf>,
}

impl ResultSink for OutputSink {
    fn on_result_ready(&mut self, image: &RgbImage, message: &str) -> planeseg::Result<()> {
        println!("{}", message);
        if let Some(path) = &self.out {
            image.save(path).map_err(to_io)?;
            println!("Annotated image written to {}", path.display());
        }
        Ok(())
    }
}

fn to_io(err: image::ImageError) -> SegmentationError {
    SegmentationError::Io(std::io::Error::other(err))
}

/// `plane.png` -> `plane_otsu.png`
fn suffixed(path: &Path, method: Method) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, method.name(), ext.to_string_lossy()),
        None => format!("{}_{}", stem, method.name()),
    };
    path.with_file_name(name)
}

fn load_config(args: &Cli) -> anyhow::Result<SegmentationConfig> {
    let mut config = match &args.config {
        Some(path) => SegmentationConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SegmentationConfig::default(),
    };

    if let Some(low) = args.canny_low {
        config.canny.low_threshold = low;
    }
    if let Some(high) = args.canny_high {
        config.canny.high_threshold = high;
    }
    if let Some(min_area) = args.min_area {
        config.pixel.filter.min_area = min_area;
        config.otsu.filter.min_area = min_area;
    }

    config.validate()?;
    Ok(config)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose);

    let segmenter = Segmenter::new(load_config(&args)?)?;
    if args.dump_config {
        println!("{}", serde_json::to_string_pretty(segmenter.config())?);
        return Ok(());
    }

    let mut session = Session::new(segmenter);
    tracing::info!("Loading image: {}", args.image_path.display());
    session.load(&args.image_path)?;
    if let Some(input) = session.input() {
        tracing::info!("Image loaded: {}x{}", input.width(), input.height());
    }

    let dump = args.debug_out.clone().map(DebugDump::new).transpose()?;
    let methods = args.method.methods();

    for method in methods.iter().copied() {
        let out = match &args.out {
            Some(path) if methods.len() > 1 => Some(suffixed(path, method)),
            other => other.clone(),
        };
        let mut sink = OutputSink { out };

        if methods.len() > 1 {
            println!("\n=== {} ===", method);
        }

        match &dump {
            Some(dump) => {
                let mut observer = dump.for_method(method)?;
                session.process_observed(method, &mut sink, &mut observer)?;
            }
            None => {
                session.process(method, &mut sink)?;
            }
        }
    }

    Ok(())
}
