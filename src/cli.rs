use clap::{Parser, Subcommand, ValueEnum};
use img2stitch::PatternType;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "img2stitch")]
#[command(about = "Convert images into cross-stitch patterns using real thread colors")]
#[command(version)]
pub struct Cli {
    /// Thread catalog JSON (default: built-in catalog)
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert an image to a pattern JSON file
    Convert(ConvertArgs),

    /// Find the closest thread of another brand
    ConvertThread {
        /// Color code in the source brand (e.g. 310)
        code: String,

        /// Source brand
        #[arg(long, default_value = "DMC")]
        from: String,

        /// Target brand
        #[arg(long)]
        to: String,
    },

    /// List catalog threads
    Threads {
        /// Only this brand
        #[arg(short, long)]
        brand: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PatternKind {
    CrossStitch,
    Outline,
}

impl From<PatternKind> for PatternType {
    fn from(kind: PatternKind) -> Self {
        match kind {
            PatternKind::CrossStitch => PatternType::CrossStitch,
            PatternKind::Outline => PatternType::Outline,
        }
    }
}

#[derive(clap::Args)]
pub struct ConvertArgs {
    /// Input image file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output JSON file (default: input with .json extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pattern config JSON; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Maximum number of thread colors
    #[arg(short, long)]
    pub colors: Option<usize>,

    /// Thread brand (DMC, Anchor, Madeira, Ariadna)
    #[arg(short, long)]
    pub brand: Option<String>,

    /// Aida count: 14, 16, 18 or 20 stitches per inch
    #[arg(short, long)]
    pub aida: Option<u32>,

    /// Pattern type
    #[arg(short = 't', long, value_enum)]
    pub pattern_type: Option<PatternKind>,

    /// Enable Floyd-Steinberg dithering
    #[arg(short, long)]
    pub dither: bool,

    /// Equalize lightness (CLAHE) before quantizing
    #[arg(long)]
    pub enhance_contrast: bool,

    /// Blur sigma applied before outline edge detection (0 disables)
    #[arg(long)]
    pub edge_blur: Option<f32>,

    /// Comma-separated thread ids you own (e.g. dmc_310,dmc_b5200)
    #[arg(long, value_delimiter = ',')]
    pub inventory: Vec<String>,

    /// Random seed for reproducible palettes
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Maximum width in stitches
    #[arg(long)]
    pub max_width: Option<u32>,

    /// Maximum height in stitches
    #[arg(long)]
    pub max_height: Option<u32>,

    /// Target width on fabric in centimeters; overrides --max-width
    #[arg(long)]
    pub target_width_cm: Option<f64>,

    /// Pretty-print the output JSON
    #[arg(long)]
    pub pretty: bool,
}
