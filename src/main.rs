mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ConvertArgs};
use img2stitch::{
    convert_thread_brand, load_image, Brand, PatternBuilder, PatternConfig, ThreadCatalog,
};
use std::path::Path;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let catalog = load_catalog(cli.catalog.as_deref())?;

    match cli.command {
        Commands::Convert(args) => run_convert(args, &catalog),
        Commands::ConvertThread { code, from, to } => run_convert_thread(&catalog, &code, &from, &to),
        Commands::Threads { brand } => run_threads(&catalog, brand.as_deref()),
    }
}

fn load_catalog(path: Option<&Path>) -> Result<ThreadCatalog> {
    match path {
        Some(path) => ThreadCatalog::load(path)
            .with_context(|| format!("Failed to load thread catalog {}", path.display())),
        None => Ok(ThreadCatalog::builtin()?),
    }
}

fn build_config(args: &ConvertArgs) -> Result<PatternConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => PatternConfig::default(),
    };

    if let Some(colors) = args.colors {
        config.max_colors = colors;
    }
    if let Some(brand) = &args.brand {
        config.thread_brand = brand.clone();
    }
    if let Some(aida) = args.aida {
        config.aida_count = aida;
    }
    if let Some(kind) = args.pattern_type {
        config.pattern_type = kind.into();
    }
    if args.dither {
        config.enable_dithering = true;
    }
    if args.enhance_contrast {
        config.enhance_contrast = true;
    }
    if let Some(sigma) = args.edge_blur {
        config.edge_blur_sigma = sigma;
    }
    if !args.inventory.is_empty() {
        config.use_inventory = true;
        config.inventory_ids.extend(args.inventory.iter().cloned());
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(w) = args.max_width {
        config.max_width = w;
    }
    if let Some(h) = args.max_height {
        config.max_height = h;
    }
    if args.target_width_cm.is_some() {
        config.target_width_cm = args.target_width_cm;
    }
    Ok(config)
}

fn run_convert(args: ConvertArgs, catalog: &ThreadCatalog) -> Result<()> {
    let config = build_config(&args)?;
    let output_path = args.output.clone().unwrap_or_else(|| {
        let mut path = args.input.clone();
        path.set_extension("json");
        path
    });

    println!(
        "Converting {} to {}...",
        args.input.display(),
        output_path.display()
    );

    let image_data = load_image(&args.input)?;
    let artifact = PatternBuilder::new(catalog).build(&image_data, &config)?;

    let json = if args.pretty {
        artifact.to_json_pretty()?
    } else {
        artifact.to_json()?
    };
    std::fs::write(&output_path, json)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    let d = &artifact.dimensions;
    println!(
        "Pattern {}: {}x{} stitches ({:.1} x {:.1} cm), {} colors, about {} minutes",
        artifact.pattern_id,
        d.width_stitches,
        d.height_stitches,
        d.width_cm,
        d.height_cm,
        artifact.color_palette.len(),
        artifact.estimated_time_minutes
    );
    for entry in &artifact.color_palette {
        println!(
            "  {}  {} {:<8} {:<28} {:>6} stitches  ΔE {:.2}",
            entry.symbol,
            entry.thread.brand,
            entry.thread.color_code,
            entry.thread.display_name(),
            entry.stitch_count,
            entry.delta_e
        );
    }
    println!("Conversion complete!");
    Ok(())
}

fn run_convert_thread(catalog: &ThreadCatalog, code: &str, from: &str, to: &str) -> Result<()> {
    let from: Brand = from.parse()?;
    let to: Brand = to.parse()?;
    let m = convert_thread_brand(catalog, code, from, to)?;
    println!(
        "{} {} -> {} {} ({}) {}  ΔE {:.2} ({:?})",
        from,
        code,
        m.thread.brand,
        m.thread.color_code,
        m.thread.display_name(),
        m.thread.hex(),
        m.delta_e,
        m.quality
    );
    Ok(())
}

fn run_threads(catalog: &ThreadCatalog, brand: Option<&str>) -> Result<()> {
    let threads = match brand {
        Some(name) => catalog.by_brand(name.parse()?),
        None => catalog.all().iter().collect(),
    };
    for t in &threads {
        println!(
            "{:<16} {:<8} {:<8} {} {}",
            t.thread_id,
            t.brand,
            t.color_code,
            t.hex(),
            t.display_name()
        );
    }
    println!("{} threads", threads.len());
    Ok(())
}
