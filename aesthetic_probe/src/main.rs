use aesthetic_vision::core_modules::quad_tree::DecompositionTree;
use aesthetic_vision::{
    AestheticPipeline, AnalysisConfig, AnalysisMethod, MetricThresholds, ParallelPipeline,
    analyze_concurrently,
};
use anyhow::{Context, Result, bail};
use clap::Parser;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

const OVERLAY_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Measure the visual aesthetics of still images and print the report as JSON.
#[derive(Parser, Debug)]
#[command(name = "aesthetic-probe", version, about)]
struct Cli {
    /// Images to analyze; more than one runs them on the worker pool
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Analysis method: fast or complete
    #[arg(long)]
    method: Option<AnalysisMethod>,

    /// Analyze at the original size instead of resizing
    #[arg(long)]
    no_resize: bool,

    /// Working width when resizing
    #[arg(long)]
    width: Option<u32>,

    /// Working height when resizing
    #[arg(long)]
    height: Option<u32>,

    /// Standard deviation at or below which a block stays whole
    #[arg(long)]
    min_std: Option<f64>,

    /// Side length at or below which a block stays whole
    #[arg(long)]
    min_size: Option<u32>,

    /// Number of halvings compared by self-similarity
    #[arg(long)]
    max_level: Option<u32>,

    /// Smallest layout region kept, in pixels
    #[arg(long)]
    min_area: Option<u64>,

    /// Standard deviation threshold for symmetry only (preset 5)
    #[arg(long)]
    symmetry_min_std: Option<f64>,

    /// Side length threshold for symmetry only (preset 20)
    #[arg(long)]
    symmetry_min_size: Option<u32>,

    /// Write the working image with every quad-tree leaf outlined (single image only)
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Standard deviation threshold of the overlay tree
    #[arg(long, default_value_t = MetricThresholds::QUADTREE_OVERLAY.min_std)]
    overlay_min_std: f64,

    /// Side length threshold of the overlay tree
    #[arg(long, default_value_t = MetricThresholds::QUADTREE_OVERLAY.min_size)]
    overlay_min_size: u32,

    /// SeetaFace model used for face detection
    #[cfg(feature = "rustface")]
    #[arg(long)]
    face_model: Option<PathBuf>,

    /// Debug-level logging unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// File configuration (or defaults) with command-line overrides applied.
    fn analysis_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_json_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => AnalysisConfig::default(),
        };
        if let Some(method) = self.method {
            config.method = method;
        }
        if self.no_resize {
            config.resize = false;
        }
        if let Some(width) = self.width {
            config.target_size.0 = width;
        }
        if let Some(height) = self.height {
            config.target_size.1 = height;
        }
        if let Some(min_std) = self.min_std {
            config.min_std = min_std;
        }
        if let Some(min_size) = self.min_size {
            config.min_size = min_size;
        }
        if let Some(max_level) = self.max_level {
            config.max_level = max_level;
        }
        if let Some(min_area) = self.min_area {
            config.min_area = min_area;
        }
        if self.symmetry_min_std.is_some() || self.symmetry_min_size.is_some() {
            let base = config
                .symmetry_thresholds
                .unwrap_or(MetricThresholds::STANDALONE_SYMMETRY);
            config.symmetry_thresholds = Some(MetricThresholds::new(
                self.symmetry_min_std.unwrap_or(base.min_std),
                self.symmetry_min_size.unwrap_or(base.min_size),
            ));
        }
        config.validate()?;
        Ok(config)
    }

    fn overlay_thresholds(&self) -> Result<MetricThresholds> {
        let thresholds = MetricThresholds::new(self.overlay_min_std, self.overlay_min_size);
        if !thresholds.min_std.is_finite() || thresholds.min_std < 0.0 {
            bail!("--overlay-min-std must be a finite value >= 0, got {}", thresholds.min_std);
        }
        if thresholds.min_size < 1 {
            bail!("--overlay-min-size must be at least 1");
        }
        Ok(thresholds)
    }

    fn pipeline(&self) -> Result<AestheticPipeline> {
        let pipeline = AestheticPipeline::new(self.analysis_config()?)?;
        #[cfg(feature = "rustface")]
        let pipeline = match &self.face_model {
            Some(model) => pipeline.with_face_detector(std::sync::Arc::new(
                aesthetic_vision::RustfaceDetector::new(model),
            )),
            None => pipeline,
        };
        Ok(pipeline)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Argument Parsing & Logging ---
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // --- 2. Pipeline Initialization ---
    let pipeline = cli.pipeline()?;
    let overlay_thresholds = cli.overlay_thresholds()?;
    if cli.overlay.is_some() && cli.images.len() > 1 {
        bail!("--overlay needs exactly one image");
    }

    // --- 3. Analysis ---
    let output = if let [path] = cli.images.as_slice() {
        let image = image::open(path).with_context(|| format!("opening {}", path.display()))?;
        let report = analyze_concurrently(&pipeline, &image).await?;

        if let Some(overlay_path) = &cli.overlay {
            let working = pipeline.working_image(&image)?;
            let tree = pipeline.decompose(&working, overlay_thresholds);
            write_overlay(working, &tree, overlay_path)?;
        }
        serde_json::to_value(&report)?
    } else {
        let mut images = Vec::with_capacity(cli.images.len());
        for path in &cli.images {
            images.push(image::open(path).with_context(|| format!("opening {}", path.display()))?);
        }
        let parallel = ParallelPipeline::new(pipeline);
        info!(images = images.len(), workers = parallel.worker_count(), "analyzing batch");
        let results = parallel.analyze_batch(images).await;

        let entries: Vec<serde_json::Value> = cli
            .images
            .iter()
            .zip(results)
            .map(|(path, result)| match result {
                Ok(report) => json!({ "path": path, "report": report }),
                Err(err) => json!({ "path": path, "error": err.to_string() }),
            })
            .collect();
        serde_json::Value::Array(entries)
    };

    // --- 4. Output ---
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Outlines every leaf of `tree` on `canvas` and saves it as PNG.
fn write_overlay(mut canvas: RgbImage, tree: &DecompositionTree, path: &Path) -> Result<()> {
    draw_leaves(&mut canvas, tree);
    canvas
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("writing overlay to {}", path.display()))?;
    info!(path = %path.display(), leaves = tree.leaf_count(), "overlay written");
    Ok(())
}

fn draw_leaves(canvas: &mut RgbImage, tree: &DecompositionTree) {
    for leaf in tree.leaves() {
        let block = leaf.block;
        if block.is_empty() {
            continue;
        }
        let rect = Rect::at(block.x as i32, block.y as i32).of_size(block.width, block.height);
        draw_hollow_rect_mut(canvas, rect, OVERLAY_COLOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aesthetic_vision::core_modules::intensity_field::IntensityField;
    use aesthetic_vision::core_modules::quad_tree::decompose;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "aesthetic-probe",
            "photo.png",
            "--method",
            "fast",
            "--no-resize",
            "--min-size",
            "8",
        ]);
        let config = cli.analysis_config().unwrap();
        assert_eq!(config.method, AnalysisMethod::Fast);
        assert!(!config.resize);
        assert_eq!(config.min_size, 8);
        assert_eq!(config.min_std, 10.0);
    }

    #[test]
    fn invalid_flag_values_are_rejected() {
        let cli = Cli::parse_from(["aesthetic-probe", "photo.png", "--max-level", "0"]);
        assert!(cli.analysis_config().is_err());
        let cli = Cli::parse_from(["aesthetic-probe", "photo.png", "--overlay-min-size", "0"]);
        assert!(cli.overlay_thresholds().is_err());
    }

    #[test]
    fn symmetry_flags_fill_from_the_preset() {
        let cli = Cli::parse_from(["aesthetic-probe", "photo.png"]);
        assert_eq!(cli.analysis_config().unwrap().symmetry_thresholds, None);

        let cli = Cli::parse_from(["aesthetic-probe", "photo.png", "--symmetry-min-size", "32"]);
        let config = cli.analysis_config().unwrap();
        assert_eq!(config.symmetry_thresholds, Some(MetricThresholds::new(5.0, 32)));
        assert_eq!(config.min_size, 20);
    }

    #[test]
    fn overlay_has_its_own_thresholds() {
        let cli = Cli::parse_from(["aesthetic-probe", "photo.png", "--min-std", "3"]);
        assert_eq!(cli.overlay_thresholds().unwrap(), MetricThresholds::QUADTREE_OVERLAY);

        let cli = Cli::parse_from([
            "aesthetic-probe",
            "photo.png",
            "--overlay-min-std",
            "7.5",
            "--overlay-min-size",
            "12",
        ]);
        assert_eq!(cli.overlay_thresholds().unwrap(), MetricThresholds::new(7.5, 12));
    }

    #[test]
    fn overlay_outlines_split_blocks() {
        let image = RgbImage::from_fn(32, 32, |x, _| {
            if x < 16 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) }
        });
        let tree = decompose(&IntensityField::from_rgb(&image), 5.0, 4);
        assert!(tree.leaf_count() > 1);

        let mut canvas = image.clone();
        draw_leaves(&mut canvas, &tree);
        assert_eq!(*canvas.get_pixel(0, 0), OVERLAY_COLOR);
        assert_eq!(*canvas.get_pixel(16, 5), OVERLAY_COLOR);
        assert_eq!(*canvas.get_pixel(8, 8), Rgb([0, 0, 0]));
    }

    #[test]
    fn overlay_is_written_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaves.png");
        let image = RgbImage::from_pixel(10, 10, Rgb([50, 50, 50]));
        let tree = decompose(&IntensityField::from_rgb(&image), 10.0, 2);
        write_overlay(image, &tree, &path).unwrap();
        assert_eq!(image::open(&path).unwrap().width(), 10);
    }
}
