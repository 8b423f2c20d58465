use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use doodlefit::kurbo::Point;
use doodlefit::{
    analyze_batch, classify_batch, complete_curve, complete_mask_staged, detect_shapes, io,
    load_gray, recover_intensity, render, Polyline, PrimitiveShape, RasterMask, RegularizeConfig,
    SymmetryReport,
};
use log::info;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "doodlefit", about = "Freehand curves and scanned masks to canonical geometry")]
struct Cli {
    /// JSON preset; flags below override individual fields
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify every polyline of a point file and export the result
    Regularize {
        /// Point file (path_id, subpath_id, x, y per row)
        #[arg(short, long)]
        input: PathBuf,

        /// Output SVG path
        #[arg(short, long)]
        output: PathBuf,

        /// JSON report of shapes and symmetry
        #[arg(long)]
        report: Option<PathBuf>,

        /// Geometric tolerance of the classifier
        #[arg(short, long)]
        tolerance: Option<f64>,

        /// Verify ellipse, rectangle and polygon fits against the tolerance
        #[arg(long)]
        strict: bool,

        /// Replace each outline with its convex hull
        #[arg(long)]
        complete: bool,
    },

    /// Detect every shape in a point file or raster image
    Detect {
        /// Point file (.csv) or image (PNG, JPEG, BMP)
        #[arg(short, long)]
        input: PathBuf,

        /// Overlay PNG path
        #[arg(short, long)]
        output: PathBuf,

        /// Scale applied when rasterizing a point file
        #[arg(long, default_value = "1.0")]
        scale: f64,

        /// JSON list of detected shapes
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Fill occluded gaps in a binary mask
    Complete {
        /// Mask or grayscale image
        #[arg(short, long)]
        input: PathBuf,

        /// Completed mask PNG path
        #[arg(short, long)]
        output: PathBuf,

        /// Write the source intensities inside the completed mask here
        #[arg(long)]
        recovered: Option<PathBuf>,

        /// Foreground brightness threshold (0-255)
        #[arg(long)]
        threshold: Option<u8>,

        /// Union with the filled convex hull of each contour
        #[arg(long)]
        hull: bool,
    },
}

#[derive(Serialize)]
struct ShapeEntry<'a> {
    path: usize,
    subpath: usize,
    shape: &'a PrimitiveShape,
    symmetry: Option<SymmetryReport>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => RegularizeConfig::default(),
    };

    match cli.command {
        Command::Regularize {
            input,
            output,
            report,
            tolerance,
            strict,
            complete,
        } => {
            if let Some(t) = tolerance {
                config.geometric_tolerance = t.max(0.0);
            }
            if strict {
                config.strict = RegularizeConfig::strict().strict;
            }
            regularize(&input, &output, report.as_deref(), complete, &config)
        }
        Command::Detect {
            input,
            output,
            scale,
            report,
        } => detect(&input, &output, scale, report.as_deref(), &config),
        Command::Complete {
            input,
            output,
            recovered,
            threshold,
            hull,
        } => {
            if let Some(t) = threshold {
                config.morphology.threshold = t;
            }
            config.morphology.hull_union |= hull;
            complete(&input, &output, recovered.as_deref(), &config)
        }
    }
}

fn regularize(
    input: &Path,
    output: &Path,
    report: Option<&Path>,
    complete: bool,
    config: &RegularizeConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let paths = io::read_paths(input)?;

    // Flatten with (path, subpath) tags so order can be restored after the batch.
    let tags: Vec<(usize, usize)> = paths
        .iter()
        .enumerate()
        .flat_map(|(i, group)| (0..group.len()).map(move |j| (i, j)))
        .collect();
    let polylines: Vec<Polyline> = paths.iter().flatten().cloned().collect();

    let shapes = classify_batch(&polylines, config);
    let symmetry = analyze_batch(&shapes, &config.symmetry);

    let mut regularized: Vec<io::PathGroup> = vec![Vec::new(); paths.len()];
    for (&(i, _), shape) in tags.iter().zip(&shapes) {
        let mut outline = shape.outline();
        if complete {
            outline = complete_curve(&outline);
        }
        if shape.is_closed() {
            if let Some(&first) = outline.first() {
                outline.push(first);
            }
        }
        regularized[i].push(Polyline::new(outline)?);
    }
    io::write_svg(&regularized, output)?;

    let mut counts = std::collections::BTreeMap::new();
    for shape in &shapes {
        *counts.entry(shape.kind()).or_insert(0usize) += 1;
    }
    for (kind, n) in &counts {
        info!("{:?}: {}", kind, n);
    }

    if let Some(report_path) = report {
        let entries: Vec<ShapeEntry> = tags
            .iter()
            .zip(&shapes)
            .zip(&symmetry)
            .map(|((&(path, subpath), shape), sym)| ShapeEntry {
                path,
                subpath,
                shape,
                symmetry: *sym,
            })
            .collect();
        std::fs::write(report_path, serde_json::to_string_pretty(&entries)?)?;
        info!("wrote {}", report_path.display());
    }
    Ok(())
}

fn detect(
    input: &Path,
    output: &Path,
    scale: f64,
    report: Option<&Path>,
    config: &RegularizeConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let is_csv = input
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let image = if is_csv {
        let polylines: Vec<Polyline> = io::read_paths(input)?.into_iter().flatten().collect();
        let extent = polylines
            .iter()
            .flat_map(|p| p.points())
            .fold(Point::ZERO, |m, p| Point::new(m.x.max(p.x), m.y.max(p.y)));
        let size = (
            ((extent.x * scale * 1.1).ceil() as u32).max(1),
            ((extent.y * scale * 1.1).ceil() as u32).max(1),
        );
        render::rasterize(&polylines, scale, size)?
    } else {
        load_gray(input)?
    };

    let detected = detect_shapes(&image, &config.detection);
    let shapes: Vec<PrimitiveShape> = detected.into_values().flatten().collect();
    let symmetry = analyze_batch(&shapes, &config.symmetry);
    let overlay: Vec<(PrimitiveShape, Option<SymmetryReport>)> =
        shapes.into_iter().zip(symmetry).collect();
    render::overlay_png(&image, &overlay, 1.0, output)?;

    if let Some(report_path) = report {
        let entries: Vec<ShapeEntry> = overlay
            .iter()
            .enumerate()
            .map(|(i, (shape, sym))| ShapeEntry {
                path: i,
                subpath: 0,
                shape,
                symmetry: *sym,
            })
            .collect();
        std::fs::write(report_path, serde_json::to_string_pretty(&entries)?)?;
        info!("wrote {}", report_path.display());
    }
    Ok(())
}

fn complete(
    input: &Path,
    output: &Path,
    recovered: Option<&Path>,
    config: &RegularizeConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let gray = load_gray(input)?;
    let mask = RasterMask::from_gray(&gray, config.morphology.threshold);
    let stages = complete_mask_staged(&mask, &config.morphology);

    stages.completed.as_image().save(output)?;
    info!("wrote {}", output.display());

    if let Some(path) = recovered {
        recover_intensity(&gray, &stages.completed)?.save(path)?;
        info!("wrote {}", path.display());
    }
    Ok(())
}
