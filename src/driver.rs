//! The batch renderer: draw every pattern in an input file to a numbered PNG,
//! reporting progress and per-line failures on a console writer.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::load_patterns;
use crate::toolkit::{self, OutputFormat, QueryMol, RenderOptions, Renderer};

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("failed to create output directory {path}: {source}")]
    CreateOutputDir { path: PathBuf, source: io::Error },

    #[error("failed to read patterns from {path}: {source}")]
    ReadInput { path: PathBuf, source: io::Error },

    #[error("failed to write to console: {0}")]
    Console(#[from] io::Error),
}

/// Everything a batch run needs, already resolved from the config file and
/// command line.
#[derive(Clone, Debug)]
pub struct Settings {
    /// The file of patterns, one per line.
    pub input: PathBuf,

    pub output_dir: PathBuf,

    /// Print an SVG preview every time the sampling counter reaches a multiple
    /// of this. 0 disables previews.
    pub preview_every: usize,

    /// Drawing settings shared by every pattern. The comment and format are
    /// filled in per pattern.
    pub render: RenderOptions,
}

/// An SVG drawing that is printed to the console but never saved.
#[derive(Debug, PartialEq)]
pub struct Preview {
    /// where the SVG would have gone, used as its console header
    pub path: PathBuf,
    pub svg: String,
}

#[derive(Debug, PartialEq)]
pub enum Outcome {
    Rendered {
        png: PathBuf,
        preview: Option<Preview>,
    },
    Failed {
        message: String,
    },
}

#[derive(Debug, Default, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub rendered: usize,
    pub failed: usize,
    pub previews: usize,
}

pub fn png_path(dir: impl AsRef<Path>, ordinal: usize) -> PathBuf {
    dir.as_ref().join(format!("{ordinal:04}.png"))
}

pub fn svg_path(dir: impl AsRef<Path>, ordinal: usize) -> PathBuf {
    dir.as_ref().join(format!("{ordinal:04}.svg"))
}

/// whether a pattern processed when the sampling counter is at `sample` gets a
/// preview
pub fn wants_preview(sample: usize, every: usize) -> bool {
    every > 0 && sample % every == 0
}

/// Draw a single `pattern` as image number `ordinal`. Any toolkit failure is
/// returned as [Outcome::Failed] rather than an error so that the caller can
/// carry on with the next pattern.
pub fn process_pattern(
    renderer: &Renderer,
    settings: &Settings,
    pattern: &str,
    ordinal: usize,
    sample: usize,
) -> Outcome {
    match draw(renderer, settings, pattern, ordinal, sample) {
        Ok((png, preview)) => Outcome::Rendered { png, preview },
        Err(e) => Outcome::Failed { message: e.message() },
    }
}

fn draw(
    renderer: &Renderer,
    settings: &Settings,
    pattern: &str,
    ordinal: usize,
    sample: usize,
) -> toolkit::Result<(PathBuf, Option<Preview>)> {
    let mut mol = QueryMol::from_smarts(pattern)?;
    mol.layout()?;

    let mut opts = RenderOptions {
        format: OutputFormat::Png,
        comment: Some(mol.smarts().to_owned()),
        ..settings.render.clone()
    };
    let png = png_path(&settings.output_dir, ordinal);
    renderer.render_to_file(&mol, &opts, &png)?;

    opts.format = OutputFormat::Svg;
    let mut preview = None;
    if wants_preview(sample, settings.preview_every) {
        let buf = renderer.render_to_buffer(&mol, &opts)?;
        preview = Some(Preview {
            path: svg_path(&settings.output_dir, ordinal),
            svg: String::from_utf8_lossy(&buf).into_owned(),
        });
    }
    Ok((png, preview))
}

/// Draw every line of `settings.input`, in order, writing progress to `out`.
/// Only a missing output directory that cannot be created, an unreadable input
/// file, or a broken console stops the run. Individual patterns that fail are
/// reported and skipped.
pub fn run(
    settings: &Settings,
    renderer: &Renderer,
    out: &mut impl Write,
) -> Result<Summary, DriverError> {
    std::fs::create_dir_all(&settings.output_dir).map_err(|source| {
        DriverError::CreateOutputDir {
            path: settings.output_dir.clone(),
            source,
        }
    })?;
    let patterns = load_patterns(&settings.input).map_err(|source| {
        DriverError::ReadInput {
            path: settings.input.clone(),
            source,
        }
    })?;
    info!(
        "drawing {} patterns from {} into {}",
        patterns.len(),
        settings.input.display(),
        settings.output_dir.display()
    );

    let mut summary = Summary::default();
    let mut ordinal = 1;
    let mut sample = 0;
    for pattern in &patterns {
        writeln!(out, "{ordinal}: {pattern}")?;
        sample += 1;
        match process_pattern(renderer, settings, pattern, ordinal, sample) {
            Outcome::Rendered { png, preview } => {
                debug!("{ordinal}: wrote {}", png.display());
                summary.rendered += 1;
                if let Some(Preview { path, svg }) = preview {
                    writeln!(out, "\n{}:\n", path.display())?;
                    writeln!(out, "{}", svg.trim_end())?;
                    summary.previews += 1;
                }
            }
            Outcome::Failed { message } => {
                debug!("{ordinal}: failed with {message}");
                writeln!(out, "  {message}")?;
                summary.failed += 1;
            }
        }
        summary.total += 1;
        ordinal += 1;
    }

    info!(
        "finished {} patterns: {} rendered, {} failed, {} previews",
        summary.total, summary.rendered, summary.failed, summary.previews
    );
    Ok(summary)
}
