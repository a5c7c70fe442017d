use std::path::PathBuf;

use clap::Parser;
use log::trace;
use smartsdraw::config::Config;
use smartsdraw::driver::run;
use smartsdraw::toolkit::Renderer;

#[derive(Parser)]
struct Cli {
    /// A TOML file with run and drawing settings. Flags given on the command
    /// line take precedence over it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// The directory containing the test data. Defaults to `data`.
    #[arg(short, long)]
    data_root: Option<PathBuf>,

    /// The file of SMARTS patterns to draw, relative to the data root.
    /// Defaults to `molecules/smarts.sma`.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Where to write the numbered PNG files. Defaults to `out_smarts`.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Print an SVG preview for every Nth pattern, or never if 0. Defaults to
    /// 20.
    #[arg(short, long)]
    preview_every: Option<usize>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => {
            trace!("loading config from {}", path.display());
            Config::load(path)?
        }
        None => Config::default(),
    };
    if let Some(d) = cli.data_root {
        config.data_root = d;
    }
    if let Some(i) = cli.input {
        config.input = i;
    }
    if let Some(o) = cli.output_dir {
        config.output_dir = o;
    }
    if let Some(p) = cli.preview_every {
        config.preview_every = p;
    }

    trace!("loading fonts");
    let renderer = Renderer::new();
    let stdout = std::io::stdout();
    run(&config.settings(), &renderer, &mut stdout.lock())?;
    Ok(())
}
