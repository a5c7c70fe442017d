//! draw a single SMARTS pattern to a PNG or SVG file, picking the format from
//! the file extension

use smartsdraw::config::Config;
use smartsdraw::toolkit::{OutputFormat, QueryMol, RenderOptions, Renderer};

fn main() {
    env_logger::init();

    let args: Vec<_> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: render <pattern> <output.png|output.svg>");
        std::process::exit(1);
    }
    let Some(format) = OutputFormat::from_path(&args[2]) else {
        eprintln!("unknown image format for {}", args[2]);
        std::process::exit(1);
    };

    let mut mol = match QueryMol::from_smarts(&args[1]) {
        Ok(mol) => mol,
        Err(e) => {
            eprintln!("{}", e.message());
            std::process::exit(1);
        }
    };
    let opts = RenderOptions {
        format,
        comment: Some(mol.smarts().to_owned()),
        ..Config::base_render_options()
    };
    let res = mol
        .layout()
        .and_then(|_| Renderer::new().render_to_file(&mol, &opts, &args[2]));
    if let Err(e) = res {
        eprintln!("{}", e.message());
        std::process::exit(1);
    }
}
