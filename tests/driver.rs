use std::fs;
use std::path::{Path, PathBuf};

use smartsdraw::config::Config;
use smartsdraw::driver::{png_path, run, DriverError, Settings, Summary};
use smartsdraw::toolkit::Renderer;
use tempfile::TempDir;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

const VALID: [&str; 8] = [
    "[#6X4:1]-[#6X4:2]-[#6X4:3]-[#6X4:4]",
    "[*:1]~[#7X3:2]-[#6:3]=[#8:4]",
    "c1ccccc1",
    "[#6:1]=[#6:2]",
    "[#1:1]-[#8:2]",
    "C(=O)O",
    "[#6:1]1:[#6]:[#6]:[#6]:[#6]:[#6]:1",
    "[!#1:1]@[#6:2]",
];

/// write `lines` to an input file in a fresh scratch directory and return
/// settings pointing into it
fn setup(lines: &[&str], preview_every: usize) -> (TempDir, Settings) {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("smarts.sma");
    let mut text = lines.join("\n");
    text.push('\n');
    fs::write(&input, text).unwrap();
    let settings = Settings {
        input,
        output_dir: dir.path().join("out_smarts"),
        preview_every,
        render: Config::base_render_options(),
    };
    (dir, settings)
}

fn run_batch(settings: &Settings) -> (Summary, String) {
    let mut out = Vec::new();
    let summary = run(settings, &Renderer::new(), &mut out).unwrap();
    (summary, String::from_utf8(out).unwrap())
}

/// the console lines that start a new pattern, as (ordinal, pattern) pairs
fn ordinal_lines(console: &str) -> Vec<(usize, String)> {
    console
        .lines()
        .filter_map(|line| {
            let (n, rest) = line.split_once(": ")?;
            Some((n.parse().ok()?, rest.to_owned()))
        })
        .collect()
}

fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let mut ret: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == ext))
        .collect();
    ret.sort();
    ret
}

#[test]
fn one_ordinal_per_line() {
    let (_dir, settings) = setup(&VALID, 0);
    let (summary, console) = run_batch(&settings);

    let want: Vec<_> = VALID
        .iter()
        .enumerate()
        .map(|(i, p)| (i + 1, p.to_string()))
        .collect();
    assert_eq!(ordinal_lines(&console), want);
    assert_eq!(
        summary,
        Summary {
            total: 8,
            rendered: 8,
            failed: 0,
            previews: 0,
        }
    );
    for i in 1..=VALID.len() {
        let png = fs::read(png_path(&settings.output_dir, i)).unwrap();
        assert!(png.starts_with(PNG_SIGNATURE));
    }
}

#[test]
fn failure_in_the_middle() {
    let mut lines: Vec<&str> =
        VALID.iter().cycle().take(25).copied().collect();
    lines[2] = "[#6:1]-[#6X4:2]-[#7";
    let (_dir, settings) = setup(&lines, 20);
    let (summary, console) = run_batch(&settings);

    assert_eq!(summary.total, 25);
    assert_eq!(summary.rendered, 24);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.previews, 1);

    let ordinals: Vec<_> =
        ordinal_lines(&console).iter().map(|p| p.0).collect();
    assert_eq!(ordinals, (1..=25).collect::<Vec<_>>());

    for i in 1..=25 {
        assert_eq!(png_path(&settings.output_dir, i).exists(), i != 3, "{i}");
    }

    let console: Vec<_> = console.lines().collect();
    let at = console.iter().position(|l| l.starts_with("3: ")).unwrap();
    assert!(console[at + 1].starts_with("  SMARTS loader: "));
    assert_eq!(console[at + 2], format!("4: {}", lines[3]));

    // the preview follows pattern 20 despite the earlier failure
    let header =
        format!("{}:", settings.output_dir.join("0020.svg").display());
    let at = console.iter().position(|&l| l == header).unwrap();
    assert_eq!(console[at - 2], format!("20: {}", lines[19]));
    assert_eq!(console[at - 1], "");
    assert_eq!(console[at + 1], "");
    assert!(console[at + 2].starts_with("<?xml"));
    assert!(console[at + 3].starts_with("<svg"));
    let end = console.iter().position(|&l| l == "</svg>").unwrap();
    assert_eq!(console[end + 1], format!("21: {}", lines[20]));

    assert!(files_with_extension(&settings.output_dir, "svg").is_empty());
    assert_eq!(files_with_extension(&settings.output_dir, "png").len(), 24);
}

#[test]
fn preview_counts_failures() {
    // every line fails, so no previews appear even though the counter passes
    // 20
    let lines = vec!["C1CC"; 21];
    let (_dir, settings) = setup(&lines, 20);
    let (summary, console) = run_batch(&settings);
    assert_eq!(summary.failed, 21);
    assert_eq!(summary.previews, 0);
    assert!(!console.contains("<svg"));

    // and with previews on every line, only the successes get one
    let (_dir, settings) = setup(&["C", "C1CC", "CC"], 1);
    let (summary, console) = run_batch(&settings);
    assert_eq!(summary.previews, 2);
    assert_eq!(console.matches("<svg").count(), 2);
    assert!(files_with_extension(&settings.output_dir, "svg").is_empty());
}

#[test]
fn blank_lines_are_patterns() {
    let (_dir, settings) = setup(&["C", "", "CC"], 0);
    let (summary, console) = run_batch(&settings);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.failed, 1);
    let console: Vec<_> = console.lines().collect();
    assert_eq!(console[0], "1: C");
    assert_eq!(console[1], "2: ");
    assert!(console[2].starts_with("  SMARTS loader: "));
    assert_eq!(console[3], "3: CC");
    assert!(!png_path(&settings.output_dir, 2).exists());
    assert!(png_path(&settings.output_dir, 3).exists());
}

#[test]
fn invalid_utf8_fails_one_line() {
    let (_dir, settings) = setup(&[], 0);
    fs::write(&settings.input, b"CC\n[#6]\xe9\nCO\n").unwrap();
    let (summary, console) = run_batch(&settings);

    assert_eq!(summary.total, 3);
    assert_eq!(summary.rendered, 2);
    assert_eq!(summary.failed, 1);
    let ordinals: Vec<_> =
        ordinal_lines(&console).iter().map(|p| p.0).collect();
    assert_eq!(ordinals, vec![1, 2, 3]);

    let console: Vec<_> = console.lines().collect();
    assert_eq!(console[1], "2: [#6]\u{fffd}");
    assert!(console[2].starts_with("  SMARTS loader: "));
    assert!(png_path(&settings.output_dir, 1).exists());
    assert!(!png_path(&settings.output_dir, 2).exists());
    assert!(png_path(&settings.output_dir, 3).exists());
}

#[test]
fn stale_output_is_overwritten() {
    let (_dir, settings) = setup(&VALID[..2], 0);
    fs::create_dir_all(&settings.output_dir).unwrap();
    let stale = png_path(&settings.output_dir, 1);
    fs::write(&stale, "stale").unwrap();
    fs::write(settings.output_dir.join("notes.txt"), "keep me").unwrap();

    run_batch(&settings);
    assert!(fs::read(&stale).unwrap().starts_with(PNG_SIGNATURE));
    assert!(settings.output_dir.join("notes.txt").exists());

    // and a second run over its own output is fine too
    let (summary, _) = run_batch(&settings);
    assert_eq!(summary.rendered, 2);
}

#[test]
fn nested_output_dir_is_created() {
    let (dir, mut settings) = setup(&["C"], 0);
    settings.output_dir = dir.path().join("a/b/out_smarts");
    run_batch(&settings);
    assert!(png_path(&settings.output_dir, 1).exists());
}

#[test]
fn missing_input() {
    let (dir, mut settings) = setup(&[], 0);
    settings.input = dir.path().join("nope.sma");
    let mut out = Vec::new();
    let err = run(&settings, &Renderer::new(), &mut out).unwrap_err();
    assert!(matches!(err, DriverError::ReadInput { .. }));
    assert!(out.is_empty());
}

#[test]
fn uncreatable_output_dir() {
    let (dir, mut settings) = setup(&["C"], 0);
    let blocker = dir.path().join("file");
    fs::write(&blocker, "").unwrap();
    settings.output_dir = blocker.join("out_smarts");
    let mut out = Vec::new();
    let err = run(&settings, &Renderer::new(), &mut out).unwrap_err();
    assert!(matches!(err, DriverError::CreateOutputDir { .. }));
    assert!(out.is_empty());
}
