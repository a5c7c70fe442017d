//! Drawing query molecules. Structures are always drawn to SVG first; PNG
//! output rasterizes that SVG with resvg.

use std::{
    fmt::{self, Write},
    path::Path,
    str::FromStr,
};

use log::trace;
use serde::Deserialize;

use super::{
    elements, layout::bounds, BondOrders, Point, QueryBond, QueryMol, Result,
    ToolkitError,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Png,
    Svg,
}

impl OutputFormat {
    /// guess the format from the extension of `path`
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?;
        ext.parse().ok()
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "svg" => Ok(Self::Svg),
            _ => Err(format!("unknown output format {s:?}")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid color {0:?}, expected three comma-separated components")]
pub struct ParseColorError(String);

/// An RGB color with components in [0, 1]. Parsed from strings like
/// `"0, 0.3, 0.5"`, or `"255, 255, 255"` when any component is larger than 1.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    fn to_svg(self) -> String {
        let c = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("rgb({},{},{})", c(self.r), c(self.g), c(self.b))
    }
}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let err = || ParseColorError(s.to_owned());
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| err())?;
        let &[r, g, b] = parts.as_slice() else {
            return Err(err());
        };
        if [r, g, b].iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(err());
        }
        if [r, g, b].iter().all(|&v| v <= 1.0) {
            return Ok(Self::new(r, g, b));
        }
        if [r, g, b].iter().any(|&v| v > 255.0) {
            return Err(err());
        }
        Ok(Self::new(r / 255.0, g / 255.0, b / 255.0))
    }
}

impl TryFrom<String> for Color {
    type Error = ParseColorError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// Everything that affects how a single image is drawn. A fresh value should
/// be built for each render call, so that nothing leaks from one image into the
/// next.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderOptions {
    pub format: OutputFormat,

    /// fill color behind the structure. transparent if None
    pub background: Option<Color>,

    /// color heteroatom labels and their half-bonds by element
    pub coloring: bool,

    /// text drawn below the structure
    pub comment: Option<String>,

    /// vertical distance in pixels between the structure and the comment
    pub comment_offset: f64,

    pub comment_color: Color,

    pub comment_font_size: f64,

    pub label_font_size: f64,

    /// length of a bond in pixels
    pub bond_length: f64,

    /// empty space in pixels around the drawing
    pub margin: f64,

    /// fixed (width, height) of the image in pixels. the drawing is scaled
    /// to fit. sized to the drawing if None
    pub image_size: Option<(u32, u32)>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            background: None,
            coloring: false,
            comment: None,
            comment_offset: 10.0,
            comment_color: Color::BLACK,
            comment_font_size: 14.0,
            label_font_size: 14.0,
            bond_length: 40.0,
            margin: 20.0,
            image_size: None,
        }
    }
}

/// Renders molecules to image bytes. Creating a renderer loads the system
/// fonts used to rasterize text, so it should be reused across molecules.
pub struct Renderer {
    svg_options: usvg::Options<'static>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        let mut svg_options = usvg::Options::default();
        svg_options.fontdb_mut().load_system_fonts();
        svg_options.font_family = "Arial".to_owned();
        Self { svg_options }
    }

    /// render `mol` in the format requested by `opts`
    pub fn render_to_buffer(
        &self,
        mol: &QueryMol,
        opts: &RenderOptions,
    ) -> Result<Vec<u8>> {
        let svg = to_svg(mol, opts)?;
        match opts.format {
            OutputFormat::Svg => Ok(svg.into_bytes()),
            OutputFormat::Png => self.rasterize(&svg),
        }
    }

    pub fn render_to_file(
        &self,
        mol: &QueryMol,
        opts: &RenderOptions,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let bytes = self.render_to_buffer(mol, opts)?;
        trace!("writing {} bytes to {}", bytes.len(), path.as_ref().display());
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn rasterize(&self, svg: &str) -> Result<Vec<u8>> {
        let tree = usvg::Tree::from_str(svg, &self.svg_options)
            .map_err(|e| ToolkitError::Render(format!("bad SVG: {e}")))?;
        let size = tree.size();
        let width = size.width().ceil().max(1.0) as u32;
        let height = size.height().ceil().max(1.0) as u32;
        let mut pixmap =
            tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
                ToolkitError::Render(format!(
                    "failed to allocate a {width}x{height} image"
                ))
            })?;
        resvg::render(
            &tree,
            tiny_skia::Transform::default(),
            &mut pixmap.as_mut(),
        );
        pixmap
            .encode_png()
            .map_err(|e| ToolkitError::Render(format!("PNG encoding: {e}")))
    }
}

fn escape(s: &str) -> String {
    let mut ret = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => ret.push_str("&amp;"),
            '<' => ret.push_str("&lt;"),
            '>' => ret.push_str("&gt;"),
            '"' => ret.push_str("&quot;"),
            '\'' => ret.push_str("&apos;"),
            c => ret.push(c),
        }
    }
    ret
}

/// rough width of `text` in a sans-serif font of size `size`
fn text_width(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * size * 0.6
}

#[derive(Clone, Copy, PartialEq)]
enum Stroke {
    Solid,
    Dashed,
}

/// the lines making up a bond, as (perpendicular offset in units of the line
/// gap, stroke) pairs
fn bond_lines(bond: &QueryBond, aromatic: bool) -> Vec<(f64, Stroke)> {
    use Stroke::*;
    let s = BondOrders::SINGLE;
    let d = BondOrders::DOUBLE;
    let a = BondOrders::AROMATIC;
    match bond.orders {
        o if o == s => vec![(0.0, Solid)],
        o if o == d => vec![(-0.5, Solid), (0.5, Solid)],
        o if o == BondOrders::TRIPLE => {
            vec![(-1.0, Solid), (0.0, Solid), (1.0, Solid)]
        }
        o if o == s | a && !aromatic => vec![(0.0, Solid)],
        o if o == a || o == s | a || o == s | d || o == d | a => {
            vec![(-0.5, Solid), (0.5, Dashed)]
        }
        _ => vec![(0.0, Dashed)],
    }
}

/// whether a bond's query needs its source text drawn next to it, since the
/// lines alone do not show it
fn annotate(bond: &QueryBond) -> bool {
    let s = BondOrders::SINGLE;
    let d = BondOrders::DOUBLE;
    let a = BondOrders::AROMATIC;
    let plain = [s, d, BondOrders::TRIPLE, a, s | a, s | d, d | a];
    !bond.is_implicit()
        && (bond.ring.is_some() || !plain.contains(&bond.orders))
}

/// move `from` toward `to` until it leaves a box of half-size `half` around
/// `from`
fn clip(from: Point, to: Point, half: Point) -> Point {
    let d = to - from;
    let tx = if d.x.abs() > 1e-9 { half.x / d.x.abs() } else { f64::MAX };
    let ty = if d.y.abs() > 1e-9 { half.y / d.y.abs() } else { f64::MAX };
    from + d * tx.min(ty).min(0.45)
}

struct AtomDrawing {
    pos: Point,
    label: Option<String>,
    color: Color,

    /// half the size of the label box, zero for unlabelled atoms
    half: Point,
}

/// draw `mol` as an SVG document
pub fn to_svg(mol: &QueryMol, opts: &RenderOptions) -> Result<String> {
    let coords = mol.coords().ok_or_else(|| {
        ToolkitError::Render("molecule has not been laid out".to_owned())
    })?;
    let mut svg = String::new();
    write_svg(&mut svg, mol, coords, opts)
        .map_err(|e| ToolkitError::Render(format!("formatting SVG: {e}")))?;
    Ok(svg)
}

fn write_svg(
    svg: &mut String,
    mol: &QueryMol,
    coords: &[Point],
    opts: &RenderOptions,
) -> fmt::Result {
    let degrees = mol.degrees();
    let atoms: Vec<AtomDrawing> = mol
        .atoms()
        .iter()
        .zip(coords)
        .zip(&degrees)
        .map(|((atom, p), &deg)| {
            let label = atom.label(deg);
            let half = match &label {
                Some(l) => Point::new(
                    text_width(l, opts.label_font_size) / 2.0 + 2.0,
                    opts.label_font_size / 2.0 + 1.0,
                ),
                None => Point::default(),
            };
            let color = match atom.atomic_number() {
                Some(n) if opts.coloring => elements::color(n),
                _ => Color::BLACK,
            };
            AtomDrawing {
                pos: Point::new(p.x, -p.y) * opts.bond_length,
                label,
                color,
                half,
            }
        })
        .collect();

    // extent of the structure including labels
    let corners: Vec<Point> = atoms
        .iter()
        .flat_map(|a| [a.pos - a.half, a.pos + a.half])
        .collect();
    let (min, max) = bounds(&corners);
    let (struct_w, struct_h) = (max.x - min.x, max.y - min.y);

    let comment = opts.comment.as_deref().filter(|c| !c.is_empty());
    let comment_w = comment
        .map(|c| text_width(c, opts.comment_font_size))
        .unwrap_or(0.0);
    let comment_h = if comment.is_some() {
        opts.comment_offset + opts.comment_font_size
    } else {
        0.0
    };

    let content_w = struct_w.max(comment_w);
    let natural_w = (content_w + 2.0 * opts.margin).ceil().max(1.0);
    let natural_h = (struct_h + comment_h + 2.0 * opts.margin).ceil().max(1.0);

    let (width, height, scale, dx, dy) = match opts.image_size {
        Some((w, h)) => {
            let (w, h) = (w.max(1) as f64, h.max(1) as f64);
            let scale = (w / natural_w).min(h / natural_h);
            let dx = (w - natural_w * scale) / 2.0;
            let dy = (h - natural_h * scale) / 2.0;
            (w, h, scale, dx, dy)
        }
        None => (natural_w, natural_h, 1.0, 0.0, 0.0),
    };

    // map structure coordinates into the drawing, centered horizontally
    let origin = Point::new(
        opts.margin + (content_w - struct_w) / 2.0 - min.x,
        opts.margin - min.y,
    );

    writeln!(svg, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    )?;
    if let Some(bg) = opts.background {
        writeln!(
            svg,
            r#"  <rect x="0" y="0" width="{width}" height="{height}" fill="{}"/>"#,
            bg.to_svg()
        )?;
    }
    writeln!(
        svg,
        r#"  <g transform="translate({dx:.2},{dy:.2}) scale({scale:.4})">"#
    )?;

    let gap = opts.bond_length * 0.15;
    let stroke_width = (opts.bond_length / 25.0).max(1.0);
    writeln!(
        svg,
        r#"    <g stroke-width="{stroke_width:.2}" stroke-linecap="round" fill="none">"#
    )?;
    for bond in mol.bonds() {
        let (a, b) = (&atoms[bond.begin], &atoms[bond.end]);
        let aromatic = mol.atoms()[bond.begin].is_aromatic()
            && mol.atoms()[bond.end].is_aromatic();
        let start = clip(a.pos, b.pos, a.half) + origin;
        let end = clip(b.pos, a.pos, b.half) + origin;
        let Some(normal) = (end - start).perp().unit() else {
            continue;
        };
        for (offset, stroke) in bond_lines(bond, aromatic) {
            let shift = normal * (offset * gap);
            let (p, q) = (start + shift, end + shift);
            let dash = match stroke {
                Stroke::Solid => String::new(),
                Stroke::Dashed => format!(
                    r#" stroke-dasharray="{:.2},{:.2}""#,
                    gap * 0.6,
                    gap * 0.6
                ),
            };
            if a.color == b.color {
                line(svg, p, q, a.color, &dash)?;
            } else {
                let mid = p + (q - p) * 0.5;
                line(svg, p, mid, a.color, &dash)?;
                line(svg, mid, q, b.color, &dash)?;
            }
        }
        if annotate(bond) {
            let mid = start + (end - start) * 0.5 + normal * (gap * 1.5);
            text(
                svg,
                mid,
                &bond.text,
                opts.label_font_size * 0.7,
                Color::new(0.4, 0.4, 0.4),
            )?;
        }
    }
    writeln!(svg, "    </g>")?;

    for atom in &atoms {
        if let Some(label) = &atom.label {
            text(
                svg,
                atom.pos + origin,
                label,
                opts.label_font_size,
                atom.color,
            )?;
        }
    }

    if let Some(c) = comment {
        let pos = Point::new(
            opts.margin + content_w / 2.0,
            opts.margin + struct_h + comment_h - opts.comment_font_size / 2.0,
        );
        text(svg, pos, c, opts.comment_font_size, opts.comment_color)?;
    }

    writeln!(svg, "  </g>")?;
    writeln!(svg, "</svg>")
}

fn line(
    svg: &mut String,
    p: Point,
    q: Point,
    color: Color,
    dash: &str,
) -> fmt::Result {
    writeln!(
        svg,
        r#"      <line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}"{dash}/>"#,
        p.x,
        p.y,
        q.x,
        q.y,
        color.to_svg()
    )
}

fn text(
    svg: &mut String,
    at: Point,
    s: &str,
    size: f64,
    color: Color,
) -> fmt::Result {
    writeln!(
        svg,
        r#"    <text x="{:.2}" y="{:.2}" font-family="Arial, sans-serif" font-size="{size:.1}" text-anchor="middle" dominant-baseline="central" fill="{}">{}</text>"#,
        at.x,
        at.y,
        color.to_svg(),
        escape(s)
    )
}
