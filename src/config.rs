use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::driver::Settings;
use crate::toolkit::{Color, RenderOptions};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Overrides for the drawing settings. Anything left out keeps the value from
/// [Config::base_render_options].
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Background fill, as three components like "255, 255, 255" or
    /// "1, 1, 1".
    pub background_color: Option<Color>,

    /// Whether to color heteroatoms by element.
    pub coloring: Option<bool>,

    /// Distance in pixels between the structure and the pattern text below it.
    pub comment_offset: Option<f64>,

    pub comment_color: Option<Color>,

    pub comment_font_size: Option<f64>,

    pub label_font_size: Option<f64>,

    /// Length of a single bond in pixels.
    pub bond_length: Option<f64>,

    pub margin: Option<f64>,

    /// Fixed [width, height] of every image. Images are sized to fit the
    /// structure when this is missing.
    pub image_size: Option<(u32, u32)>,
}

impl RenderConfig {
    fn apply(&self, mut opts: RenderOptions) -> RenderOptions {
        if let Some(c) = self.background_color {
            opts.background = Some(c);
        }
        if let Some(c) = self.coloring {
            opts.coloring = c;
        }
        if let Some(o) = self.comment_offset {
            opts.comment_offset = o;
        }
        if let Some(c) = self.comment_color {
            opts.comment_color = c;
        }
        if let Some(s) = self.comment_font_size {
            opts.comment_font_size = s;
        }
        if let Some(s) = self.label_font_size {
            opts.label_font_size = s;
        }
        if let Some(l) = self.bond_length {
            opts.bond_length = l;
        }
        if let Some(m) = self.margin {
            opts.margin = m;
        }
        if self.image_size.is_some() {
            opts.image_size = self.image_size;
        }
        opts
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// The directory containing the test data. `input` is resolved against
    /// it.
    pub data_root: PathBuf,

    /// The file of SMARTS patterns to draw, one pattern per line.
    pub input: PathBuf,

    /// Where to write the numbered PNG files. Created if missing.
    pub output_dir: PathBuf,

    /// Print an SVG preview for every Nth line. 0 disables previews.
    pub preview_every: usize,

    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            input: PathBuf::from("molecules/smarts.sma"),
            output_dir: PathBuf::from("out_smarts"),
            preview_every: 20,
            render: RenderConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let s = read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Ok(toml::from_str(&s)?)
    }

    /// the drawing settings used for every pattern in a batch before any
    /// overrides from the `[render]` table
    pub fn base_render_options() -> RenderOptions {
        RenderOptions {
            background: Some(Color::WHITE),
            coloring: true,
            comment_offset: 40.0,
            comment_color: Color::new(0.0, 0.3, 0.5),
            ..Default::default()
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        self.render.apply(Self::base_render_options())
    }

    pub fn input_path(&self) -> PathBuf {
        self.data_root.join(&self.input)
    }

    pub fn settings(&self) -> Settings {
        Settings {
            input: self.input_path(),
            output_dir: self.output_dir.clone(),
            preview_every: self.preview_every,
            render: self.render_options(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.input_path(), Path::new("data/molecules/smarts.sma"));
        let settings = config.settings();
        assert_eq!(settings.output_dir, Path::new("out_smarts"));
        assert_eq!(settings.preview_every, 20);
        assert_eq!(settings.render.background, Some(Color::WHITE));
        assert!(settings.render.coloring);
        assert_eq!(settings.render.comment_offset, 40.0);
        assert_eq!(settings.render.comment_color, Color::new(0.0, 0.3, 0.5));
        assert_eq!(settings.render.comment, None);
    }

    #[test]
    fn partial_render_table() {
        let config: Config = toml::from_str(
            r#"
            data_root = "/tmp/data"
            preview_every = 5

            [render]
            background_color = "0, 0, 0"
            bond_length = 30
            image_size = [300, 200]
            "#,
        )
        .unwrap();
        assert_eq!(config.input, Path::new("molecules/smarts.sma"));
        assert_eq!(config.preview_every, 5);
        let opts = config.render_options();
        assert_eq!(opts.background, Some(Color::BLACK));
        assert_eq!(opts.bond_length, 30.0);
        assert_eq!(opts.image_size, Some((300, 200)));
        // untouched keys keep the batch defaults
        assert!(opts.coloring);
        assert_eq!(opts.comment_offset, 40.0);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(toml::from_str::<Config>("prevew_every = 3").is_err());
        assert!(toml::from_str::<Config>(
            "[render]\ncomment_color = \"0, 0.3\""
        )
        .is_err());
    }

    #[test]
    fn load() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "output_dir = \"pngs\"").unwrap();
        let config = Config::load(f.path()).unwrap();
        assert_eq!(config.output_dir, Path::new("pngs"));

        let err = Config::load("/nonexistent/config.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
