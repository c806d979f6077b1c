//! Loader settings and per-satellite configuration files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LoaderError, Result};

const SEGMENT_PLACEHOLDER: &str = "%(segment)s";

/// Environment variable naming the satellite configuration directory.
pub const CONFIG_DIR_ENV: &str = "PPP_CONFIG_DIR";

/// Runtime settings for the image loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Read resolved segment spans on the rayon pool.
    pub parallel_segments: bool,

    /// Produce a no-data mask alongside the counts.
    pub mask: bool,

    /// External xRIT decompression program.
    pub decompress_path: Option<PathBuf>,

    /// Where decompressed segments are written. Defaults to the directory
    /// of each compressed file.
    pub decompress_outdir: Option<PathBuf>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            parallel_segments: false,
            mask: false,
            decompress_path: None,
            decompress_outdir: None,
        }
    }
}

impl LoaderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("XRIT_PARALLEL_SEGMENTS") {
            config.parallel_segments = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("XRIT_MASK") {
            config.mask = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("XRIT_DECOMPRESS_PATH") {
            if !val.is_empty() {
                config.decompress_path = Some(PathBuf::from(val));
            }
        }

        if let Ok(val) = std::env::var("XRIT_DECOMPRESS_OUTDIR") {
            if !val.is_empty() {
                config.decompress_outdir = Some(PathBuf::from(val));
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(path) = &self.decompress_path {
            if path.as_os_str().is_empty() {
                return Err("decompress_path must not be empty".to_string());
            }
        }
        if let Some(dir) = &self.decompress_outdir {
            if dir.as_os_str().is_empty() {
                return Err("decompress_outdir must not be empty".to_string());
            }
        }
        Ok(())
    }
}

// ============================================================================
// Satellite configuration
// ============================================================================

/// One satellite: its instruments, their channels and where level 1 files live.
///
/// ```yaml
/// satname: meteosat
/// number: "10"
/// instruments:
///   seviri:
///     mission: msg
///     channels:
///       - { name: IR_108, resolution: 3000.403165817, size: [3712, 3712] }
///     level1:
///       dir: /data/msg
///       filename: "H-000-MSG3__-MSG3________-%(channel)s-%(segment)s___-%(time)s-__"
///       filename_pro: "H-000-MSG3__-MSG3________-_________-PRO______-%(time)s-__"
///       filename_epi: "H-000-MSG3__-MSG3________-_________-EPI______-%(time)s-__"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatelliteConfig {
    pub satname: String,
    #[serde(default)]
    pub number: String,
    pub instruments: BTreeMap<String, InstrumentConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Header table name understood by `Mission::from_str`.
    #[serde(default)]
    pub mission: Option<String>,
    pub channels: Vec<ChannelConfig>,
    pub level1: Level1Config,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    /// Pixel size in projection units (metres).
    pub resolution: f64,
    /// Full image size, `[columns, lines]`.
    pub size: [usize; 2],
}

/// File name templates with `%(channel)s`, `%(segment)s` and `%(time)s`
/// placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level1Config {
    pub dir: PathBuf,
    pub filename: String,
    #[serde(default)]
    pub filename_pro: Option<String>,
    #[serde(default)]
    pub filename_epi: Option<String>,
}

impl SatelliteConfig {
    /// Read `<satname>.yaml` from the directory named by `PPP_CONFIG_DIR`.
    pub fn load(satname: &str) -> Result<Self> {
        let dir = std::env::var(CONFIG_DIR_ENV)
            .map_err(|_| LoaderError::config(format!("{CONFIG_DIR_ENV} environment variable is not set")))?;
        Self::load_from(Path::new(&dir), satname)
    }

    pub fn load_from(dir: &Path, satname: &str) -> Result<Self> {
        let path = dir.join(format!("{satname}.yaml"));
        if !path.is_file() {
            return Err(LoaderError::config(format!(
                "unknown satellite: '{satname}' (no such file: '{}')",
                path.display()
            )));
        }
        let text = fs::read_to_string(&path).map_err(|e| LoaderError::io(&path, e))?;
        debug!(path = %path.display(), "loading satellite configuration");
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Select an instrument. Without a name the satellite must carry exactly one.
    pub fn instrument(&self, name: Option<&str>) -> Result<(&str, &InstrumentConfig)> {
        match name {
            Some(name) => self
                .instruments
                .get_key_value(name)
                .map(|(k, v)| (k.as_str(), v))
                .ok_or_else(|| LoaderError::config(format!("unknown instrument: '{name}'"))),
            None => {
                let mut iter = self.instruments.iter();
                match (iter.next(), iter.next()) {
                    (Some((k, v)), None) => Ok((k.as_str(), v)),
                    (None, _) => Err(LoaderError::config(format!("satellite '{}' has no instruments", self.satname))),
                    _ => Err(LoaderError::config("please specify instrument")),
                }
            }
        }
    }
}

impl InstrumentConfig {
    pub fn channel(&self, name: &str) -> Result<&ChannelConfig> {
        self.channels
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| LoaderError::config(format!("unknown channel: '{name}'")))
    }

    pub fn channel_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.channels.iter().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Level1Config {
    /// Path of one image segment.
    pub fn segment_path(&self, channel: &str, segment: u16, time: DateTime<Utc>) -> PathBuf {
        self.dir.join(expand(&self.filename, Some(channel), Some(segment), time))
    }

    pub fn prologue_path(&self, time: DateTime<Utc>) -> Option<PathBuf> {
        self.filename_pro
            .as_ref()
            .map(|t| self.dir.join(expand(t, None, None, time)))
    }

    pub fn epilogue_path(&self, time: DateTime<Utc>) -> Option<PathBuf> {
        self.filename_epi
            .as_ref()
            .map(|t| self.dir.join(expand(t, None, None, time)))
    }

    /// Segment files of `segments` that exist on disk, in segment order.
    pub fn existing_segments(
        &self,
        channel: &str,
        segments: std::ops::RangeInclusive<u16>,
        time: DateTime<Utc>,
    ) -> Vec<PathBuf> {
        segments
            .map(|s| self.segment_path(channel, s, time))
            .filter(|p| p.is_file())
            .collect()
    }

    /// Every segment file of `channel` at `time` found in `dir`, compressed
    /// or not, sorted by name. A template without a segment placeholder
    /// names a single file.
    pub fn find_segments(&self, channel: &str, time: DateTime<Utc>) -> Result<Vec<PathBuf>> {
        let name = expand(&self.filename, Some(channel), None, time);
        let Some((prefix, suffix)) = name.split_once(SEGMENT_PLACEHOLDER) else {
            let path = self.dir.join(&name);
            return Ok(if path.is_file() { vec![path] } else { Vec::new() });
        };

        let pattern = segment_name_pattern(prefix, suffix)?;
        let entries = fs::read_dir(&self.dir).map_err(|e| LoaderError::io(&self.dir, e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| LoaderError::io(&self.dir, e))?;
            let file_name = entry.file_name();
            if file_name.to_str().is_some_and(|n| pattern.is_match(n)) {
                paths.push(entry.path());
            }
        }
        paths.sort();
        debug!(dir = %self.dir.display(), channel, found = paths.len(), "found segment files");
        Ok(paths)
    }
}

/// Names made of the literal `prefix`, a run of digits, then the literal
/// `suffix`. The uncompressed `__` marker also matches its compressed `C_`
/// form.
fn segment_name_pattern(prefix: &str, suffix: &str) -> Result<Regex> {
    let suffix = match suffix.strip_suffix("__") {
        Some(stem) => format!(
            "{}(?:__|{})",
            regex::escape(stem),
            regex::escape(xrit_parser::segment::COMPRESSED_SUFFIX)
        ),
        None => regex::escape(suffix),
    };
    let pattern = format!("^{}[0-9]+{suffix}$", regex::escape(prefix));
    Regex::new(&pattern).map_err(|e| LoaderError::config(format!("invalid segment file pattern '{pattern}': {e}")))
}

/// Fill a file name template. The channel is padded with `_` to the 9
/// character field used in xRIT names; segments are 6 digits.
fn expand(template: &str, channel: Option<&str>, segment: Option<u16>, time: DateTime<Utc>) -> String {
    let mut name = template.replace("%(time)s", &time.format("%Y%m%d%H%M").to_string());
    if let Some(channel) = channel {
        name = name.replace("%(channel)s", &format!("{channel:_<9}"));
    }
    if let Some(segment) = segment {
        name = name.replace(SEGMENT_PLACEHOLDER, &format!("{segment:06}"));
    }
    name
}
