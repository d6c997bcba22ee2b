/// Input manifest
///
/// The manifest is a whitespace-separated `key value` file. Paths may be
/// local or `http(s)://` URLs; remote entries are fetched with the
/// `fenrir_username` / `fenrir_password` credentials when both are present.
use log::{info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::remote::{is_remote, Credentials};
use crate::render::layout::REFERENCE_WIDTH;
use crate::render::stretch::{StretchMode, UnknownStretch};
use crate::state::results::ResultKind;
use crate::state::session::DEFAULT_ANGULAR_SIZE;

/// Manifest read when `-input` is not given.
pub const DEFAULT_MANIFEST: &str = "JADESView_input_file.dat";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("manifest line {line}: expected `key value`")]
    Syntax { line: usize },
    #[error("manifest is missing {0}")]
    MissingKey(&'static str),
    #[error("manifest {key}: {value:?} is not a number")]
    BadNumber { key: &'static str, value: String },
    #[error("manifest {key} must be positive, got {value}")]
    NotPositive { key: &'static str, value: f64 },
    #[error("manifest defaultstretch: {0}")]
    Stretch(#[from] UnknownStretch),
}

/// Prefixes for the pre-rendered SED plots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlotSources {
    pub eazy: Option<String>,
    pub beagle: Option<String>,
    pub bagpipes: Option<String>,
    pub sedz: Option<String>,
}

/// Everything the manifest configures.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub input_photometry: String,
    pub image_list: String,
    pub plots: PlotSources,
    /// Result tables that are present; missing local files are dropped.
    pub results: HashMap<ResultKind, String>,
    pub output_flags_file: PathBuf,
    pub output_notes_file: PathBuf,
    pub canvas_width: f32,
    pub default_stretch: StretchMode,
    pub angular_size: f64,
    pub credentials: Option<Credentials>,
}

impl ViewerConfig {
    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("📄 Reading input manifest: {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, |p| Path::new(p).exists())
    }

    /// Parse manifest text; `exists` decides whether a local result table is
    /// present.
    pub fn parse(text: &str, exists: impl Fn(&str) -> bool) -> Result<Self, ConfigError> {
        let mut entries: HashMap<&str, &str> = HashMap::new();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some(key), Some(value)) => {
                    // Later lines override earlier ones
                    entries.insert(key, value);
                }
                _ => return Err(ConfigError::Syntax { line: i + 1 }),
            }
        }

        for key in entries.keys() {
            if !KNOWN_KEYS.contains(key) && !is_result_key(key) {
                warn!("⚠️  Ignoring unknown manifest key {}", key);
            }
        }

        let required = |key: &'static str| {
            entries
                .get(key)
                .map(|v| v.to_string())
                .ok_or(ConfigError::MissingKey(key))
        };
        let optional = |key: &str| entries.get(key).map(|v| v.to_string());

        let mut results = HashMap::new();
        for kind in ResultKind::ALL {
            if let Some(source) = optional(kind.manifest_key()) {
                if is_remote(&source) || exists(&source) {
                    results.insert(kind, source);
                } else {
                    info!("No {} table at {}, disabling", kind, source);
                }
            }
        }

        let canvas_width = match entries.get("canvaswidth") {
            Some(value) => positive("canvaswidth", value)? as f32,
            None => REFERENCE_WIDTH,
        };
        let angular_size = match entries.get("ra_dec_size_value") {
            Some(value) => positive("ra_dec_size_value", value)?,
            None => DEFAULT_ANGULAR_SIZE,
        };
        let default_stretch = match entries.get("defaultstretch") {
            Some(value) => value.parse()?,
            None => StretchMode::default(),
        };
        let credentials = match (optional("fenrir_username"), optional("fenrir_password")) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            (None, None) => None,
            _ => {
                warn!("⚠️  Both fenrir_username and fenrir_password are needed, ignoring credentials");
                None
            }
        };

        Ok(Self {
            input_photometry: required("input_photometry")?,
            image_list: required("image_list")?,
            plots: PlotSources {
                eazy: optional("EAZY_files"),
                beagle: optional("BEAGLE_files"),
                bagpipes: optional("BAGPIPES_files"),
                sedz: optional("SEDz_files"),
            },
            results,
            output_flags_file: required("output_flags_file")?.into(),
            output_notes_file: required("output_notes_file")?.into(),
            canvas_width,
            default_stretch,
            angular_size,
            credentials,
        })
    }
}

const KNOWN_KEYS: [&str; 13] = [
    "input_photometry",
    "image_list",
    "EAZY_files",
    "BEAGLE_files",
    "BAGPIPES_files",
    "SEDz_files",
    "output_flags_file",
    "output_notes_file",
    "canvaswidth",
    "defaultstretch",
    "ra_dec_size_value",
    "fenrir_username",
    "fenrir_password",
];

fn is_result_key(key: &str) -> bool {
    ResultKind::ALL.iter().any(|k| k.manifest_key() == key)
}

fn positive(key: &'static str, value: &str) -> Result<f64, ConfigError> {
    let number: f64 = value.parse().map_err(|_| ConfigError::BadNumber {
        key,
        value: value.to_string(),
    })?;
    if number.is_finite() && number > 0.0 {
        Ok(number)
    } else {
        Err(ConfigError::NotPositive { key, value: number })
    }
}
