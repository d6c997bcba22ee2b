/// Local and remote inputs: SED plot panels and result tables
///
/// Any manifest path starting with `http://` or `https://` is fetched over
/// HTTP with optional basic auth; everything else is read from disk.
use base64::{engine::general_purpose::STANDARD, Engine as _};
use iced::widget::image::Handle;
use iced::Point;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

use crate::config::ViewerConfig;
use crate::render::layout::scale_factor;
use crate::render::TIMING_TARGET;
use crate::state::results::ResultSet;
use crate::state::table::{Table, TableError};

/// Largest body accepted from the server (result tables can be big).
const MAX_DOWNLOAD: u64 = 512 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to fetch {url}: {source}")]
    Http { url: String, source: ureq::Error },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode {source_path}: {source}")]
    Decode {
        source_path: String,
        source: image::ImageError,
    },
    #[error("{0}")]
    Table(#[from] TableError),
    #[error("background fetch failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Basic-auth credentials for the remote server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn authorization(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {}", token)
    }
}

pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Read `source` from disk or over HTTP.
pub fn fetch_bytes(source: &str, credentials: Option<&Credentials>) -> Result<Vec<u8>, FetchError> {
    if !is_remote(source) {
        return std::fs::read(source).map_err(|e| FetchError::Io {
            path: source.into(),
            source: e,
        });
    }

    let http_error = |e| FetchError::Http {
        url: source.to_string(),
        source: e,
    };
    let mut request = ureq::get(source);
    if let Some(credentials) = credentials {
        request = request.header("Authorization", &credentials.authorization());
    }
    let mut response = request.call().map_err(http_error)?;
    response
        .body_mut()
        .with_config()
        .limit(MAX_DOWNLOAD)
        .read_to_vec()
        .map_err(http_error)
}

/// [`fetch_bytes`] off the UI thread.
pub async fn fetch_bytes_async(
    source: String,
    credentials: Option<Credentials>,
) -> Result<Vec<u8>, FetchError> {
    if !is_remote(&source) {
        return tokio::fs::read(&source).await.map_err(|e| FetchError::Io {
            path: source.into(),
            source: e,
        });
    }
    tokio::task::spawn_blocking(move || fetch_bytes(&source, credentials.as_ref())).await?
}

/// The pre-rendered SED plots the viewer can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SedKind {
    Eazy,
    Beagle,
    SedZ,
    Bagpipes,
}

impl SedKind {
    /// Plot file for `id` under `prefix`.
    pub fn source_path(self, prefix: &str, id: i64) -> String {
        match self {
            SedKind::Eazy => format!("{}{}_EAZY_SED.png", prefix, id),
            SedKind::Beagle | SedKind::SedZ => format!("{}{}_BEAGLE_SED.png", prefix, id),
            SedKind::Bagpipes => format!("{}{:05}.png", prefix, id),
        }
    }

    /// Top-left region kept from the raw plot.
    pub fn crop(self) -> Option<(u32, u32)> {
        match self {
            SedKind::Eazy => Some((3300, 1480)),
            SedKind::Bagpipes => Some((3982, 2749)),
            SedKind::Beagle | SedKind::SedZ => None,
        }
    }

    /// Panel width on the reference canvas.
    pub fn base_width(self) -> f32 {
        match self {
            SedKind::Bagpipes => 800.0,
            _ => 1000.0,
        }
    }

    /// Panel centre on the reference canvas.
    pub fn centre(self) -> Point {
        match self {
            SedKind::Eazy => Point::new(500.0, 245.0),
            SedKind::Beagle | SedKind::SedZ => Point::new(1500.0, 350.0),
            SedKind::Bagpipes => Point::new(1490.0, 330.0),
        }
    }

    pub fn prefix(self, config: &ViewerConfig) -> Option<&str> {
        let plots = &config.plots;
        match self {
            SedKind::Eazy => plots.eazy.as_deref(),
            SedKind::Beagle => plots.beagle.as_deref(),
            SedKind::SedZ => plots.sedz.as_deref(),
            SedKind::Bagpipes => plots.bagpipes.as_deref(),
        }
    }
}

impl std::fmt::Display for SedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SedKind::Eazy => "EAZY",
            SedKind::Beagle => "BEAGLE",
            SedKind::SedZ => "SEDz",
            SedKind::Bagpipes => "BAGPIPES",
        };
        write!(f, "{}", name)
    }
}

/// A decoded, cropped and resized SED plot ready for display.
#[derive(Debug, Clone)]
pub struct SedPanel {
    pub kind: SedKind,
    pub object_id: i64,
    pub handle: Handle,
    pub width: u32,
    pub height: u32,
}

/// Decode plot bytes and fit them to the panel width for `canvas_width`.
pub fn prepare_sed_image(
    kind: SedKind,
    source_path: &str,
    bytes: &[u8],
    canvas_width: f32,
) -> Result<RgbaImage, FetchError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|source| FetchError::Decode {
            source_path: source_path.to_string(),
            source,
        })?
        .to_rgba8();

    let cropped = match kind.crop() {
        Some((w, h)) => {
            let (w, h) = (w.min(decoded.width()), h.min(decoded.height()));
            imageops::crop_imm(&decoded, 0, 0, w, h).to_image()
        }
        None => decoded,
    };

    let width = ((kind.base_width() * scale_factor(canvas_width)) as u32).max(1);
    let ratio = width as f64 / cropped.width().max(1) as f64;
    let height = ((cropped.height() as f64 * ratio) as u32).max(1);
    Ok(imageops::resize(&cropped, width, height, FilterType::Lanczos3))
}

/// Fetch and prepare one SED panel.
pub async fn load_sed_plot(
    kind: SedKind,
    prefix: String,
    object_id: i64,
    credentials: Option<Credentials>,
    canvas_width: f32,
) -> Result<SedPanel, FetchError> {
    let source = kind.source_path(&prefix, object_id);
    let start = Instant::now();
    let bytes = fetch_bytes_async(source.clone(), credentials).await?;
    debug!(
        target: TIMING_TARGET,
        "Fetching the {} image: {:?}",
        kind,
        start.elapsed()
    );

    let start = Instant::now();
    let raster = tokio::task::spawn_blocking(move || {
        prepare_sed_image(kind, &source, &bytes, canvas_width)
    })
    .await??;
    debug!(
        target: TIMING_TARGET,
        "Resizing the {} image: {:?}",
        kind,
        start.elapsed()
    );

    let (width, height) = raster.dimensions();
    Ok(SedPanel {
        kind,
        object_id,
        handle: Handle::from_rgba(width, height, raster.into_raw()),
        width,
        height,
    })
}

/// Load every result table the manifest names.
///
/// A table that fails to load only disables its own adapter.
pub fn load_result_tables(config: &ViewerConfig) -> ResultSet {
    let mut results = ResultSet::new();
    for (&kind, source) in &config.results {
        let start = Instant::now();
        let table = if is_remote(source) {
            fetch_bytes(source, config.credentials.as_ref())
                .and_then(|bytes| Ok(Table::from_bytes(&bytes)?))
        } else {
            Table::read(Path::new(source)).map_err(FetchError::from)
        };
        match table {
            Ok(table) => {
                results.load(kind, table);
                if results.is_enabled(kind) {
                    info!("📊 Loaded {} results from {}", kind, source);
                }
            }
            Err(e) => warn!("⚠️  {}; disabling {} results", e, kind),
        }
        debug!(
            target: TIMING_TARGET,
            "Opening the {} results: {:?}",
            kind,
            start.elapsed()
        );
    }
    results
}
