/// Top-level error for startup and shutdown
use thiserror::Error;

use crate::config::ConfigError;
use crate::remote::FetchError;
use crate::render::RenderError;
use crate::sky::mosaic::MosaicError;
use crate::state::catalog::CatalogError;
use crate::state::output::OutputError;
use crate::state::results::ResultsError;
use crate::state::selection::SelectionError;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Mosaic(#[from] MosaicError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Results(#[from] ResultsError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Output(#[from] OutputError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("window error: {0}")]
    Gui(#[from] iced::Error),
}
