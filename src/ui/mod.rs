/// User interface module
///
/// This module handles the widgets the main window is built from:
/// - The thumbnail grid canvas (grid.rs)
/// - SED plot panels and redshift summary text (panels.rs)

pub mod grid;
pub mod panels;
