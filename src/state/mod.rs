/// State management module
///
/// This module handles all application state, including:
/// - Shared data structures (data.rs)
/// - FITS / ASCII column tables (table.rs)
/// - The photometric catalog (catalog.rs)
/// - Redshift result tables and their display text (results.rs)
/// - Navigation, flags, notes and display settings (session.rs)
/// - Command-line object selection (selection.rs)
/// - Flags and notes files written on quit (output.rs)

pub mod data;
pub mod table;
pub mod catalog;
pub mod results;
pub mod session;
pub mod selection;
pub mod output;
