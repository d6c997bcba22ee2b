/// Per-session review state
///
/// Which object is on screen, the flags and notes recorded so far, and the
/// display settings that every thumbnail render reads. Flags and notes are
/// indexed by catalog row and cover the whole catalog, visited or not.
use log::info;
use thiserror::Error;

use super::catalog::Catalog;
use crate::render::stretch::StretchMode;

/// Default cutout side in arcseconds.
pub const DEFAULT_ANGULAR_SIZE: f64 = 2.0;
/// Largest cutout side the size box accepts.
pub const MAX_ANGULAR_SIZE: f64 = 30.0;

/// Manual quality flags for one object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectFlags {
    /// Object looks like a high-redshift candidate
    pub high_z: bool,
    /// The SED fit looks wrong
    pub bad_fit: bool,
    /// The photometry or imaging looks wrong
    pub bad_data: bool,
}

impl ObjectFlags {
    pub fn is_clear(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    HighZ,
    BadFit,
    BadData,
}

impl Flag {
    /// Console message when the flag is raised.
    pub fn message(self, id: i64) -> String {
        match self {
            Flag::HighZ => format!("Object {} is a high-redshift candidate.", id),
            Flag::BadFit => format!("Object {} has a bad fit.", id),
            Flag::BadData => format!("Object {} has bad data.", id),
        }
    }
}

/// Everything the thumbnail renderer reads from the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySettings {
    pub stretch: StretchMode,
    pub crosshair: bool,
    /// Cutout side in arcseconds.
    pub angular_size: f64,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            stretch: StretchMode::Linear,
            crosshair: false,
            angular_size: DEFAULT_ANGULAR_SIZE,
        }
    }
}

/// The objects to step through, as catalog rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewingList {
    pub ids: Vec<i64>,
    pub rows: Vec<usize>,
    /// Where the iterator starts.
    pub start: usize,
    /// True when the list came from `-idlist` / `-idarglist`.
    pub explicit: bool,
}

impl ViewingList {
    /// Every catalog object in catalog order.
    pub fn whole_catalog(catalog: &Catalog) -> Self {
        Self {
            ids: catalog.ids().collect(),
            rows: (0..catalog.len()).collect(),
            start: 0,
            explicit: false,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GoToError {
    #[error("Go to is not available when viewing an ID list")]
    Disabled,
    #[error("{0:?} is not an object ID")]
    NotANumber(String),
    #[error("Object {0} is not in the viewing list")]
    NotInList(i64),
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0:?} is not a size between 0 and 30 arcseconds")]
pub struct InvalidSize(pub String);

/// Review session state.
#[derive(Debug, Clone)]
pub struct Session {
    list: ViewingList,
    position: usize,
    flags: Vec<ObjectFlags>,
    notes: Vec<String>,
    pub display: DisplaySettings,
}

impl Session {
    /// `catalog_len` sizes the flag and note arrays.
    pub fn new(list: ViewingList, catalog_len: usize, display: DisplaySettings) -> Self {
        let position = list.start.min(list.len().saturating_sub(1));
        Self {
            list,
            position,
            flags: vec![ObjectFlags::default(); catalog_len],
            notes: vec![String::new(); catalog_len],
            display,
        }
    }

    /// ID of the object on screen.
    pub fn current_id(&self) -> i64 {
        self.list.ids.get(self.position).copied().unwrap_or_default()
    }

    /// Catalog row of the object on screen.
    pub fn current_row(&self) -> usize {
        self.list.rows.get(self.position).copied().unwrap_or_default()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn list_len(&self) -> usize {
        self.list.len()
    }

    /// Go-to is only offered when browsing the whole catalog.
    pub fn go_to_enabled(&self) -> bool {
        !self.list.explicit
    }

    /// Step forward; stays on the last object at the end of the list.
    pub fn next(&mut self) -> bool {
        if self.position + 1 < self.list.len() {
            self.position += 1;
            true
        } else {
            false
        }
    }

    /// Step back; stays on the first object at the start of the list.
    pub fn previous(&mut self) -> bool {
        if self.position > 0 {
            self.position -= 1;
            true
        } else {
            false
        }
    }

    /// Jump to the object whose ID is typed in `entry`.
    pub fn go_to(&mut self, entry: &str) -> Result<i64, GoToError> {
        if !self.go_to_enabled() {
            return Err(GoToError::Disabled);
        }
        let entry = entry.trim();
        if entry.is_empty() || !entry.chars().all(|c| c.is_ascii_digit()) {
            return Err(GoToError::NotANumber(entry.to_string()));
        }
        let id: i64 = entry
            .parse()
            .map_err(|_| GoToError::NotANumber(entry.to_string()))?;
        let position = self
            .list
            .ids
            .iter()
            .position(|&i| i == id)
            .ok_or(GoToError::NotInList(id))?;
        self.position = position;
        Ok(id)
    }

    /// Raise a flag on the object on screen.
    pub fn set_flag(&mut self, flag: Flag) {
        let row = self.current_row();
        if let Some(flags) = self.flags.get_mut(row) {
            match flag {
                Flag::HighZ => flags.high_z = true,
                Flag::BadFit => flags.bad_fit = true,
                Flag::BadData => flags.bad_data = true,
            }
            info!("{}", flag.message(self.current_id()));
        }
    }

    pub fn flags(&self) -> &[ObjectFlags] {
        &self.flags
    }

    pub fn current_flags(&self) -> ObjectFlags {
        self.flags.get(self.current_row()).copied().unwrap_or_default()
    }

    /// Store the note box contents for the object on screen.
    pub fn commit_note(&mut self, text: &str) {
        let row = self.current_row();
        if let Some(note) = self.notes.get_mut(row) {
            *note = text.to_string();
        }
    }

    pub fn current_note(&self) -> &str {
        self.notes.get(self.current_row()).map_or("", String::as_str)
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Parse and apply a new cutout size.
    pub fn set_angular_size(&mut self, entry: &str) -> Result<f64, InvalidSize> {
        let size: f64 = entry
            .trim()
            .parse()
            .map_err(|_| InvalidSize(entry.to_string()))?;
        if !(size.is_finite() && size > 0.0 && size <= MAX_ANGULAR_SIZE) {
            return Err(InvalidSize(entry.to_string()));
        }
        self.display.angular_size = size;
        Ok(size)
    }

    pub fn set_stretch(&mut self, stretch: StretchMode) {
        self.display.stretch = stretch;
    }

    pub fn toggle_crosshair(&mut self) -> bool {
        self.display.crosshair = !self.display.crosshair;
        self.display.crosshair
    }
}
