use clap::Parser;
use iced::widget::{button, canvas, column, container, row, scrollable, text, text_input};
use iced::{Alignment, Element, Length, Size, Task, Theme};
use iced_aw::Wrap;
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod config;
mod error;
mod remote;
mod render;
mod sky;
mod state;
mod ui;

use config::{ViewerConfig, DEFAULT_MANIFEST};
use error::ViewerError;
use remote::{fetch_bytes, is_remote, load_result_tables, load_sed_plot, SedKind, SedPanel};
use render::layout::{canvas_size, scale_factor};
use render::sheet::{save_sheet, sheet_from_rgba, snapshot_path};
use render::stretch::StretchMode;
use render::{render_thumbnails, RenderOptions, ThumbnailSet, TIMING_TARGET};
use sky::mosaic::{read_image_list, MosaicSet};
use state::catalog::{Catalog, CatalogError};
use state::output::{write_flags_file, write_notes_file};
use state::results::{ResultSet, Side};
use state::selection::Selection;
use state::session::{DisplaySettings, Flag, Session};
use state::table::Table;
use ui::grid::ThumbnailGrid;
use ui::panels::{sed_panel, summary_column, PanelState};

/// Right-hand SED panels, in toggle order.
const RIGHT_PANELS: [SedKind; 3] = [SedKind::Beagle, SedKind::Bagpipes, SedKind::SedZ];

/// Command line options
///
/// The historical single-dash spelling (`-input`, `-id`, ...) is accepted.
#[derive(Parser, Debug)]
#[command(name = "jadesview", version, about = "Step through a photometric catalog object by object")]
struct Cli {
    /// Input manifest
    #[arg(long, default_value = DEFAULT_MANIFEST)]
    input: PathBuf,
    /// Start at this object ID
    #[arg(long)]
    id: Option<i64>,
    /// File whose first column lists the IDs to view
    #[arg(long)]
    idlist: Option<PathBuf>,
    /// IDs to view, e.g. "[1, 2, 3]"
    #[arg(long)]
    idarglist: Option<String>,
    /// Print timings (any value turns them on)
    #[arg(long)]
    tverb: Option<String>,
}

const SINGLE_DASH_FLAGS: [&str; 5] = ["-input", "-id", "-idlist", "-idarglist", "-tverb"];

/// Rewrite `-flag` to `--flag` for the options above.
fn normalize_args(args: impl IntoIterator<Item = String>) -> Vec<String> {
    args.into_iter()
        .map(|arg| {
            if SINGLE_DASH_FLAGS.contains(&arg.as_str()) {
                format!("-{}", arg)
            } else {
                arg
            }
        })
        .collect()
}

/// Everything loaded before the window opens.
struct Boot {
    config: ViewerConfig,
    mosaics: MosaicSet,
    catalog: Catalog,
    results: ResultSet,
    session: Session,
}

impl Boot {
    fn load(cli: &Cli) -> Result<Self, ViewerError> {
        let config = ViewerConfig::load(&cli.input)?;

        let entries = read_image_list(Path::new(&config.image_list))?;
        let mosaics = MosaicSet::open_all(&entries)?;
        let filters = mosaics.filter_names();

        let catalog = if is_remote(&config.input_photometry) {
            let bytes = fetch_bytes(&config.input_photometry, config.credentials.as_ref())?;
            let table = Table::from_bytes(&bytes).map_err(CatalogError::from)?;
            Catalog::from_table(&table, &filters)?
        } else {
            Catalog::load(Path::new(&config.input_photometry), &filters)?
        };

        let results = load_result_tables(&config);

        let selection = Selection::from_args(cli.id, cli.idlist.clone(), cli.idarglist.clone());
        let list = selection.viewing_list(&catalog)?;
        let display = DisplaySettings {
            stretch: config.default_stretch,
            crosshair: false,
            angular_size: config.angular_size,
        };
        let session = Session::new(list, catalog.len(), display);

        Ok(Self {
            config,
            mosaics,
            catalog,
            results,
            session,
        })
    }
}

/// Main application state
struct JadesView {
    config: ViewerConfig,
    mosaics: MosaicSet,
    catalog: Catalog,
    results: ResultSet,
    session: Session,
    /// Tiles for the object on screen, replaced in one piece
    thumbnails: Option<ThumbnailSet>,
    grid_cache: canvas::Cache,
    eazy_panel: PanelState,
    right_kind: SedKind,
    right_panel: PanelState,
    goto_entry: String,
    size_entry: String,
    note_entry: String,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    Next,
    Previous,
    GoToInput(String),
    GoToSubmit,
    Flag(Flag),
    NoteInput(String),
    Stretch(StretchMode),
    ToggleCrosshair,
    SizeInput(String),
    ApplySize,
    ShowRightPanel(SedKind),
    /// A background SED fetch finished
    SedLoaded {
        kind: SedKind,
        object_id: i64,
        result: Result<SedPanel, String>,
    },
    SaveCanvas,
    Screenshot(iced::window::Screenshot),
    Quit,
}

impl JadesView {
    fn new(boot: Boot) -> (Self, Task<Message>) {
        let right_kind = RIGHT_PANELS
            .into_iter()
            .find(|kind| kind.prefix(&boot.config).is_some())
            .unwrap_or(SedKind::Beagle);
        let size_entry = boot.session.display.angular_size.to_string();

        let mut app = JadesView {
            config: boot.config,
            mosaics: boot.mosaics,
            catalog: boot.catalog,
            results: boot.results,
            session: boot.session,
            thumbnails: None,
            grid_cache: canvas::Cache::new(),
            eazy_panel: PanelState::Disabled,
            right_kind,
            right_panel: PanelState::Disabled,
            goto_entry: String::new(),
            size_entry,
            note_entry: String::new(),
            status: String::from("Ready."),
        };
        info!(
            "🔭 JADESView initialized with {} objects, {} filters",
            app.catalog.len(),
            app.mosaics.len()
        );
        let task = app.show_current();
        (app, task)
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Next => self.navigate(Session::next),
            Message::Previous => self.navigate(Session::previous),
            Message::GoToInput(entry) => {
                self.goto_entry = entry;
                Task::none()
            }
            Message::GoToSubmit => {
                self.session.commit_note(&self.note_entry);
                match self.session.go_to(&self.goto_entry) {
                    Ok(id) => {
                        self.status = format!("Jumped to object {}.", id);
                        self.goto_entry.clear();
                        self.show_current()
                    }
                    Err(e) => {
                        warn!("⚠️  {}", e);
                        self.status = e.to_string();
                        Task::none()
                    }
                }
            }
            Message::Flag(flag) => {
                self.session.set_flag(flag);
                self.status = flag.message(self.session.current_id());
                Task::none()
            }
            Message::NoteInput(note) => {
                self.note_entry = note;
                Task::none()
            }
            Message::Stretch(stretch) => {
                self.session.set_stretch(stretch);
                self.status = format!("{} stretch.", stretch);
                self.rerender();
                Task::none()
            }
            Message::ToggleCrosshair => {
                let on = self.session.toggle_crosshair();
                self.status = format!("Crosshair {}.", if on { "on" } else { "off" });
                self.rerender();
                Task::none()
            }
            Message::SizeInput(entry) => {
                self.size_entry = entry;
                Task::none()
            }
            Message::ApplySize => {
                match self.session.set_angular_size(&self.size_entry) {
                    Ok(size) => {
                        self.status = format!("Cutout size {}\".", size);
                        self.rerender();
                    }
                    Err(e) => {
                        warn!("⚠️  {}", e);
                        self.status = e.to_string();
                    }
                }
                Task::none()
            }
            Message::ShowRightPanel(kind) => {
                if kind == self.right_kind {
                    return Task::none();
                }
                self.right_kind = kind;
                let task = self.panel_task(kind);
                self.right_panel = PanelState::new(task.is_some());
                task.unwrap_or_else(Task::none)
            }
            Message::SedLoaded {
                kind,
                object_id,
                result,
            } => {
                if object_id != self.session.current_id() {
                    debug!("Discarding {} plot for {}", kind, object_id);
                    return Task::none();
                }
                let state = match result {
                    Ok(panel) => PanelState::Ready(panel),
                    Err(e) => {
                        warn!("⚠️  {}", e);
                        PanelState::Failed(e)
                    }
                };
                if kind == SedKind::Eazy {
                    self.eazy_panel = state;
                } else if kind == self.right_kind {
                    self.right_panel = state;
                }
                Task::none()
            }
            Message::SaveCanvas => iced::window::get_latest()
                .and_then(iced::window::screenshot)
                .map(Message::Screenshot),
            Message::Screenshot(shot) => {
                let path = snapshot_path(Path::new("."), self.session.current_id());
                let saved = sheet_from_rgba(&shot.bytes, shot.size.width, shot.size.height)
                    .and_then(|sheet| save_sheet(&sheet, &path));
                self.status = match saved {
                    Ok(()) => format!("Saved {}.", path.display()),
                    Err(e) => {
                        error!("❌ {}", e);
                        e.to_string()
                    }
                };
                Task::none()
            }
            Message::Quit => self.quit(),
        }
    }

    /// Commit the note box, step, and refresh if the step moved.
    fn navigate(&mut self, step: fn(&mut Session) -> bool) -> Task<Message> {
        self.session.commit_note(&self.note_entry);
        if step(&mut self.session) {
            self.show_current()
        } else {
            Task::none()
        }
    }

    fn show_current(&mut self) -> Task<Message> {
        self.note_entry = self.session.current_note().to_string();
        self.rerender();
        self.fetch_panels()
    }

    fn rerender(&mut self) {
        let Some(object) = self.catalog.get(self.session.current_row()) else {
            warn!("⚠️  No catalog row for object {}", self.session.current_id());
            return;
        };
        let display = self.session.display;
        let options = RenderOptions {
            canvas_width: self.config.canvas_width,
            crosshair: display.crosshair,
        };
        self.thumbnails = Some(render_thumbnails(
            object,
            display.angular_size,
            display.stretch,
            &self.mosaics,
            &options,
        ));
        self.grid_cache.clear();
    }

    fn panel_task(&self, kind: SedKind) -> Option<Task<Message>> {
        let prefix = kind.prefix(&self.config)?.to_string();
        let object_id = self.session.current_id();
        Some(Task::perform(
            load_sed_plot(
                kind,
                prefix,
                object_id,
                self.config.credentials.clone(),
                self.config.canvas_width,
            ),
            move |result| Message::SedLoaded {
                kind,
                object_id,
                result: result.map_err(|e| e.to_string()),
            },
        ))
    }

    fn fetch_panels(&mut self) -> Task<Message> {
        let eazy = self.panel_task(SedKind::Eazy);
        let right = self.panel_task(self.right_kind);
        self.eazy_panel = PanelState::new(eazy.is_some());
        self.right_panel = PanelState::new(right.is_some());
        Task::batch(eazy.into_iter().chain(right))
    }

    /// Save the review and close; a failed save keeps the window open.
    fn quit(&mut self) -> Task<Message> {
        self.session.commit_note(&self.note_entry);
        match self.save_outputs() {
            Ok(()) => iced::exit(),
            Err(e) => {
                error!("❌ {}", e);
                self.status = format!("Could not save, not quitting: {}", e);
                Task::none()
            }
        }
    }

    fn save_outputs(&self) -> Result<(), ViewerError> {
        let ids: Vec<i64> = self.catalog.ids().collect();
        write_flags_file(&self.config.output_flags_file, &ids, self.session.flags())?;
        write_notes_file(&self.config.output_notes_file, &ids, self.session.notes())?;
        Ok(())
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let width = self.config.canvas_width;
        let sf = scale_factor(width);
        let text_size = (20.0 * sf).floor().max(8.0);
        let id = self.session.current_id();

        let plots = row![
            sed_panel(SedKind::Eazy, &self.eazy_panel, width / 2.0),
            sed_panel(self.right_kind, &self.right_panel, width / 2.0),
        ];

        let summary = self.results.summary(id);
        let estimates = row![
            summary_column(&summary, Side::Left, text_size).width(Length::FillPortion(1)),
            summary_column(&summary, Side::Right, text_size).width(Length::FillPortion(1)),
        ]
        .padding([0.0, 20.0 * sf]);

        let heading = match self.catalog.get(self.session.current_row()) {
            Some(object) => format!(
                "Object {}    RA {:.6}  DEC {:.6}    ({} / {})",
                id,
                object.ra,
                object.dec,
                self.session.position() + 1,
                self.session.list_len()
            ),
            None => format!("Object {}", id),
        };

        let grid: Element<Message> = match &self.thumbnails {
            Some(set) => canvas(ThumbnailGrid {
                set,
                cache: &self.grid_cache,
            })
            .width(Length::Fixed(width))
            .height(Length::Fixed(ThumbnailGrid::height(set)))
            .into(),
            None => text("No thumbnails").into(),
        };

        let content = column![
            plots,
            estimates,
            text(heading).size(text_size),
            grid,
            self.controls(),
            text(&self.status).size(16),
        ]
        .spacing(10)
        .padding(10)
        .align_x(Alignment::Start);

        container(scrollable(content))
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn controls(&self) -> Element<Message> {
        let flags = self.session.current_flags();
        let flag_button = |label: &'static str, flag: Flag, raised: bool| -> Element<'static, Message> {
            button(label)
                .on_press(Message::Flag(flag))
                .style(if raised { button::danger } else { button::secondary })
                .padding(8)
                .into()
        };

        let mut buttons: Vec<Element<Message>> = vec![
            button("Previous").on_press(Message::Previous).padding(8).into(),
            button("Next").on_press(Message::Next).padding(8).into(),
            flag_button("High-z", Flag::HighZ, flags.high_z),
            flag_button("Bad Fit", Flag::BadFit, flags.bad_fit),
            flag_button("Bad Data", Flag::BadData, flags.bad_data),
        ];
        for stretch in StretchMode::ALL {
            let active = stretch == self.session.display.stretch;
            buttons.push(
                button(text(stretch.to_string()))
                    .on_press(Message::Stretch(stretch))
                    .style(if active { button::primary } else { button::secondary })
                    .padding(8)
                    .into(),
            );
        }
        buttons.push(
            button("Crosshair")
                .on_press(Message::ToggleCrosshair)
                .style(if self.session.display.crosshair {
                    button::primary
                } else {
                    button::secondary
                })
                .padding(8)
                .into(),
        );
        for kind in RIGHT_PANELS {
            if kind.prefix(&self.config).is_some() {
                buttons.push(
                    button(text(kind.to_string()))
                        .on_press(Message::ShowRightPanel(kind))
                        .style(if kind == self.right_kind {
                            button::primary
                        } else {
                            button::secondary
                        })
                        .padding(8)
                        .into(),
                );
            }
        }
        buttons.push(button("Save Canvas").on_press(Message::SaveCanvas).padding(8).into());
        buttons.push(
            button("Quit")
                .on_press(Message::Quit)
                .style(button::danger)
                .padding(8)
                .into(),
        );

        let mut entries = row![
            text("Size (\")"),
            text_input("2.0", &self.size_entry)
                .on_input(Message::SizeInput)
                .on_submit(Message::ApplySize)
                .width(Length::Fixed(80.0)),
            button("Apply").on_press(Message::ApplySize),
        ]
        .spacing(8)
        .align_y(Alignment::Center);
        if self.session.go_to_enabled() {
            entries = entries.push(text("Go to ID")).push(
                text_input("ID", &self.goto_entry)
                    .on_input(Message::GoToInput)
                    .on_submit(Message::GoToSubmit)
                    .width(Length::Fixed(120.0)),
            );
        }
        let notes = row![
            text("Notes"),
            text_input("Notes on this object", &self.note_entry)
                .on_input(Message::NoteInput)
                .width(Length::Fill),
        ]
        .spacing(8)
        .align_y(Alignment::Center);

        column![
            Wrap::with_elements(buttons).spacing(8.0).line_spacing(8.0),
            entries,
            notes,
        ]
        .spacing(10)
        .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Light
    }
}

fn init_logging(timing: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if timing {
        builder.filter(Some(TIMING_TARGET), log::LevelFilter::Debug);
    }
    builder.init();
}

fn main() -> ExitCode {
    let cli = Cli::parse_from(normalize_args(std::env::args()));
    init_logging(cli.tverb.is_some());

    let boot = match Boot::load(&cli) {
        Ok(boot) => boot,
        Err(e) => {
            error!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };

    let window = canvas_size(boot.config.canvas_width);
    let result = iced::application("JADESView", JadesView::update, JadesView::view)
        .theme(JadesView::theme)
        .window_size(Size::new(window.width + 40.0, window.height + 360.0))
        .run_with(move || JadesView::new(boot));

    match result.map_err(ViewerError::from) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}
