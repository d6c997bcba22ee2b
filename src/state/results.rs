/// Redshift-pipeline result tables
///
/// Five optional, ID-keyed lookups: EAZY, BEAGLE, the neural-network
/// estimator, the colour (dropout) selection and BAGPIPES. A missing row
/// reads as the `-9999` sentinel for numbers and `false` for booleans.
use log::{info, warn};
use std::collections::HashMap;
use thiserror::Error;

use super::data::{format_number, round_to};
use super::table::{Column, Table, TableError};

/// Value shown for a number the table has no row for.
pub const MISSING_VALUE: &str = "-9999";

/// Decimals kept for redshifts.
const REDSHIFT_DECIMALS: i32 = 4;

/// Decimals kept for probabilities.
const PROBABILITY_DECIMALS: i32 = 2;

#[derive(Error, Debug)]
pub enum ResultsError {
    #[error("{kind} results: {source}")]
    Table {
        kind: ResultKind,
        source: TableError,
    },
    #[error("{kind} results row {row} has no valid ID")]
    BadId { kind: ResultKind, row: usize },
}

/// The five result sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultKind {
    Eazy,
    Beagle,
    NeuralNet,
    ColorSelection,
    Bagpipes,
}

impl ResultKind {
    pub const ALL: [ResultKind; 5] = [
        ResultKind::Eazy,
        ResultKind::Beagle,
        ResultKind::NeuralNet,
        ResultKind::ColorSelection,
        ResultKind::Bagpipes,
    ];

    /// Manifest key naming the table.
    pub fn manifest_key(self) -> &'static str {
        match self {
            ResultKind::Eazy => "EAZY_results",
            ResultKind::Beagle => "BEAGLE_results",
            ResultKind::NeuralNet => "NN_results",
            ResultKind::ColorSelection => "color_selection_results",
            ResultKind::Bagpipes => "BAGPIPES_results",
        }
    }

    fn id_column(self) -> &'static str {
        match self {
            ResultKind::NeuralNet => "ID_PHOTOMETRIC",
            _ => "ID",
        }
    }

    /// Columns that must be present for the table to be usable.
    fn required_columns(self) -> &'static [&'static str] {
        match self {
            ResultKind::Eazy => &["z_peak", "z_a", "l68", "u68"],
            ResultKind::Beagle => &[
                "redshift_beagle_mean",
                "redshift_beagle_1",
                "redshift_beagle_err_1",
                "redshift_beagle_2",
                "redshift_beagle_err_2",
                "redshift_68.0_low",
                "redshift_68.0_up",
                "redshift_p_gt_2.0",
                "redshift_p_gt_4.0",
                "redshift_p_gt_6.0",
            ],
            ResultKind::NeuralNet => &["pred_z", "USE"],
            ResultKind::ColorSelection => &[
                "NRC_F090W_Dropout_SNR3.0",
                "NRC_F115W_Dropout_SNR3.0",
                "NRC_F150W_Dropout_SNR3.0",
            ],
            ResultKind::Bagpipes => &["redshift_mean"],
        }
    }

    /// BAGPIPES numbers its runs from 0 while catalog IDs start at 1.
    fn id_offset(self) -> i64 {
        match self {
            ResultKind::Bagpipes => -1,
            _ => 0,
        }
    }
}

impl std::fmt::Display for ResultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResultKind::Eazy => "EAZY",
            ResultKind::Beagle => "BEAGLE",
            ResultKind::NeuralNet => "NN",
            ResultKind::ColorSelection => "color selection",
            ResultKind::Bagpipes => "BAGPIPES",
        };
        write!(f, "{}", name)
    }
}

/// One result table indexed by object ID.
#[derive(Debug, Clone)]
pub struct ResultTable {
    kind: ResultKind,
    table: Table,
    rows: HashMap<i64, usize>,
}

impl ResultTable {
    pub fn new(kind: ResultKind, table: Table) -> Result<Self, ResultsError> {
        let table_error = |source| ResultsError::Table { kind, source };
        for column in kind.required_columns() {
            table.column(column).map_err(table_error)?;
        }
        let ids = table.column(kind.id_column()).map_err(table_error)?;

        let mut rows = HashMap::with_capacity(table.rows());
        for row in 0..table.rows() {
            let id = ids.integer(row).ok_or(ResultsError::BadId { kind, row })?;
            rows.entry(id).or_insert(row);
        }
        info!("✅ Loaded {} {} results", rows.len(), kind);
        Ok(Self { kind, table, rows })
    }

    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    fn row_for(&self, id: i64) -> Option<usize> {
        self.rows.get(&(id + self.kind.id_offset())).copied()
    }

    fn column(&self, name: &str) -> Option<&Column> {
        self.table.column(name).ok()
    }

    /// Rounded numeric value, `None` when the object has no row.
    pub fn value(&self, id: i64, column: &str, decimals: i32) -> Option<f64> {
        let row = self.row_for(id)?;
        self.column(column)?.real(row).map(|v| round_to(v, decimals))
    }

    /// Boolean value, `false` when the object has no row.
    pub fn flag(&self, id: i64, column: &str) -> bool {
        self.row_for(id)
            .and_then(|row| self.column(column)?.flag(row))
            .unwrap_or(false)
    }

    fn redshift(&self, id: i64, column: &str) -> Option<f64> {
        self.value(id, column, REDSHIFT_DECIMALS)
    }

    fn probability(&self, id: i64, column: &str) -> Option<f64> {
        self.value(id, column, PROBABILITY_DECIMALS)
    }
}

/// Display text for a looked-up number.
pub fn display_value(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING_VALUE.to_string(), format_number)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EazyEstimate {
    pub z_peak: Option<f64>,
    pub z_a: Option<f64>,
    pub l68: Option<f64>,
    pub u68: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeagleEstimate {
    pub z_avg: Option<f64>,
    pub z_l68: Option<f64>,
    pub z_u68: Option<f64>,
    pub z_1: Option<f64>,
    pub z_1_err: Option<f64>,
    pub z_2: Option<f64>,
    pub z_2_err: Option<f64>,
    pub p_gt_2: Option<f64>,
    pub p_gt_4: Option<f64>,
    pub p_gt_6: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeuralNetEstimate {
    pub z_pred: Option<f64>,
    /// Spectroscopic redshift, when the table carries `true_z`.
    pub z_spec: Option<Option<f64>>,
    pub usable: bool,
}

/// Bluest band an object drops out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dropout {
    F090W,
    F115W,
    F150W,
}

impl Dropout {
    /// In priority order.
    const ALL: [(Dropout, &'static str); 3] = [
        (Dropout::F090W, "NRC_F090W_Dropout_SNR3.0"),
        (Dropout::F115W, "NRC_F115W_Dropout_SNR3.0"),
        (Dropout::F150W, "NRC_F150W_Dropout_SNR3.0"),
    ];

    pub fn label(self) -> &'static str {
        match self {
            Dropout::F090W => "F090W Dropout",
            Dropout::F115W => "F115W Dropout",
            Dropout::F150W => "F150W Dropout",
        }
    }
}

/// Colour of a summary line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Eazy,
    Beagle,
    Estimate,
    Muted,
    Spectroscopic,
    Plain,
}

/// Which side of the results panel a line belongs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLine {
    pub text: String,
    pub tone: Tone,
    pub side: Side,
}

impl SummaryLine {
    fn new(text: String, tone: Tone, side: Side) -> Self {
        Self { text, tone, side }
    }
}

/// Every result table that loaded.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    tables: HashMap<ResultKind, ResultTable>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: ResultTable) {
        self.tables.insert(table.kind(), table);
    }

    pub fn is_enabled(&self, kind: ResultKind) -> bool {
        self.tables.contains_key(&kind)
    }

    /// Build a table from raw data, disabling the source (with a warning)
    /// when the columns are wrong.
    pub fn load(&mut self, kind: ResultKind, table: Table) {
        match ResultTable::new(kind, table) {
            Ok(table) => self.insert(table),
            Err(e) => warn!("⚠️  {}; disabling {} results", e, kind),
        }
    }

    fn get(&self, kind: ResultKind) -> Option<&ResultTable> {
        self.tables.get(&kind)
    }

    pub fn eazy(&self, id: i64) -> Option<EazyEstimate> {
        let t = self.get(ResultKind::Eazy)?;
        Some(EazyEstimate {
            z_peak: t.redshift(id, "z_peak"),
            z_a: t.redshift(id, "z_a"),
            l68: t.redshift(id, "l68"),
            u68: t.redshift(id, "u68"),
        })
    }

    pub fn beagle(&self, id: i64) -> Option<BeagleEstimate> {
        let t = self.get(ResultKind::Beagle)?;
        Some(BeagleEstimate {
            z_avg: t.redshift(id, "redshift_beagle_mean"),
            z_l68: t.redshift(id, "redshift_68.0_low"),
            z_u68: t.redshift(id, "redshift_68.0_up"),
            z_1: t.redshift(id, "redshift_beagle_1"),
            z_1_err: t.redshift(id, "redshift_beagle_err_1"),
            z_2: t.redshift(id, "redshift_beagle_2"),
            z_2_err: t.redshift(id, "redshift_beagle_err_2"),
            p_gt_2: t.probability(id, "redshift_p_gt_2.0"),
            p_gt_4: t.probability(id, "redshift_p_gt_4.0"),
            p_gt_6: t.probability(id, "redshift_p_gt_6.0"),
        })
    }

    pub fn neural_net(&self, id: i64) -> Option<NeuralNetEstimate> {
        let t = self.get(ResultKind::NeuralNet)?;
        let z_spec = t
            .column("true_z")
            .map(|_| t.redshift(id, "true_z"));
        Some(NeuralNetEstimate {
            z_pred: t.redshift(id, "pred_z"),
            z_spec,
            usable: t.flag(id, "USE"),
        })
    }

    /// `Some(None)` when the table is loaded but the object is no dropout.
    pub fn dropout(&self, id: i64) -> Option<Option<Dropout>> {
        let t = self.get(ResultKind::ColorSelection)?;
        Some(
            Dropout::ALL
                .iter()
                .find(|(_, column)| t.flag(id, column))
                .map(|(dropout, _)| *dropout),
        )
    }

    pub fn bagpipes(&self, id: i64) -> Option<Option<f64>> {
        let t = self.get(ResultKind::Bagpipes)?;
        Some(t.redshift(id, "redshift_mean"))
    }

    /// Text lines for the results panel, in display order.
    pub fn summary(&self, id: i64) -> Vec<SummaryLine> {
        let mut lines = Vec::new();

        if let Some(e) = self.eazy(id) {
            lines.push(SummaryLine::new(
                format!(
                    "z_EAZY, peak = {} ({} - {})",
                    display_value(e.z_peak),
                    display_value(e.l68),
                    display_value(e.u68)
                ),
                Tone::Eazy,
                Side::Left,
            ));
            lines.push(SummaryLine::new(
                format!("z_EAZY, a = {}", display_value(e.z_a)),
                Tone::Eazy,
                Side::Left,
            ));
        }

        if let Some(b) = self.beagle(id) {
            lines.push(SummaryLine::new(
                format!(
                    "z_BEAGLE,avg = {} ({} - {})",
                    display_value(b.z_avg),
                    display_value(b.z_l68),
                    display_value(b.z_u68)
                ),
                Tone::Beagle,
                Side::Left,
            ));
            lines.push(SummaryLine::new(
                format!(
                    "z_BEAGLE,1 = {} +/- {}",
                    display_value(b.z_1),
                    display_value(b.z_1_err)
                ),
                Tone::Beagle,
                Side::Left,
            ));
            lines.push(SummaryLine::new(
                format!(
                    "z_BEAGLE,2 = {} +/- {}",
                    display_value(b.z_2),
                    display_value(b.z_2_err)
                ),
                Tone::Beagle,
                Side::Left,
            ));
            lines.push(SummaryLine::new(
                format!(
                    "P(z > 2) = {}, P(z > 4) = {}, P(z > 6) = {}",
                    display_value(b.p_gt_2),
                    display_value(b.p_gt_4),
                    display_value(b.p_gt_6)
                ),
                Tone::Beagle,
                Side::Left,
            ));
        }

        if let Some(nn) = self.neural_net(id) {
            let (text, tone) = if nn.usable {
                (format!("z_NN = {}", display_value(nn.z_pred)), Tone::Estimate)
            } else {
                (
                    format!("z_NN = {} (USE = F)", display_value(nn.z_pred)),
                    Tone::Muted,
                )
            };
            lines.push(SummaryLine::new(text, tone, Side::Right));
            if let Some(z_spec) = nn.z_spec {
                lines.push(SummaryLine::new(
                    format!("z_spec = {}", display_value(z_spec)),
                    Tone::Spectroscopic,
                    Side::Right,
                ));
            }
        }

        if let Some(z) = self.bagpipes(id) {
            lines.push(SummaryLine::new(
                format!("z_BAGPIPES = {}", display_value(z)),
                Tone::Estimate,
                Side::Right,
            ));
        }

        if let Some(Some(dropout)) = self.dropout(id) {
            lines.push(SummaryLine::new(
                dropout.label().to_string(),
                Tone::Plain,
                Side::Right,
            ));
        }

        lines
    }
}
