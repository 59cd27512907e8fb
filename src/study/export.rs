use core::cmp::Ordering;
use core::fmt;
use std::collections::{BTreeSet, HashMap};
use std::io;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::frozen::FrozenTrial;
use crate::param::ParamValue;
use crate::trial::AttrValue;
use crate::types::{TrialId, TrialState};

use super::Study;

/// The second level of a column key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InnerKey {
    /// A scalar field has no inner key.
    None,
    /// An intermediate-value step.
    Step(u64),
    /// A parameter or attribute name.
    Name(String),
}

impl fmt::Display for InnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InnerKey::None => Ok(()),
            InnerKey::Step(step) => write!(f, "{step}"),
            InnerKey::Name(name) => f.write_str(name),
        }
    }
}

/// A two-level column key: the [`FrozenTrial`] field and, for map fields,
/// the entry's key.
///
/// Columns order by field declaration order first, then by inner key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Column {
    /// One of [`FrozenTrial::FIELDS`].
    pub field: &'static str,
    /// The map key, or [`InnerKey::None`] for scalar fields.
    pub key: InnerKey,
}

impl Column {
    fn scalar(field: &'static str) -> Self {
        Self {
            field,
            key: InnerKey::None,
        }
    }

    fn named(field: &'static str, name: &str) -> Self {
        Self {
            field,
            key: InnerKey::Name(name.to_string()),
        }
    }

    fn field_position(&self) -> usize {
        FrozenTrial::FIELDS
            .iter()
            .position(|f| *f == self.field)
            .unwrap_or(usize::MAX)
    }
}

impl Ord for Column {
    fn cmp(&self, other: &Self) -> Ordering {
        self.field_position()
            .cmp(&other.field_position())
            .then_with(|| self.key.cmp(&other.key))
    }
}

impl PartialOrd for Column {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One cell of a [`TrialsTable`].
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    /// The trial has no value for this column.
    Empty,
    /// A trial id.
    Id(TrialId),
    /// A trial state.
    State(TrialState),
    /// An objective or intermediate value.
    Float(f64),
    /// A timestamp.
    DateTime(DateTime<Utc>),
    /// A parameter value.
    Param(ParamValue),
    /// An attribute value.
    Attr(AttrValue),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Id(id) => write!(f, "{id}"),
            Cell::State(state) => write!(f, "{state}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::DateTime(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S%.6f")),
            Cell::Param(v) => write!(f, "{v}"),
            Cell::Attr(v) => write!(f, "{v}"),
        }
    }
}

/// All trials of a study flattened into rows and two-level columns.
///
/// Map fields (`params`, `user_attrs`, `system_attrs`,
/// `intermediate_values`) contribute one column per key seen in any trial.
/// Sampler-internal fields are never exported.
///
/// # Examples
///
/// ```
/// use trialrun::{Cell, ParamValue, Study, Trial};
///
/// let study = Study::builder().build().unwrap();
/// study
///     .optimize_n(1, |trial: &mut Trial| {
///         let x = trial.suggest_int("x", 1, 1)?;
///         Ok::<_, trialrun::Error>(x)
///     })
///     .unwrap();
///
/// let table = study.trials_table().unwrap();
/// assert_eq!(table.get(0, "params", "x"), Some(&Cell::Param(ParamValue::Int(1))));
/// assert!(table.column("params_in_internal_repr", "x").is_none());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrialsTable {
    columns: Vec<Column>,
    rows: Vec<Vec<Cell>>,
}

impl TrialsTable {
    pub(crate) fn from_trials(trials: &[FrozenTrial]) -> Self {
        let flattened: Vec<Vec<(Column, Cell)>> = trials.iter().map(flatten).collect();

        let columns: Vec<Column> = flattened
            .iter()
            .flatten()
            .map(|(column, _)| column.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index: HashMap<&Column, usize> =
            columns.iter().enumerate().map(|(i, c)| (c, i)).collect();

        let rows = flattened
            .iter()
            .map(|cells| {
                let mut row = vec![Cell::Empty; columns.len()];
                for (column, cell) in cells {
                    if let Some(&i) = index.get(column) {
                        row[i] = cell.clone();
                    }
                }
                row
            })
            .collect();

        Self { columns, rows }
    }

    /// The columns, in display order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// One row per trial, each with one cell per column.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The index of the column `(field, key)`. Scalar fields use `""`.
    #[must_use]
    pub fn column(&self, field: &str, key: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.field == field && c.key.to_string() == key)
    }

    /// The cell at `row` in column `(field, key)`.
    #[must_use]
    pub fn get(&self, row: usize, field: &str, key: &str) -> Option<&Cell> {
        let column = self.column(field, key)?;
        self.rows.get(row).map(|r| &r[column])
    }

    /// Write the table as CSV.
    ///
    /// The first header row holds the field names, the second the inner
    /// keys (empty for scalar fields).
    ///
    /// # Errors
    ///
    /// Returns an I/O error if writing fails.
    pub fn to_csv(&self, mut writer: impl io::Write) -> io::Result<()> {
        let fields: Vec<String> = self.columns.iter().map(|c| csv_escape(c.field)).collect();
        writeln!(writer, "{}", fields.join(","))?;
        let keys: Vec<String> = self
            .columns
            .iter()
            .map(|c| csv_escape(&c.key.to_string()))
            .collect();
        writeln!(writer, "{}", keys.join(","))?;

        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(|c| csv_escape(&c.to_string())).collect();
            writeln!(writer, "{}", cells.join(","))?;
        }
        Ok(())
    }
}

fn flatten(trial: &FrozenTrial) -> Vec<(Column, Cell)> {
    let optional_time = |t: Option<DateTime<Utc>>| t.map_or(Cell::Empty, Cell::DateTime);

    let mut cells = vec![
        (Column::scalar("trial_id"), Cell::Id(trial.trial_id)),
        (Column::scalar("state"), Cell::State(trial.state)),
        (
            Column::scalar("value"),
            trial.value.map_or(Cell::Empty, Cell::Float),
        ),
        (
            Column::scalar("datetime_start"),
            optional_time(trial.datetime_start),
        ),
        (
            Column::scalar("datetime_complete"),
            optional_time(trial.datetime_complete),
        ),
    ];
    cells.extend(
        trial
            .params
            .iter()
            .map(|(name, v)| (Column::named("params", name), Cell::Param(v.clone()))),
    );
    cells.extend(
        trial
            .user_attrs
            .iter()
            .map(|(key, v)| (Column::named("user_attrs", key), Cell::Attr(v.clone()))),
    );
    cells.extend(
        trial
            .system_attrs
            .iter()
            .map(|(key, v)| (Column::named("system_attrs", key), Cell::Attr(v.clone()))),
    );
    cells.extend(trial.intermediate_values.iter().map(|(&step, &v)| {
        (
            Column {
                field: "intermediate_values",
                key: InnerKey::Step(step),
            },
            Cell::Float(v),
        )
    }));
    cells
}

/// Quote a CSV field if it contains a delimiter, quote, or line break.
fn csv_escape(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

impl Study {
    /// Flatten every trial of the study into a [`TrialsTable`].
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn trials_table(&self) -> Result<TrialsTable> {
        Ok(TrialsTable::from_trials(&self.trials()?))
    }

    /// Write the trials table to a CSV file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the trials cannot be read or the file cannot
    /// be written.
    pub fn export_csv(&self, path: impl AsRef<std::path::Path>) -> io::Result<()> {
        let table = self.trials_table().map_err(io::Error::other)?;
        let file = std::fs::File::create(path)?;
        table.to_csv(io::BufWriter::new(file))
    }

    /// Write every trial as a pretty-printed JSON array to `path`.
    ///
    /// Requires the `serde` feature.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the trials cannot be read or the file cannot
    /// be written.
    #[cfg(feature = "serde")]
    pub fn export_json(&self, path: impl AsRef<std::path::Path>) -> io::Result<()> {
        let trials = self.trials().map_err(io::Error::other)?;
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(io::BufWriter::new(file), &trials).map_err(io::Error::other)
    }
}
