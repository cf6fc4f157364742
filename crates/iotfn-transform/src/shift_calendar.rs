//! Shift calendar generation and the as-of merge of batch rows onto it.
//!
//! The calendar has one row per (day, shift) over the batch's date range.
//! Each batch row is matched to the latest shift whose start is at or before
//! its timestamp. Overnight shifts end on the following day.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use serde::Deserialize;
use tracing::debug;

use iotfn_model::{
    CalendarLimits, ConfigError, EvaluationError, FunctionCategory, FunctionError,
    FunctionMetadata, ItemTag, RowOrder, ShiftDefinition,
};

use crate::datetime::{
    date_column, datetime_column, from_millis, timestamp_millis, to_epoch_days, to_millis,
};
use crate::frame::{check_distinct_outputs, engine_error, require_name};
use crate::function::{EntityFunction, ExecutionContext};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

fn default_shift_start_date() -> String {
    "shift_start_date".to_string()
}

fn default_shift_end_date() -> String {
    "shift_end_date".to_string()
}

fn default_shift_day() -> String {
    "shift_day".to_string()
}

fn default_shift_id() -> String {
    "shift_id".to_string()
}

/// Configuration for [`ShiftCalendar`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShiftCalendarConfig {
    #[serde(default)]
    pub shift_definition: ShiftDefinition,
    #[serde(default = "default_shift_start_date")]
    pub shift_start_date: String,
    #[serde(default = "default_shift_end_date")]
    pub shift_end_date: String,
    #[serde(default = "default_shift_day")]
    pub shift_day: String,
    #[serde(default = "default_shift_id")]
    pub shift_id: String,
    #[serde(default)]
    pub row_order: RowOrder,
    #[serde(default)]
    pub limits: CalendarLimits,
}

impl Default for ShiftCalendarConfig {
    fn default() -> Self {
        Self {
            shift_definition: ShiftDefinition::default(),
            shift_start_date: default_shift_start_date(),
            shift_end_date: default_shift_end_date(),
            shift_day: default_shift_day(),
            shift_id: default_shift_id(),
            row_order: RowOrder::default(),
            limits: CalendarLimits::default(),
        }
    }
}

impl ShiftCalendarConfig {
    pub fn with_definition(definition: ShiftDefinition) -> Self {
        Self {
            shift_definition: definition,
            ..Self::default()
        }
    }
}

/// Calendar rows in ascending start order.
#[derive(Debug, Default)]
struct Calendar {
    days: Vec<i32>,
    ids: Vec<String>,
    starts: Vec<i64>,
    ends: Vec<i64>,
}

impl Calendar {
    fn len(&self) -> usize {
        self.starts.len()
    }

    /// Index of the latest row starting at or before `timestamp`.
    fn lookup(&self, timestamp: i64) -> Option<usize> {
        self.starts
            .partition_point(|start| *start <= timestamp)
            .checked_sub(1)
    }
}

/// Assigns each row to the shift it falls in.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftCalendar {
    definition: ShiftDefinition,
    shift_start_date: String,
    shift_end_date: String,
    shift_day: String,
    shift_id: String,
    row_order: RowOrder,
    limits: CalendarLimits,
}

impl ShiftCalendar {
    pub const NAME: &'static str = "ShiftCalendar";

    pub fn describe() -> FunctionMetadata {
        FunctionMetadata::new(
            Self::NAME,
            FunctionCategory::Transformer,
            "Generate data for a shift calendar from a shift definition keyed on shift id.",
        )
        .with_inputs(&["shift_definition"])
        .with_constants(&["shift_definition"])
        .with_outputs(&["shift_start_date", "shift_end_date", "shift_day", "shift_id"])
        .with_item_tag("shift_start_date", ItemTag::Dimension)
        .with_item_tag("shift_day", ItemTag::Dimension)
        .with_item_tag("shift_id", ItemTag::Dimension)
    }

    pub fn new(config: ShiftCalendarConfig) -> Result<Self, ConfigError> {
        Self::try_from(config)
    }

    pub fn definition(&self) -> &ShiftDefinition {
        &self.definition
    }

    /// Generate the calendar for every day in `[start.date(), end.date()]`.
    ///
    /// Columns are shift day, shift id, shift start and shift end, sorted by
    /// shift start. An inverted range yields an empty calendar.
    pub fn generate(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<DataFrame, EvaluationError> {
        let calendar = self.build(start.date(), end.date())?;
        self.calendar_frame(&calendar)
    }

    /// A calendar with no rows and the usual schema.
    pub fn empty_calendar(&self) -> Result<DataFrame, EvaluationError> {
        self.calendar_frame(&Calendar::default())
    }

    fn build(&self, first: NaiveDate, last: NaiveDate) -> Result<Calendar, EvaluationError> {
        let span = (last - first).num_days();
        if span < 0 {
            return Ok(Calendar::default());
        }
        let days = usize::try_from(span + 1).unwrap_or(usize::MAX);
        let shifts = self.definition.len();
        if days > self.limits.max_days || days.saturating_mul(shifts) > self.limits.max_rows {
            return Err(EvaluationError::CalendarTooLarge {
                days,
                shifts,
                max_rows: self.limits.max_rows,
            });
        }

        let mut rows: Vec<(i32, &str, i64, i64)> = Vec::with_capacity(days * shifts);
        for shift in self.definition.shifts() {
            let start_offset = (shift.start_hours * MILLIS_PER_HOUR).round() as i64;
            let end_offset = (shift.end_hours * MILLIS_PER_HOUR).round() as i64;
            for day in first.iter_days().take(days) {
                let midnight = to_millis(day.and_time(NaiveTime::MIN));
                rows.push((
                    to_epoch_days(day),
                    shift.id.as_str(),
                    midnight.saturating_add(start_offset),
                    midnight.saturating_add(end_offset),
                ));
            }
        }
        rows.sort_by_key(|row| row.2);

        let mut calendar = Calendar::default();
        for (day, id, start, end) in rows {
            calendar.days.push(day);
            calendar.ids.push(id.to_string());
            calendar.starts.push(start);
            calendar.ends.push(end);
        }
        debug!(days, shifts, rows = calendar.len(), "generated shift calendar");
        Ok(calendar)
    }

    fn calendar_frame(&self, calendar: &Calendar) -> Result<DataFrame, EvaluationError> {
        let columns = vec![
            date_column(
                &self.shift_day,
                calendar.days.iter().copied().map(Some).collect(),
            )
            .map_err(engine_error)?,
            Column::new(self.shift_id.as_str().into(), calendar.ids.clone()),
            datetime_column(
                &self.shift_start_date,
                calendar.starts.iter().copied().map(Some).collect(),
            )
            .map_err(engine_error)?,
            datetime_column(
                &self.shift_end_date,
                calendar.ends.iter().copied().map(Some).collect(),
            )
            .map_err(engine_error)?,
        ];
        DataFrame::new(columns).map_err(engine_error)
    }

    /// Shift columns for each row, matched by timestamp.
    fn shift_columns(
        &self,
        calendar: &Calendar,
        timestamps: &[Option<i64>],
    ) -> Result<Vec<Column>, EvaluationError> {
        let matches: Vec<Option<usize>> = timestamps
            .iter()
            .map(|ts| ts.and_then(|ts| calendar.lookup(ts)))
            .collect();
        let days = matches.iter().map(|m| m.map(|i| calendar.days[i])).collect();
        let ids: Vec<Option<&str>> = matches
            .iter()
            .map(|m| m.map(|i| calendar.ids[i].as_str()))
            .collect();
        let starts = matches.iter().map(|m| m.map(|i| calendar.starts[i])).collect();
        let ends = matches.iter().map(|m| m.map(|i| calendar.ends[i])).collect();
        Ok(vec![
            datetime_column(&self.shift_start_date, starts).map_err(engine_error)?,
            datetime_column(&self.shift_end_date, ends).map_err(engine_error)?,
            date_column(&self.shift_day, days).map_err(engine_error)?,
            Column::new(self.shift_id.as_str().into(), ids),
        ])
    }
}

/// Stable row order: entities grouped by first appearance, then ascending
/// timestamp with nulls last.
fn sorted_order(groups: &[usize], timestamps: &[Option<i64>]) -> Result<IdxCa, EvaluationError> {
    let mut order: Vec<usize> = (0..timestamps.len()).collect();
    order.sort_by_key(|&i| (groups[i], timestamps[i].is_none(), timestamps[i]));
    let indices = order
        .into_iter()
        .map(IdxSize::try_from)
        .collect::<Result<Vec<IdxSize>, _>>()
        .map_err(|err| EvaluationError::Engine(err.to_string()))?;
    Ok(IdxCa::from_vec("order".into(), indices))
}

/// Group number per row for the entity id column; rows without an id sort
/// last. A frame without the column is a single group.
fn entity_groups(df: &DataFrame, column: &str) -> Result<Vec<usize>, EvaluationError> {
    let Ok(ids) = df.column(column) else {
        return Ok(vec![0; df.height()]);
    };
    let ids = ids.cast(&DataType::String).map_err(engine_error)?;
    let mut seen: HashMap<String, usize> = HashMap::new();
    let groups = ids
        .str()
        .map_err(engine_error)?
        .into_iter()
        .map(|id| match id {
            Some(id) => {
                let next = seen.len();
                *seen.entry(id.to_string()).or_insert(next)
            }
            None => usize::MAX,
        })
        .collect();
    Ok(groups)
}

impl TryFrom<ShiftCalendarConfig> for ShiftCalendar {
    type Error = ConfigError;

    fn try_from(config: ShiftCalendarConfig) -> Result<Self, Self::Error> {
        config.limits.validate()?;
        let shift_start_date = require_name("shift_start_date", config.shift_start_date)?;
        let shift_end_date = require_name("shift_end_date", config.shift_end_date)?;
        let shift_day = require_name("shift_day", config.shift_day)?;
        let shift_id = require_name("shift_id", config.shift_id)?;
        check_distinct_outputs(&[&shift_start_date, &shift_end_date, &shift_day, &shift_id])?;
        Ok(Self {
            definition: config.shift_definition,
            shift_start_date,
            shift_end_date,
            shift_day,
            shift_id,
            row_order: config.row_order,
            limits: config.limits,
        })
    }
}

impl EntityFunction for ShiftCalendar {
    fn metadata(&self) -> FunctionMetadata {
        Self::describe()
    }

    fn execute(
        &self,
        df: &DataFrame,
        ctx: &mut ExecutionContext,
    ) -> Result<DataFrame, FunctionError> {
        let timestamp_column = ctx.entity_type.timestamp_column.as_str();
        let timestamps = timestamp_millis(df, timestamp_column)?;

        let observed = timestamps.iter().flatten().copied();
        let calendar = match (observed.clone().min(), observed.max()) {
            (Some(min), Some(max)) => {
                match (from_millis(min), from_millis(max)) {
                    (Some(first), Some(last)) => self.build(first.date(), last.date())?,
                    _ => Calendar::default(),
                }
            }
            _ => Calendar::default(),
        };

        let mut out = df.clone();
        for column in self.shift_columns(&calendar, &timestamps)? {
            out.with_column(column).map_err(engine_error)?;
        }
        if self.row_order == RowOrder::SortByTimestamp {
            let groups = entity_groups(df, &ctx.entity_type.entity_id_column)?;
            out = out
                .take(&sorted_order(&groups, &timestamps)?)
                .map_err(engine_error)?;
        }
        debug!(
            rows = out.height(),
            calendar_rows = calendar.len(),
            "merged rows onto shift calendar"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iotfn_model::{EntityType, SchemaError};

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn three_shifts() -> ShiftCalendar {
        let definition = ShiftDefinition::from_pairs([
            ("1", vec![0.0, 8.0]),
            ("2", vec![8.0, 16.0]),
            ("3", vec![16.0, 24.0]),
        ])
        .unwrap();
        ShiftCalendar::new(ShiftCalendarConfig::with_definition(definition)).unwrap()
    }

    fn batch(times: &[Option<NaiveDateTime>]) -> DataFrame {
        let millis: Vec<Option<i64>> = times.iter().map(|t| t.map(to_millis)).collect();
        let values: Vec<f64> = (0..times.len()).map(|i| i as f64).collect();
        DataFrame::new(vec![
            datetime_column("evt_timestamp", millis).unwrap(),
            Column::new("reading".into(), values),
        ])
        .unwrap()
    }

    fn datetimes(df: &DataFrame, name: &str) -> Vec<Option<NaiveDateTime>> {
        timestamp_millis(df, name)
            .unwrap()
            .into_iter()
            .map(|v| v.and_then(from_millis))
            .collect()
    }

    fn ids(df: &DataFrame) -> Vec<Option<String>> {
        df.column("shift_id")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    #[test]
    fn test_generate_single_day() {
        let calendar = three_shifts().generate(at(1, 3, 0), at(1, 22, 0)).unwrap();
        assert_eq!(calendar.height(), 3);
        assert_eq!(
            datetimes(&calendar, "shift_start_date"),
            vec![Some(at(1, 0, 0)), Some(at(1, 8, 0)), Some(at(1, 16, 0))]
        );
        assert_eq!(
            datetimes(&calendar, "shift_end_date"),
            vec![Some(at(1, 8, 0)), Some(at(1, 16, 0)), Some(at(2, 0, 0))]
        );
        assert_eq!(
            calendar.get_column_names_str(),
            vec!["shift_day", "shift_id", "shift_start_date", "shift_end_date"]
        );
    }

    #[test]
    fn test_generate_overnight_default_definition() {
        let shifts = ShiftCalendar::new(ShiftCalendarConfig::default()).unwrap();
        let calendar = shifts.generate(at(1, 0, 0), at(2, 0, 0)).unwrap();
        assert_eq!(calendar.height(), 6);
        let starts = datetimes(&calendar, "shift_start_date");
        assert_eq!(starts[0], Some(at(1, 5, 30)));
        assert_eq!(starts[5], Some(at(2, 21, 0)));
        let ends = datetimes(&calendar, "shift_end_date");
        assert_eq!(ends[2], Some(at(2, 5, 30)));
    }

    #[test]
    fn test_generate_inverted_range_is_empty() {
        let calendar = three_shifts().generate(at(5, 0, 0), at(4, 0, 0)).unwrap();
        assert_eq!(calendar.height(), 0);
        assert_eq!(calendar.schema(), three_shifts().empty_calendar().unwrap().schema());
    }

    #[test]
    fn test_generate_respects_limits() {
        let mut config = ShiftCalendarConfig::default();
        config.limits.max_days = 2;
        let shifts = ShiftCalendar::new(config).unwrap();
        assert!(matches!(
            shifts.generate(at(1, 0, 0), at(10, 0, 0)),
            Err(EvaluationError::CalendarTooLarge { days: 10, shifts: 3, .. })
        ));
    }

    #[test]
    fn test_merge_assigns_shift() {
        let df = batch(&[Some(at(1, 9, 0)), Some(at(1, 0, 0)), Some(at(1, 23, 59))]);
        let out = three_shifts()
            .execute(&df, &mut ExecutionContext::default())
            .unwrap();
        assert_eq!(out.height(), 3);
        assert_eq!(
            ids(&out),
            vec![Some("2".to_string()), Some("1".to_string()), Some("3".to_string())]
        );
        assert_eq!(
            datetimes(&out, "shift_start_date")[0],
            Some(at(1, 8, 0))
        );
        let readings: Vec<Option<f64>> = out.column("reading").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(readings, vec![Some(0.0), Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_rows_before_first_shift_are_null() {
        let shifts = ShiftCalendar::new(ShiftCalendarConfig::default()).unwrap();
        let df = batch(&[Some(at(1, 2, 0)), Some(at(1, 6, 0)), None]);
        let out = shifts.execute(&df, &mut ExecutionContext::default()).unwrap();
        assert_eq!(ids(&out), vec![None, Some("1".to_string()), None]);
        assert_eq!(out.column("shift_day").unwrap().null_count(), 2);
    }

    #[test]
    fn test_overnight_shift_covers_next_morning() {
        let shifts = ShiftCalendar::new(ShiftCalendarConfig::default()).unwrap();
        let df = batch(&[Some(at(1, 22, 0)), Some(at(2, 4, 0))]);
        let out = shifts.execute(&df, &mut ExecutionContext::default()).unwrap();
        assert_eq!(ids(&out), vec![Some("3".to_string()), Some("3".to_string())]);
        let days: Vec<Option<i32>> = out
            .column("shift_day")
            .unwrap()
            .cast(&DataType::Int32)
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .collect();
        let first_day = to_epoch_days(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(days, vec![Some(first_day), Some(first_day)]);
    }

    #[test]
    fn test_row_order_policy() {
        let df = batch(&[Some(at(1, 20, 0)), None, Some(at(1, 9, 0))]);
        let preserved = three_shifts()
            .execute(&df, &mut ExecutionContext::default())
            .unwrap();
        assert_eq!(
            ids(&preserved),
            vec![Some("3".to_string()), None, Some("2".to_string())]
        );

        let mut config = ShiftCalendarConfig::with_definition(three_shifts().definition().clone());
        config.row_order = RowOrder::SortByTimestamp;
        let sorted = ShiftCalendar::new(config)
            .unwrap()
            .execute(&df, &mut ExecutionContext::default())
            .unwrap();
        assert_eq!(
            ids(&sorted),
            vec![Some("2".to_string()), Some("3".to_string()), None]
        );
        let readings: Vec<Option<f64>> = sorted.column("reading").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(readings, vec![Some(2.0), Some(0.0), Some(1.0)]);
    }

    #[test]
    fn test_sorted_rows_group_by_entity() {
        let mut df = batch(&[
            Some(at(1, 20, 0)),
            Some(at(1, 9, 0)),
            Some(at(1, 3, 0)),
            Some(at(1, 12, 0)),
            Some(at(1, 1, 0)),
        ]);
        df.with_column(Column::new(
            "deviceid".into(),
            vec![Some(7i64), Some(3), Some(7), Some(3), None],
        ))
        .unwrap();
        let mut config = ShiftCalendarConfig::with_definition(three_shifts().definition().clone());
        config.row_order = RowOrder::SortByTimestamp;
        let sorted = ShiftCalendar::new(config)
            .unwrap()
            .execute(&df, &mut ExecutionContext::default())
            .unwrap();
        let readings: Vec<Option<f64>> = sorted.column("reading").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(
            readings,
            vec![Some(2.0), Some(0.0), Some(1.0), Some(3.0), Some(4.0)]
        );
    }

    #[test]
    fn test_shift_starting_after_midnight_of_next_day() {
        let definition = ShiftDefinition::from_pairs([("late", vec![25.0, 30.0])]).unwrap();
        let shifts = ShiftCalendar::new(ShiftCalendarConfig::with_definition(definition)).unwrap();
        let calendar = shifts.generate(at(1, 0, 0), at(1, 0, 0)).unwrap();
        assert_eq!(datetimes(&calendar, "shift_start_date"), vec![Some(at(2, 1, 0))]);
        assert_eq!(datetimes(&calendar, "shift_end_date"), vec![Some(at(2, 6, 0))]);

        let df = batch(&[Some(at(1, 3, 0)), Some(at(2, 2, 0))]);
        let out = shifts.execute(&df, &mut ExecutionContext::default()).unwrap();
        assert_eq!(ids(&out), vec![None, Some("late".to_string())]);
    }

    #[test]
    fn test_custom_timestamp_column() {
        let df = batch(&[Some(at(1, 9, 0))])
            .rename("evt_timestamp", "ts".into())
            .unwrap()
            .clone();
        let mut ctx = ExecutionContext::new(EntityType::new("pump").with_timestamp_column("ts"));
        let out = three_shifts().execute(&df, &mut ctx).unwrap();
        assert_eq!(ids(&out), vec![Some("2".to_string())]);

        let err = three_shifts()
            .execute(&df, &mut ExecutionContext::default())
            .unwrap_err();
        assert_eq!(
            err,
            FunctionError::Schema(SchemaError::MissingColumn("evt_timestamp".to_string()))
        );
    }

    #[test]
    fn test_metadata_dimension_tags() {
        let meta = three_shifts().metadata();
        assert_eq!(meta.tags_for("shift_id"), &[ItemTag::Dimension]);
        assert_eq!(meta.tags_for("shift_day"), &[ItemTag::Dimension]);
        assert!(meta.tags_for("shift_end_date").is_empty());
        assert!(!meta.is_event());
    }
}
