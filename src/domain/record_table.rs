use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};

use super::incident::{schema, Process, Severity};

/// Read-back incidents coerced to the declared schema.
///
/// Columns are always exactly [`schema::ALL`], in order; rows are sorted by
/// event date + time descending, with unparseable datetimes pushed to the
/// bottom. Spreadsheet cells are always text, so every value stays a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTable {
    rows: Vec<Vec<String>>,
}

/// Client-side history filters. Empty selections mean "no filter".
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub severities: Vec<Severity>,
    pub processes: Vec<Process>,
    pub keyword: Option<String>,
}

fn column_index(name: &str) -> usize {
    schema::ALL
        .iter()
        .position(|col| *col == name)
        .unwrap_or_else(|| unreachable!("{name} is not a schema column"))
}

// USER_ENTERED appends let the backend reformat typed dates, so read-back
// cells may carry the sheet's locale form (d/m/Y) instead of ISO.
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

fn parse_event_datetime(date: &str, time: &str) -> Option<NaiveDateTime> {
    let text = format!("{} {}", date.trim(), time.trim());
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&text, format).ok())
}

fn parse_event_date(date: &str) -> Option<NaiveDate> {
    let text = date.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

impl RecordTable {
    pub fn columns() -> &'static [&'static str] {
        &schema::ALL
    }

    /// Normalizes raw mapping-per-row records into the declared shape.
    ///
    /// Columns absent from a raw row are synthesized as empty strings. The
    /// sort key is derived, used for ordering, and not part of the output.
    pub fn from_raw_records(records: Vec<HashMap<String, String>>) -> Self {
        let date_idx = column_index(schema::EVENT_DATE);
        let time_idx = column_index(schema::EVENT_TIME);

        let mut keyed: Vec<(Option<NaiveDateTime>, Vec<String>)> = records
            .into_iter()
            .map(|mut record| {
                let row: Vec<String> = schema::ALL
                    .iter()
                    .map(|col| record.remove(*col).unwrap_or_default())
                    .collect();
                let key = parse_event_datetime(&row[date_idx], &row[time_idx]);
                (key, row)
            })
            .collect();

        // Descending, unparseable last.
        keyed.sort_by(|(a, _), (b, _)| match (a, b) {
            (Some(a), Some(b)) => b.cmp(a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        RecordTable {
            rows: keyed.into_iter().map(|(_, row)| row).collect(),
        }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows matching the filter, in the table's existing order.
    ///
    /// Rows whose event date does not parse pass the date-range check, so a
    /// malformed date never hides a record from the history view.
    pub fn filtered(&self, filter: &RecordFilter) -> RecordTable {
        let date_idx = column_index(schema::EVENT_DATE);
        let process_idx = column_index(schema::PROCESS);
        let drug_idx = column_index(schema::DRUG_NAME);
        let severity_idx = column_index(schema::SEVERITY);
        let details_idx = column_index(schema::DETAILS);

        let keyword = filter
            .keyword
            .as_deref()
            .map(str::trim)
            .filter(|kw| !kw.is_empty())
            .map(str::to_lowercase);

        let rows = self
            .rows
            .iter()
            .filter(|row| {
                if let Some(event_date) = parse_event_date(&row[date_idx]) {
                    if filter.date_from.is_some_and(|from| event_date < from) {
                        return false;
                    }
                    if filter.date_to.is_some_and(|to| event_date > to) {
                        return false;
                    }
                }

                if !filter.severities.is_empty()
                    && !filter
                        .severities
                        .iter()
                        .any(|s| s.to_string() == row[severity_idx])
                {
                    return false;
                }

                if !filter.processes.is_empty()
                    && !filter
                        .processes
                        .iter()
                        .any(|p| p.to_string() == row[process_idx])
                {
                    return false;
                }

                if let Some(kw) = &keyword {
                    let drug = row[drug_idx].to_lowercase();
                    let details = row[details_idx].to_lowercase();
                    if !drug.contains(kw) && !details.contains(kw) {
                        return false;
                    }
                }

                true
            })
            .cloned()
            .collect();

        RecordTable { rows }
    }

    /// Count of rows with severity E through I.
    pub fn high_severity_count(&self) -> usize {
        let severity_idx = column_index(schema::SEVERITY);
        self.rows
            .iter()
            .filter(|row| {
                Severity::from_str(row[severity_idx].trim())
                    .map(|s| s.is_high())
                    .unwrap_or(false)
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn cell<'t>(table: &'t RecordTable, row: usize, col: &str) -> &'t str {
        &table.rows()[row][column_index(col)]
    }

    #[test]
    fn empty_input_yields_empty_table_with_full_schema() {
        let table = RecordTable::from_raw_records(Vec::new());
        assert!(table.is_empty());
        assert_eq!(RecordTable::columns(), &schema::ALL);
    }

    #[test]
    fn missing_columns_are_synthesized_blank() {
        let table = RecordTable::from_raw_records(vec![record(&[(schema::DRUG_NAME, "Warfarin")])]);
        assert_eq!(table.len(), 1);
        assert_eq!(cell(&table, 0, schema::DRUG_NAME), "Warfarin");
        assert_eq!(cell(&table, 0, schema::DETAILS), "");
        assert_eq!(table.rows()[0].len(), schema::ALL.len());
    }

    #[test]
    fn rows_sort_descending_by_event_datetime() {
        let table = RecordTable::from_raw_records(vec![
            record(&[
                (schema::EVENT_DATE, "2024-01-09"),
                (schema::EVENT_TIME, "23:59"),
                (schema::DRUG_NAME, "older"),
            ]),
            record(&[
                (schema::EVENT_DATE, "2024-01-10"),
                (schema::EVENT_TIME, "09:00"),
                (schema::DRUG_NAME, "newer"),
            ]),
        ]);
        assert_eq!(cell(&table, 0, schema::DRUG_NAME), "newer");
        assert_eq!(cell(&table, 1, schema::DRUG_NAME), "older");
    }

    #[test]
    fn unparseable_event_datetime_sorts_last() {
        let table = RecordTable::from_raw_records(vec![
            record(&[
                (schema::EVENT_DATE, "not a date"),
                (schema::EVENT_TIME, "??"),
                (schema::DRUG_NAME, "broken"),
            ]),
            record(&[
                (schema::EVENT_DATE, "2020-05-05"),
                (schema::EVENT_TIME, "08:00"),
                (schema::DRUG_NAME, "old but valid"),
            ]),
        ]);
        assert_eq!(cell(&table, 0, schema::DRUG_NAME), "old but valid");
        assert_eq!(cell(&table, 1, schema::DRUG_NAME), "broken");
    }

    #[test]
    fn seconds_in_event_time_still_parse() {
        assert!(parse_event_datetime("2024-01-10", "09:00:30").is_some());
        assert!(parse_event_datetime("2024-01-10", "09:00").is_some());
        assert!(parse_event_datetime("2024-13-10", "09:00").is_none());
    }

    #[test]
    fn locale_formatted_dates_parse_and_sort() {
        // 10/1/2024 is the backend's d/m/Y rendering of 2024-01-10.
        assert_eq!(
            parse_event_datetime("10/1/2024", "09:00"),
            parse_event_datetime("2024-01-10", "09:00"),
        );

        let table = RecordTable::from_raw_records(vec![
            record(&[
                (schema::EVENT_DATE, "9/1/2024"),
                (schema::EVENT_TIME, "23:59"),
                (schema::DRUG_NAME, "older"),
            ]),
            record(&[
                (schema::EVENT_DATE, "2024-01-10"),
                (schema::EVENT_TIME, "09:00"),
                (schema::DRUG_NAME, "newer"),
            ]),
        ]);
        assert_eq!(cell(&table, 0, schema::DRUG_NAME), "newer");
        assert_eq!(cell(&table, 1, schema::DRUG_NAME), "older");
    }

    #[test]
    fn date_range_filter_accepts_locale_formatted_dates() {
        let table = RecordTable::from_raw_records(vec![record(&[
            (schema::EVENT_DATE, "10/1/2024"),
            (schema::EVENT_TIME, "09:00"),
            (schema::DRUG_NAME, "Insulin"),
        ])]);

        let inside = RecordFilter {
            date_from: NaiveDate::from_ymd_opt(2024, 1, 8),
            date_to: NaiveDate::from_ymd_opt(2024, 1, 31),
            ..Default::default()
        };
        assert_eq!(table.filtered(&inside).len(), 1);

        let outside = RecordFilter {
            date_to: NaiveDate::from_ymd_opt(2023, 12, 31),
            ..Default::default()
        };
        assert!(table.filtered(&outside).is_empty());
    }

    fn sample_table() -> RecordTable {
        RecordTable::from_raw_records(vec![
            record(&[
                (schema::EVENT_DATE, "2024-01-10"),
                (schema::EVENT_TIME, "09:00"),
                (schema::PROCESS, "ให้ยา"),
                (schema::DRUG_NAME, "Insulin"),
                (schema::SEVERITY, "C"),
                (schema::DETAILS, "overdose"),
            ]),
            record(&[
                (schema::EVENT_DATE, "2024-01-05"),
                (schema::EVENT_TIME, "14:30"),
                (schema::PROCESS, "สั่งใช้ยา"),
                (schema::DRUG_NAME, "Warfarin"),
                (schema::SEVERITY, "F"),
                (schema::DETAILS, "wrong dose prescribed"),
            ]),
            record(&[
                (schema::EVENT_DATE, "garbage"),
                (schema::EVENT_TIME, ""),
                (schema::PROCESS, "ให้ยา"),
                (schema::DRUG_NAME, "Ceftriaxone"),
                (schema::SEVERITY, "E"),
                (schema::DETAILS, "expired batch"),
            ]),
        ])
    }

    #[test]
    fn date_range_filter_keeps_unparseable_dates() {
        let filter = RecordFilter {
            date_from: NaiveDate::from_ymd_opt(2024, 1, 8),
            date_to: NaiveDate::from_ymd_opt(2024, 1, 31),
            ..Default::default()
        };
        let filtered = sample_table().filtered(&filter);
        let drugs: Vec<&str> = filtered
            .rows()
            .iter()
            .map(|row| row[column_index(schema::DRUG_NAME)].as_str())
            .collect();
        assert_eq!(drugs, vec!["Insulin", "Ceftriaxone"]);
    }

    #[test]
    fn severity_and_process_multiselect() {
        let filter = RecordFilter {
            severities: vec![Severity::E, Severity::F],
            ..Default::default()
        };
        assert_eq!(sample_table().filtered(&filter).len(), 2);

        let filter = RecordFilter {
            severities: vec![Severity::F],
            processes: vec![Process::Administration],
            ..Default::default()
        };
        assert!(sample_table().filtered(&filter).is_empty());
    }

    #[test]
    fn keyword_matches_drug_and_details_case_insensitive() {
        let filter = RecordFilter {
            keyword: Some("INSULIN".to_string()),
            ..Default::default()
        };
        assert_eq!(sample_table().filtered(&filter).len(), 1);

        let filter = RecordFilter {
            keyword: Some("dose".to_string()),
            ..Default::default()
        };
        // "overdose" and "wrong dose prescribed"
        assert_eq!(sample_table().filtered(&filter).len(), 2);

        let filter = RecordFilter {
            keyword: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(sample_table().filtered(&filter).len(), 3);
    }

    #[test]
    fn high_severity_metric_counts_e_through_i() {
        assert_eq!(sample_table().high_severity_count(), 2);
    }
}
