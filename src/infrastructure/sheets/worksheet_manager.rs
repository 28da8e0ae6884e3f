use std::collections::HashMap;
use std::fmt::Debug;

use error_stack::ResultExt;
use google_sheets4::api::{
    AddSheetRequest, BatchUpdateSpreadsheetRequest, GridProperties, Request, SheetProperties,
    ValueRange,
};
use google_sheets4::{hyper, hyper_rustls, Sheets};
use thiserror::Error;
use tracing::instrument;

use crate::config::sheets_config::ResolvedSheetConfig;
use crate::domain::incident::schema;

use super::value_range_factory::ValueRangeFactory;
use super::{auth, http_client};

/// Capacity given to a worksheet created on first use.
const DEFAULT_ROW_CAPACITY: i32 = 1000;
const DEFAULT_COLUMN_CAPACITY: i32 = 26;

#[derive(Error, Debug)]
pub enum WorksheetError {
    #[error("Failed to authenticate service account")]
    AuthFailed,
    #[error("Failed to open spreadsheet")]
    OpenFailed,
    #[error("Failed to create worksheet")]
    CreateFailed,
    #[error("Failed to read header row")]
    HeaderReadFailed,
    #[error("Failed to write header row")]
    HeaderWriteFailed,
    #[error("Failed to append incident row")]
    AppendFailed,
    #[error("Failed to read incident rows")]
    ReadFailed,
}

/// Handle to the single worksheet backing the incident log.
///
/// Opening authenticates, creates the worksheet if it is missing and repairs
/// the header row, so a freshly opened handle is always ready for
/// append/read. Construction is expensive; callers cache the handle.
pub struct WorksheetManager {
    config: ResolvedSheetConfig,
    hub: Sheets<hyper_rustls::HttpsConnector<hyper::client::HttpConnector>>,
}

impl Debug for WorksheetManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WorksheetManager {{ config: {:?} }}", self.config)
    }
}

fn quoted_range(worksheet: &str, range: &str) -> String {
    format!("'{}'!{}", worksheet.replace('\'', "''"), range)
}

fn quoted_sheet(worksheet: &str) -> String {
    format!("'{}'", worksheet.replace('\'', "''"))
}

// Schema stays well under 26 columns.
fn column_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

fn header_range() -> String {
    format!("A1:{}1", column_letter(schema::ALL.len() - 1))
}

/// True when row 1 does not start with the expected column sequence.
/// Extra trailing columns are tolerated.
pub fn needs_header_repair(current: &[String]) -> bool {
    current.len() < schema::ALL.len()
        || current[..schema::ALL.len()]
            .iter()
            .map(String::as_str)
            .ne(schema::ALL)
}

fn cell_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Maps raw sheet values to one map per data row, header row first, with
/// blank defaults for cells the backend omitted.
pub fn records_from_values(values: Vec<Vec<serde_json::Value>>) -> Vec<HashMap<String, String>> {
    let mut rows = values.into_iter();
    let Some(header) = rows.next() else {
        return Vec::new();
    };
    let header: Vec<String> = header.iter().map(cell_to_string).collect();

    rows.map(|raw| {
        header
            .iter()
            .enumerate()
            .map(|(index, column)| {
                (
                    column.clone(),
                    raw.get(index).map(cell_to_string).unwrap_or_default(),
                )
            })
            .collect()
    })
    .collect()
}

impl WorksheetManager {
    /// Authenticates, opens the spreadsheet and leaves the worksheet ready
    /// for append/read.
    #[instrument(name = "WorksheetManager::open", skip(config), fields(worksheet = %config.worksheet))]
    pub async fn open(config: ResolvedSheetConfig) -> error_stack::Result<Self, WorksheetError> {
        let client = http_client::http_client();
        let auth = auth::auth(config.credentials.clone(), client.clone()).await?;
        let hub = Sheets::new(client, auth);

        let manager = WorksheetManager { config, hub };
        manager.ensure_worksheet().await?;
        manager.ensure_headers().await?;
        Ok(manager)
    }

    async fn ensure_worksheet(&self) -> error_stack::Result<(), WorksheetError> {
        let response = self
            .hub
            .spreadsheets()
            .get(&self.config.spreadsheet_id)
            .doit()
            .await
            .change_context(WorksheetError::OpenFailed)
            .attach_printable_lazy(|| format!("spreadsheet id {}", self.config.spreadsheet_id))?;

        let exists = response.1.sheets.unwrap_or_default().iter().any(|sheet| {
            sheet.properties.as_ref().and_then(|p| p.title.as_deref())
                == Some(self.config.worksheet.as_str())
        });
        if exists {
            return Ok(());
        }

        tracing::info!(worksheet = %self.config.worksheet, "worksheet missing, creating it");
        let request = BatchUpdateSpreadsheetRequest {
            requests: Some(vec![Request {
                add_sheet: Some(AddSheetRequest {
                    properties: Some(SheetProperties {
                        title: Some(self.config.worksheet.clone()),
                        grid_properties: Some(GridProperties {
                            row_count: Some(DEFAULT_ROW_CAPACITY),
                            column_count: Some(DEFAULT_COLUMN_CAPACITY),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }),
                }),
                ..Default::default()
            }]),
            ..Default::default()
        };

        self.hub
            .spreadsheets()
            .batch_update(request, &self.config.spreadsheet_id)
            .doit()
            .await
            .map(|_| ())
            .change_context(WorksheetError::CreateFailed)
            .attach_printable_lazy(|| format!("worksheet {}", self.config.worksheet))
    }

    /// Reads row 1 and rewrites it when it diverges from the schema.
    /// Idempotent; returns whether a write happened.
    #[instrument(skip(self))]
    pub async fn ensure_headers(&self) -> error_stack::Result<bool, WorksheetError> {
        let response = self
            .hub
            .spreadsheets()
            .values_get(
                &self.config.spreadsheet_id,
                &quoted_range(&self.config.worksheet, "1:1"),
            )
            .doit()
            .await
            .change_context(WorksheetError::HeaderReadFailed)?;

        let current: Vec<String> = response
            .1
            .values
            .unwrap_or_default()
            .into_iter()
            .next()
            .unwrap_or_default()
            .iter()
            .map(cell_to_string)
            .collect();

        if !needs_header_repair(&current) {
            return Ok(false);
        }

        tracing::info!(worksheet = %self.config.worksheet, "header row divergent, rewriting");
        self.hub
            .spreadsheets()
            .values_update(
                ValueRange::from_single_row(&schema::ALL),
                &self.config.spreadsheet_id,
                &quoted_range(&self.config.worksheet, &header_range()),
            )
            .value_input_option("RAW")
            .doit()
            .await
            .change_context(WorksheetError::HeaderWriteFailed)?;
        Ok(true)
    }

    /// Single atomic append. USER_ENTERED lets the backend coerce dates and
    /// numbers typed as text instead of storing them literally.
    #[instrument(skip(self, row))]
    pub async fn append_row(&self, row: &[String]) -> error_stack::Result<(), WorksheetError> {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        self.hub
            .spreadsheets()
            .values_append(
                ValueRange::from_single_row(&cells),
                &self.config.spreadsheet_id,
                &quoted_range(&self.config.worksheet, "A1"),
            )
            .value_input_option("USER_ENTERED")
            .doit()
            .await
            .map(|_| ())
            .change_context(WorksheetError::AppendFailed)
            .attach_printable_lazy(|| format!("worksheet {}", self.config.worksheet))
    }

    /// All data rows as column → cell maps; empty when only headers exist.
    #[instrument(skip(self))]
    pub async fn read_records(
        &self,
    ) -> error_stack::Result<Vec<HashMap<String, String>>, WorksheetError> {
        let response = self
            .hub
            .spreadsheets()
            .values_get(
                &self.config.spreadsheet_id,
                &quoted_sheet(&self.config.worksheet),
            )
            .doit()
            .await
            .change_context(WorksheetError::ReadFailed)
            .attach_printable_lazy(|| format!("worksheet {}", self.config.worksheet))?;

        Ok(records_from_values(response.1.values.unwrap_or_default()))
    }
}
