//! Spreadsheet-backed durable store.
//!
//! One worksheet holds the playlist: a fixed header in row 1 and one entry
//! per row below it, columns as in [`record::HEADER`](crate::record::HEADER).
//! Talks to the Sheets v4 REST API with a service-account bearer token.

pub mod auth;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, Url};
use serde::Deserialize;
use serde_json::json;

use crate::record::{PersistenceRecord, HEADER};
use crate::{DbError, PersistenceAdapter};

use self::auth::{ServiceAccountKey, TokenProvider};

/// Public Sheets API endpoint.
pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";

/// Default worksheet name.
pub const DEFAULT_SHEET_NAME: &str = "Playlist";

/// Connection settings for [`SheetsAdapter`].
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    /// Spreadsheet identifier (the long id in the document URL).
    pub spreadsheet_id: String,
    /// Path to the service-account key file.
    pub credentials_path: PathBuf,
    /// Worksheet holding the rows.
    pub sheet_name: String,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// API base URL; overridable for testing against a stub.
    pub api_base: String,
}

impl SheetsConfig {
    pub fn new(spreadsheet_id: impl Into<String>, credentials_path: impl Into<PathBuf>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            credentials_path: credentials_path.into(),
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            request_timeout: Duration::from_secs(10),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// API payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// SheetsAdapter
// ---------------------------------------------------------------------------

/// Durable store backed by a spreadsheet worksheet.
///
/// Only constructed through [`SheetsAdapter::connect`], which proves the
/// backend reachable; an existing adapter therefore reports available.
pub struct SheetsAdapter {
    config: SheetsConfig,
    client: reqwest::Client,
    tokens: TokenProvider,
    /// Numeric id of the worksheet, needed for row deletion.
    sheet_id: i64,
}

impl SheetsAdapter {
    /// Authenticate, make sure the worksheet exists and write the header.
    pub async fn connect(config: SheetsConfig) -> Result<Self, DbError> {
        let key = ServiceAccountKey::from_file(&config.credentials_path).await?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let tokens = TokenProvider::new(key, client.clone())?;

        let mut adapter = Self {
            config,
            client,
            tokens,
            sheet_id: 0,
        };
        adapter.sheet_id = adapter.ensure_sheet().await?;
        adapter.write_header().await?;

        tracing::info!(
            spreadsheet_id = %adapter.config.spreadsheet_id,
            sheet = %adapter.config.sheet_name,
            "Spreadsheet backend connected",
        );
        Ok(adapter)
    }

    /// Look up the worksheet id, creating the worksheet if it is missing.
    async fn ensure_sheet(&self) -> Result<i64, DbError> {
        let mut url = self.spreadsheet_url("")?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties(sheetId,title)");
        let response = self.send(self.client.get(url)).await?;
        let spreadsheet: Spreadsheet = response.json().await?;

        if let Some(sheet) = spreadsheet
            .sheets
            .iter()
            .find(|s| s.properties.title == self.config.sheet_name)
        {
            return Ok(sheet.properties.sheet_id);
        }

        tracing::info!(sheet = %self.config.sheet_name, "Creating worksheet");
        let body = json!({
            "requests": [{
                "addSheet": { "properties": { "title": self.config.sheet_name } }
            }]
        });
        let reply = self.batch_update(body).await?;
        reply
            .replies
            .first()
            .and_then(|r| r["addSheet"]["properties"]["sheetId"].as_i64())
            .ok_or_else(|| DbError::Malformed("addSheet reply without sheetId".into()))
    }

    async fn write_header(&self) -> Result<(), DbError> {
        let range = a1_range(&self.config.sheet_name, "A1:G1");
        let mut url = self.values_url(&range, "")?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let body = json!({ "values": [HEADER] });
        self.send(self.client.put(url).json(&body)).await?;
        Ok(())
    }

    async fn batch_update(&self, body: serde_json::Value) -> Result<BatchUpdateResponse, DbError> {
        let url = self.spreadsheet_url(":batchUpdate")?;
        let response = self.send(self.client.post(url).json(&body)).await?;
        Ok(response.json().await?)
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, DbError> {
        let url = self.values_url(range, "")?;
        let response = self.send(self.client.get(url)).await?;
        let body: ValueRange = response.json().await?;
        Ok(body.values)
    }

    /// Attach the bearer token, send, and turn non-2xx into [`DbError::Status`].
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, DbError> {
        let token = self.tokens.access_token().await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(DbError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// `{base}/v4/spreadsheets/{id}{suffix}`
    fn spreadsheet_url(&self, suffix: &str) -> Result<Url, DbError> {
        let id = format!("{}{suffix}", self.config.spreadsheet_id);
        build_url(&self.config.api_base, &["v4", "spreadsheets", &id])
    }

    /// `{base}/v4/spreadsheets/{id}/values/{range}{suffix}`
    fn values_url(&self, range: &str, suffix: &str) -> Result<Url, DbError> {
        let range = format!("{range}{suffix}");
        build_url(
            &self.config.api_base,
            &["v4", "spreadsheets", &self.config.spreadsheet_id, "values", &range],
        )
    }
}

#[async_trait]
impl PersistenceAdapter for SheetsAdapter {
    fn is_available(&self) -> bool {
        true
    }

    async fn load_all(&self) -> Result<Vec<PersistenceRecord>, DbError> {
        let rows = self
            .get_values(&a1_range(&self.config.sheet_name, "A2:G"))
            .await?;
        Ok(records_from_rows(&rows))
    }

    async fn append(&self, record: &PersistenceRecord) -> Result<(), DbError> {
        let range = a1_range(&self.config.sheet_name, "A:G");
        let mut url = self.values_url(&range, ":append")?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let body = json!({ "values": [record.to_row()] });
        self.send(self.client.post(url).json(&body)).await?;

        tracing::debug!(entry_id = %record.id, "Row appended to spreadsheet");
        Ok(())
    }

    async fn remove_by_id(&self, id: &str) -> Result<bool, DbError> {
        let column = self
            .get_values(&a1_range(&self.config.sheet_name, "A:A"))
            .await?;
        let Some(row_index) = find_data_row(&column, id) else {
            return Ok(false);
        };

        let body = json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": self.sheet_id,
                        "dimension": "ROWS",
                        "startIndex": row_index,
                        "endIndex": row_index + 1,
                    }
                }
            }]
        });
        self.batch_update(body).await?;

        tracing::debug!(entry_id = %id, row_index, "Row deleted from spreadsheet");
        Ok(true)
    }

    async fn clear_all(&self) -> Result<(), DbError> {
        let range = a1_range(&self.config.sheet_name, "A2:G");
        let url = self.values_url(&range, ":clear")?;
        self.send(self.client.post(url).json(&json!({}))).await?;

        tracing::debug!("Spreadsheet rows cleared");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A1-notation range on a named worksheet, quoting the name when needed.
fn a1_range(sheet: &str, cells: &str) -> String {
    let plain = !sheet.is_empty() && sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        format!("{sheet}!{cells}")
    } else {
        format!("'{}'!{cells}", sheet.replace('\'', "''"))
    }
}

fn build_url(base: &str, segments: &[&str]) -> Result<Url, DbError> {
    let mut url =
        Url::parse(base).map_err(|e| DbError::Malformed(format!("invalid API base {base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| DbError::Malformed(format!("API base {base} cannot take a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Data rows (header excluded) to records; rows without an id are skipped.
fn records_from_rows(rows: &[Vec<String>]) -> Vec<PersistenceRecord> {
    rows.iter()
        .map(|row| PersistenceRecord::from_row(row))
        .filter(|record| !record.id.trim().is_empty())
        .collect()
}

/// Zero-based sheet row index of the first data row whose first cell is
/// `id`. `column` is column A including the header row.
fn find_data_row(column: &[Vec<String>], id: &str) -> Option<usize> {
    column
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, row)| row.first().map(String::as_str) == Some(id))
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn a1_range_quotes_names_with_spaces() {
        assert_eq!(a1_range("Playlist", "A2:G"), "Playlist!A2:G");
        assert_eq!(a1_range("Road Trip", "A:A"), "'Road Trip'!A:A");
        assert_eq!(a1_range("Bob's", "A:A"), "'Bob''s'!A:A");
    }

    #[test]
    fn values_url_keeps_range_and_suffix() {
        let url = build_url(
            "https://sheets.example.com",
            &["v4", "spreadsheets", "abc", "values", "Playlist!A:G:append"],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.example.com/v4/spreadsheets/abc/values/Playlist!A:G:append"
        );
    }

    #[test]
    fn values_url_encodes_spaces() {
        let url = build_url("https://sheets.example.com/", &["values", "'Road Trip'!A:A"]).unwrap();
        assert!(url.as_str().ends_with("/values/'Road%20Trip'!A:A"));
    }

    #[test]
    fn records_skip_rows_without_id() {
        let rows = vec![
            row(&["a", "T1", "A1"]),
            row(&["", "stray", "cell"]),
            row(&["b", "T2", "A2", "", "", "Bob", "2024-01-01T00:00:00Z"]),
        ];
        let records = records_from_rows(&rows);
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn find_data_row_ignores_header() {
        let column = vec![row(&["ID"]), row(&["a"]), row(&[]), row(&["b"])];
        assert_eq!(find_data_row(&column, "b"), Some(3));
        assert_eq!(find_data_row(&column, "ID"), None);
        assert_eq!(find_data_row(&column, "zzz"), None);
    }

    #[test]
    fn value_range_without_values_is_empty() {
        let body: ValueRange = serde_json::from_str(r#"{"range":"Playlist!A2:G"}"#).unwrap();
        assert!(body.values.is_empty());
    }
}
