//! Implements the `Sheet` trait against the Google Sheets API through `sheets::Client`.

use crate::api::{AuthHandle, Sheet, SheetRange, TabProperties, A1};
use crate::error::Res;
use anyhow::{bail, Context};
use serde::Serialize;
use sheets::types::{
    AddSheetRequest, BatchUpdateSpreadsheetRequest, BatchUpdateSpreadsheetResponse,
    BatchUpdateValuesRequest, DateTimeRenderOption, DeleteDimensionRequest, Dimension,
    DimensionRange, InsertDataOption, Request, SheetProperties, ValueInputOption, ValueRange,
    ValueRenderOption,
};
use sheets::ClientError;
use std::sync::Arc;
use tracing::trace;

/// Implements the `Sheet` trait for one Google spreadsheet. Each call asks the `AuthHandle` for a
/// current token, so a long-lived `GoogleSheet` never uses an expired one.
pub(super) struct GoogleSheet {
    spreadsheet_id: String,
    auth: Arc<AuthHandle>,
}

impl GoogleSheet {
    pub(super) fn new(spreadsheet_id: String, auth: Arc<AuthHandle>) -> Self {
        Self {
            spreadsheet_id,
            auth,
        }
    }

    /// Creates a sheets client carrying a current access token.
    async fn client(&self) -> Res<sheets::Client> {
        let access_token = self.auth.token().await?;
        // The sheets crate wants OAuth client details for its own refresh flow, which we do not
        // use. Only the access token matters for API calls.
        Ok(sheets::Client::new(
            String::new(),
            String::new(),
            String::new(),
            access_token,
            String::new(),
        ))
    }

    /// Sends a `spreadsheets.batchUpdate` holding `requests`.
    async fn batch_update(&self, requests: Vec<Request>) -> Res<BatchUpdateSpreadsheetResponse> {
        let client = self.client().await?;
        let body = BatchUpdateSpreadsheetRequest {
            include_spreadsheet_in_response: Some(false),
            requests,
            response_include_grid_data: None,
            response_ranges: Vec::new(),
        };
        let response = client
            .spreadsheets()
            .batch_update(&self.spreadsheet_id, &body)
            .await
            .map_err(map_client_error)?;
        Ok(response.body)
    }
}

#[async_trait::async_trait]
impl Sheet for GoogleSheet {
    async fn tabs(&mut self) -> Res<Vec<TabProperties>> {
        trace!("tabs for {}", self.spreadsheet_id);
        let client = self.client().await?;
        let response = client
            .spreadsheets()
            .get(&self.spreadsheet_id, false, &[])
            .await
            .map_err(map_client_error)
            .context("Failed to fetch the spreadsheet metadata")?;
        let mut tabs: Vec<TabProperties> = response
            .body
            .sheets
            .into_iter()
            .filter_map(|sheet| sheet.properties)
            .map(tab_properties)
            .collect();
        tabs.sort_by_key(|t| t.index);
        Ok(tabs)
    }

    async fn add_tab(&mut self, title: &str) -> Res<TabProperties> {
        trace!("add_tab {title}");
        let response = self
            .batch_update(vec![add_sheet_request(title)?])
            .await
            .with_context(|| format!("Failed to add tab '{title}'"))?;
        response
            .replies
            .into_iter()
            .find_map(|reply| reply.add_sheet.and_then(|added| added.properties))
            .map(tab_properties)
            .with_context(|| format!("The response to adding tab '{title}' had no properties"))
    }

    async fn get(&mut self, range: &A1) -> Res<Vec<Vec<String>>> {
        trace!("get {range}");
        let client = self.client().await?;
        let response = client
            .spreadsheets()
            .values_get(
                &self.spreadsheet_id,
                &range.to_string(),
                DateTimeRenderOption::FormattedString,
                Dimension::Rows,
                ValueRenderOption::FormattedValue,
            )
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to fetch {range}"))?;
        Ok(response.body.values)
    }

    async fn write_ranges(&mut self, data: &[SheetRange]) -> Res<()> {
        trace!("write_ranges with {} ranges", data.len());
        let client = self.client().await?;
        let value_ranges: Vec<ValueRange> = data
            .iter()
            .map(|sr| ValueRange {
                major_dimension: Some(Dimension::Rows),
                range: sr.range.to_string(),
                values: sr.values.clone(),
            })
            .collect();

        let request = BatchUpdateValuesRequest {
            data: value_ranges,
            include_values_in_response: Some(false),
            response_date_time_render_option: None,
            response_value_render_option: None,
            value_input_option: Some(ValueInputOption::UserEntered),
        };

        client
            .spreadsheets()
            .values_batch_update(&self.spreadsheet_id, &request)
            .await
            .map_err(map_client_error)
            .context("Failed to write ranges")?;
        Ok(())
    }

    async fn append(&mut self, range: &A1, rows: &[Vec<String>]) -> Res<()> {
        trace!("append {} rows to {range}", rows.len());
        let client = self.client().await?;
        let range = range.to_string();
        let body = ValueRange {
            major_dimension: Some(Dimension::Rows),
            range: range.clone(),
            values: rows.to_vec(),
        };
        client
            .spreadsheets()
            .values_append(
                &self.spreadsheet_id,
                &range,
                false,
                InsertDataOption::InsertRows,
                DateTimeRenderOption::Noop,
                ValueRenderOption::Noop,
                ValueInputOption::UserEntered,
                &body,
            )
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to append to {range}"))?;
        Ok(())
    }

    async fn delete_rows(&mut self, sheet_id: i64, start: usize, end: usize) -> Res<()> {
        trace!("delete_rows {start}..{end} from sheet {sheet_id}");
        if start >= end {
            bail!("Invalid row range {start}..{end}");
        }
        self.batch_update(vec![delete_rows_request(sheet_id, start, end)?])
            .await
            .with_context(|| format!("Failed to delete rows {start}..{end} of sheet {sheet_id}"))?;
        Ok(())
    }
}

/// `Request` has a field for every kind of update and no `Default`, so it is built from its JSON
/// form: an object with the single key `kind`.
fn request(kind: &str, body: impl Serialize) -> Res<Request> {
    let mut object = serde_json::Map::new();
    object.insert(
        kind.to_string(),
        serde_json::to_value(body).with_context(|| format!("Unable to serialize {kind}"))?,
    );
    serde_json::from_value(serde_json::Value::Object(object))
        .with_context(|| format!("Unable to build a {kind} request"))
}

fn add_sheet_request(title: &str) -> Res<Request> {
    let properties = SheetProperties {
        data_source_sheet_properties: None,
        grid_properties: None,
        hidden: false,
        index: 0,
        right_to_left: false,
        sheet_id: 0,
        sheet_type: None,
        tab_color: None,
        tab_color_style: None,
        title: title.to_string(),
    };
    // Index and sheet id are zero, so they are left out and Google appends the tab with a fresh id.
    request(
        "addSheet",
        AddSheetRequest {
            properties: Some(properties),
        },
    )
}

fn delete_rows_request(sheet_id: i64, start: usize, end: usize) -> Res<Request> {
    let range = DimensionRange {
        dimension: Some(Dimension::Rows),
        end_index: i64::try_from(end).context("Row index out of range")?,
        sheet_id,
        start_index: i64::try_from(start).context("Row index out of range")?,
    };
    request(
        "deleteDimension",
        DeleteDimensionRequest { range: Some(range) },
    )
}

fn tab_properties(p: SheetProperties) -> TabProperties {
    TabProperties {
        sheet_id: p.sheet_id,
        title: p.title,
        index: usize::try_from(p.index).unwrap_or_default(),
    }
}

fn map_client_error(e: ClientError) -> anyhow::Error {
    let error_name = match &e {
        ClientError::EmptyRefreshToken => "EmptyRefreshToken".to_string(),
        ClientError::FromUtf8Error(inner) => format!("FromUtf8Error {inner}"),
        ClientError::UrlParserError(inner) => format!("UrlParserError {inner}"),
        ClientError::SerdeJsonError(inner) => format!("SerdeJsonError {inner}"),
        ClientError::ReqwestError(inner) => format!("ReqwestError {inner}"),
        ClientError::InvalidHeaderValue(inner) => format!("InvalidHeaderValue {inner}"),
        ClientError::ReqwestMiddleWareError(inner) => format!("ReqwestMiddleWareError {inner}"),
        ClientError::HttpError { .. } => "HttpError".to_string(),
        ClientError::Other(_) => "Other".to_string(),
    };
    anyhow::Error::new(e).context(error_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_sheet_request() {
        let request = add_sheet_request("Sheet2").unwrap();
        let properties = request.add_sheet.as_ref().unwrap().properties.as_ref().unwrap();
        assert_eq!(properties.title, "Sheet2");
        assert!(request.delete_dimension.is_none());
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"addSheet": {"properties": {
                "title": "Sheet2",
                "hidden": false,
                "rightToLeft": false
            }}})
        );
    }

    #[test]
    fn test_delete_rows_request() {
        let request = delete_rows_request(815, 3, 4).unwrap();
        assert!(request.add_sheet.is_none());
        let range = request.delete_dimension.unwrap().range.unwrap();
        assert_eq!(range.sheet_id, 815);
        assert_eq!(range.start_index, 3);
        assert_eq!(range.end_index, 4);
        assert_eq!(range.dimension, Some(Dimension::Rows));
    }

    #[test]
    fn test_tab_properties() {
        let metadata = json!({"sheets": [
            {"properties": {"sheetId": 815, "title": "Sheet2", "index": 1}},
            {"properties": {"title": "Sheet1"}}
        ]});
        let spreadsheet: sheets::types::Spreadsheet = serde_json::from_value(metadata).unwrap();
        let tabs: Vec<TabProperties> = spreadsheet
            .sheets
            .into_iter()
            .filter_map(|s| s.properties)
            .map(tab_properties)
            .collect();
        assert_eq!(tabs[0].sheet_id, 815);
        assert_eq!(tabs[0].index, 1);
        assert_eq!(tabs[1].sheet_id, 0);
        assert_eq!(tabs[1].index, 0);
    }
}
