use chrono::NaiveDate;
use csv::{Reader, StringRecord};
use media_sync_models::{SourceItem, SourceRating, TitleType};
use std::collections::HashMap;
use std::io::Read;
use tracing::debug;

use crate::error::SourceError;

const COL_CONST: &str = "Const";
const COL_TITLE_TYPE: &str = "Title Type";
const COL_YOUR_RATING: &str = "Your Rating";
const COL_DATE_RATED: &str = "Date Rated";

/// Column positions keyed by header name.
struct Columns {
    map: HashMap<String, usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord, required: &[&str]) -> Result<Self, SourceError> {
        let map: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim_start_matches('\u{feff}').trim().to_string(), i))
            .collect();

        let available: Vec<&str> = headers.iter().collect();
        debug!("Available CSV columns: {:?}", available);

        for col in required {
            if !map.contains_key(*col) {
                return Err(SourceError::MalformedResponse(format!(
                    "missing required column '{}', available columns: {:?}",
                    col, available
                )));
            }
        }
        Ok(Self { map })
    }

    fn get<'r>(&self, record: &'r StringRecord, column: &str) -> &'r str {
        self.map
            .get(column)
            .and_then(|&i| record.get(i))
            .map(str::trim)
            .unwrap_or("")
    }
}

fn read_rows<R: Read>(
    input: R,
    required: &[&str],
) -> Result<(Columns, Vec<StringRecord>), SourceError> {
    let mut reader = Reader::from_reader(input);
    let headers = reader
        .headers()
        .map_err(|e| SourceError::MalformedResponse(format!("unreadable CSV header: {}", e)))?
        .clone();
    let columns = Columns::from_headers(&headers, required)?;

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result
            .map_err(|e| SourceError::MalformedResponse(format!("CSV row {}: {}", index + 1, e)))?;
        rows.push(record);
    }
    Ok((columns, rows))
}

/// Parse a list or watchlist export into unrated items.
pub fn parse_list_csv<R: Read>(input: R) -> Result<Vec<SourceItem>, SourceError> {
    let (columns, rows) = read_rows(input, &[COL_CONST, COL_TITLE_TYPE])?;
    let mut items = Vec::with_capacity(rows.len());

    for (index, record) in rows.iter().enumerate() {
        let id = columns.get(record, COL_CONST);
        if id.is_empty() {
            debug!(row = index + 1, "Skipping row with empty id");
            continue;
        }
        let title_type = parse_title_type(columns.get(record, COL_TITLE_TYPE));
        let item = SourceItem::new(id, title_type)
            .map_err(|e| SourceError::MalformedResponse(format!("row {}: {}", index + 1, e)))?;
        items.push(item);
    }

    debug!(rows = rows.len(), items = items.len(), "Parsed list export");
    Ok(items)
}

/// Parse the ratings export. Every returned item carries a rating and its date.
pub fn parse_ratings_csv<R: Read>(input: R) -> Result<Vec<SourceItem>, SourceError> {
    let (columns, rows) = read_rows(
        input,
        &[COL_CONST, COL_TITLE_TYPE, COL_YOUR_RATING, COL_DATE_RATED],
    )?;
    let mut items = Vec::with_capacity(rows.len());

    for (index, record) in rows.iter().enumerate() {
        let row = index + 1;
        let id = columns.get(record, COL_CONST);
        if id.is_empty() {
            debug!(row, "Skipping row with empty id");
            continue;
        }

        let value_str = columns.get(record, COL_YOUR_RATING);
        let value: u8 = value_str.parse().map_err(|_| {
            SourceError::MalformedResponse(format!("row {}: invalid rating '{}'", row, value_str))
        })?;
        let date_str = columns.get(record, COL_DATE_RATED);
        let rated_on = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
            SourceError::MalformedResponse(format!("row {}: invalid date '{}': {}", row, date_str, e))
        })?;

        let rating = SourceRating::new(value, rated_on)
            .map_err(|e| SourceError::MalformedResponse(format!("row {}: {}", row, e)))?;
        let title_type = parse_title_type(columns.get(record, COL_TITLE_TYPE));
        let item = SourceItem::rated(id, title_type, rating)
            .map_err(|e| SourceError::MalformedResponse(format!("row {}: {}", row, e)))?;
        items.push(item);
    }

    debug!(rows = rows.len(), items = items.len(), "Parsed ratings export");
    Ok(items)
}

fn parse_title_type(raw: &str) -> TitleType {
    match raw.parse::<TitleType>() {
        Ok(title_type) => title_type,
        Err(never) => match never {},
    }
}

/// Display name of an exported list, taken from the attachment filename.
///
/// Handles both `filename="My List.csv"` and the RFC 5987 `filename*=UTF-8''My%20List.csv`
/// forms. Only the final extension is removed, so dots inside the name survive.
pub fn list_name_from_content_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for part in header.split(';').map(str::trim) {
        if let Some(value) = part.strip_prefix("filename*=") {
            let encoded = value.split_once("''").map(|(_, rest)| rest).unwrap_or(value);
            extended = urlencoding::decode(encoded.trim_matches('"')).ok().map(|s| s.into_owned());
        } else if let Some(value) = part.strip_prefix("filename=") {
            plain = Some(value.trim_matches('"').to_string());
        }
    }

    let filename = extended.or(plain)?;
    let name = match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename.as_str(),
    };
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
