use crate::error::{ParseError, UploadError};
use crate::types::RoutePoint;
use serde_json::{Map, Value};

/// Raw record written by the logger, one JSON object per line.
///
/// Unknown fields are ignored; the three numeric fields are required.
/// A repeated key keeps its last value.
#[derive(Debug)]
struct LogRecord {
    latitude: f64,
    longitude: f64,
    pitch: f64,
}

impl LogRecord {
    fn from_object(object: &Map<String, Value>) -> Result<Self, String> {
        let field = |name: &str| match object.get(name) {
            Some(value) => value
                .as_f64()
                .ok_or_else(|| format!("field `{}` is not a number", name)),
            None => Err(format!("missing field `{}`", name)),
        };

        Ok(LogRecord {
            latitude: field("latitude")?,
            longitude: field("longitude")?,
            pitch: field("pitch")?,
        })
    }
}

/// Points that survived a best-effort parse
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedBatch {
    pub points: Vec<RoutePoint>,
    /// Non-empty lines that failed to decode
    pub discarded: usize,
}

/// Lazily decode every non-empty line of `text`.
///
/// Blank lines are skipped without producing an item.
pub fn parse_lines(text: &str) -> impl Iterator<Item = Result<RoutePoint, ParseError>> + '_ {
    text.lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .map(|(line_no, line)| parse_line(line_no, line))
}

fn parse_line(line_no: usize, line: &str) -> Result<RoutePoint, ParseError> {
    log::debug!("Processing line {}: {}", line_no, line);

    let object: Map<String, Value> = serde_json::from_str(line).map_err(|e| ParseError {
        line: line_no,
        reason: e.to_string(),
    })?;
    let record = LogRecord::from_object(&object).map_err(|reason| ParseError {
        line: line_no,
        reason,
    })?;

    Ok(RoutePoint::new(record.latitude, record.longitude, record.pitch))
}

/// Parse a whole upload, skipping malformed lines.
///
/// Fails with `NoValidData` only when not a single line decodes.
pub fn parse_log(text: &str) -> Result<ParsedBatch, UploadError> {
    let mut batch = ParsedBatch::default();

    for result in parse_lines(text) {
        match result {
            Ok(point) => batch.points.push(point),
            Err(e) => {
                log::warn!("Failed to parse JSON at {}", e);
                batch.discarded += 1;
            }
        }
    }

    if batch.points.is_empty() {
        log::error!("No valid data to upload ({} line(s) rejected)", batch.discarded);
        return Err(UploadError::NoValidData {
            discarded: batch.discarded,
        });
    }

    log::info!(
        "Parsed {} point(s), discarded {} line(s)",
        batch.points.len(),
        batch.discarded
    );
    Ok(batch)
}
