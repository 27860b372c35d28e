//! CSV parsing for participant uploads and rendering for the no-show export.

use std::collections::HashMap;

use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};

use crate::domain::EventId;
use crate::error::AppError;
use crate::service::no_show_service::NoShowView;
use crate::service::participant_service::ImportRecord;

const NO_SHOW_EXPORT_HEADERS: [&str; 7] = [
    "Participant ID",
    "Participant Name",
    "Event ID",
    "Event Name",
    "Status",
    "Marked At",
    "Created At",
];

/// Lowercases, trims and turns inner spaces into underscores so
/// `"Full Name"` and `full_name` address the same column.
fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace([' ', '-'], "_")
}

/// Parses a participant upload.
///
/// The file must have a header row with an `email` column; the name is read
/// from `full_name` or `name` when present. Blank lines are skipped and
/// every row is tagged with `event_id`.
///
/// # Errors
///
/// Returns [`AppError::InvalidRequest`] if the file is not valid CSV or the
/// `email` column is missing.
pub fn parse_participant_csv(
    content: &str,
    event_id: Option<EventId>,
) -> Result<Vec<ImportRecord>, AppError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::InvalidRequest(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, h)| (normalize_header(h), idx))
        .collect();

    let Some(&email_idx) = header_map.get("email") else {
        return Err(AppError::InvalidRequest(
            "Missing required CSV header: email".to_string(),
        ));
    };
    let name_idx = header_map
        .get("full_name")
        .or_else(|| header_map.get("name"))
        .copied();

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            AppError::InvalidRequest(format!("Failed to parse CSV row {}: {e}", line + 2))
        })?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let field = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        rows.push(ImportRecord {
            full_name: field(name_idx),
            email: field(Some(email_idx)),
            event_id,
        });
    }

    Ok(rows)
}

/// Renders the no-show export with every field quoted.
///
/// # Errors
///
/// Returns [`AppError::Internal`] if the writer fails.
pub fn write_no_shows_csv(rows: &[NoShowView]) -> Result<String, AppError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());

    let csv_error = |e: csv::Error| AppError::Internal(format!("CSV export failed: {e}"));
    writer.write_record(NO_SHOW_EXPORT_HEADERS).map_err(csv_error)?;
    for row in rows {
        writer
            .write_record([
                row.participant_id.to_string(),
                row.participant_name.clone(),
                row.event_id.to_string(),
                row.event_name.clone(),
                row.status.as_str().to_string(),
                row.marked_at.to_rfc3339(),
                row.created_at.to_rfc3339(),
            ])
            .map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV export failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV export failed: {e}")))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::{AttendanceStatus, ParticipantId};
    use crate::service::no_show_service::NoShowSource;

    #[test]
    fn headers_are_case_and_space_insensitive() {
        let input = "Full Name, EMAIL \nAnn,ann@x.com\n";
        let Ok(rows) = parse_participant_csv(input, None) else {
            panic!("parse failed");
        };
        assert_eq!(
            rows,
            vec![ImportRecord {
                full_name: Some("Ann".to_string()),
                email: Some("ann@x.com".to_string()),
                event_id: None,
            }]
        );
    }

    #[test]
    fn name_column_is_optional_and_blank_lines_skipped() {
        let event = EventId::new();
        let input = "email\nb@x.com\n\n\"\"\nc@x.com\n";
        let Ok(rows) = parse_participant_csv(input, Some(event)) else {
            panic!("parse failed");
        };
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.full_name.is_none() && r.event_id == Some(event)));
    }

    #[test]
    fn missing_email_header_is_rejected() {
        let result = parse_participant_csv("name,phone\nAnn,123\n", None);
        let Err(AppError::InvalidRequest(message)) = result else {
            panic!("expected validation error");
        };
        assert!(message.contains("email"));
    }

    #[test]
    fn short_rows_yield_missing_email() {
        let Ok(rows) = parse_participant_csv("name,email\nAnn\n", None) else {
            panic!("parse failed");
        };
        let Some(row) = rows.first() else {
            panic!("expected a row");
        };
        assert_eq!(row.email, None);
    }

    #[test]
    fn export_quotes_every_field() {
        let now = Utc::now();
        let row = NoShowView {
            id: uuid::Uuid::new_v4(),
            source: NoShowSource::NoShows,
            event_id: EventId::new(),
            event_name: "Meetup, spring".to_string(),
            participant_id: ParticipantId::new(),
            participant_name: "Ann".to_string(),
            participant_email: "ann@x.com".to_string(),
            status: AttendanceStatus::NotAttended,
            marked_at: now,
            created_at: now,
        };
        let Ok(csv) = write_no_shows_csv(&[row]) else {
            panic!("export failed");
        };
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("\"Participant ID\",\"Participant Name\",\"Event ID\",\"Event Name\",\"Status\",\"Marked At\",\"Created At\"")
        );
        let Some(data) = lines.next() else {
            panic!("expected a data line");
        };
        assert!(data.contains("\"Meetup, spring\""));
        assert!(data.contains("\"not_attended\""));
    }
}
