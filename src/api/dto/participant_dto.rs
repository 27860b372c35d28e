//! Participant list, import and CSV DTOs.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::domain::{EventId, ImportSessionId};
use crate::service::participant_service::ImportRecord;

/// Query parameters for `GET /api/participants`.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListParticipantsParams {
    /// Include blocklisted participants. Defaults to `false`.
    #[serde(default)]
    pub include_blocklisted: bool,
}

/// Request body for `POST /api/participants/bulk-import`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct BulkImportRequest {
    /// Rows to import.
    #[serde(default, alias = "records")]
    pub participants: Vec<ImportRecord>,
    /// Session that tags the created rows.
    #[serde(default)]
    pub import_session_id: Option<ImportSessionId>,
}

/// Query parameters for `POST /api/participants/import-csv`.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
pub struct CsvImportParams {
    /// Event stamped on every parsed row.
    #[serde(default)]
    pub event_id: Option<EventId>,
    /// Session that tags the created rows.
    #[serde(default)]
    pub import_session_id: Option<ImportSessionId>,
}
