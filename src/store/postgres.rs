//! PostgreSQL implementation of [`Store`] using `sqlx::PgPool`.
//!
//! Enum columns are stored as text and parsed back through the domain
//! types' `FromStr` impls; a value that fails to parse surfaces as
//! [`StoreError::CorruptRow`].

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{AttendanceFilter, NoShowFilter, Store, StoreError};
use crate::domain::ids::to_uuids;
use crate::domain::{
    AttendanceId, AttendanceRecord, AttendanceSnapshot, AttendanceStatus, AuditEntry,
    BlocklistEntry, Event, EventId, EventPatch, ImportSession, ImportSessionId, ImportStatus,
    NoShowId, NoShowRecord, Participant, ParticipantId, ParticipantPatch, Role, User, UserId,
    TaskStatus, UserStatus, Volunteer, VolunteerAttendance, VolunteerAttendanceStatus, VolunteerId,
    VolunteerPatch, VolunteerWork, VolunteerWorkId,
};

/// PostgreSQL-backed store.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

fn db_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_foreign_key_violation() {
            return StoreError::ForeignKeyViolation(db.message().to_string());
        }
        if db.is_unique_violation() {
            return StoreError::UniqueViolation(db.message().to_string());
        }
    }
    StoreError::Backend(e.to_string())
}

fn corrupt(table: &'static str) -> impl Fn(crate::domain::UnknownVariant) -> StoreError {
    move |e| StoreError::CorruptRow {
        table,
        message: e.to_string(),
    }
}

fn to_count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

// ── row types ──────────────────────────────────────────────────────────

const PARTICIPANT_COLUMNS: &str =
    "id, name, email, phone, is_blocklisted, blocklist_reason, import_session_id, created_at";

#[derive(sqlx::FromRow)]
struct ParticipantRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    is_blocklisted: bool,
    blocklist_reason: Option<String>,
    import_session_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<ParticipantRow> for Participant {
    fn from(row: ParticipantRow) -> Self {
        Self {
            id: row.id.into(),
            name: row.name,
            email: row.email,
            phone: row.phone,
            is_blocklisted: row.is_blocklisted,
            blocklist_reason: row.blocklist_reason,
            import_session_id: row.import_session_id.map(Into::into),
            created_at: row.created_at,
        }
    }
}

const EVENT_COLUMNS: &str = "id, name, date, location, description, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    name: String,
    date: NaiveDate,
    location: Option<String>,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id.into(),
            name: row.name,
            date: row.date,
            location: row.location,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const ATTENDANCE_COLUMNS: &str =
    "id, event_id, participant_id, status, marked_at, created_at, import_session_id";

#[derive(sqlx::FromRow)]
struct AttendanceRow {
    id: Uuid,
    event_id: Uuid,
    participant_id: Uuid,
    status: String,
    marked_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    import_session_id: Option<Uuid>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            event_id: row.event_id.into(),
            participant_id: row.participant_id.into(),
            status: row.status.parse().map_err(corrupt("attendance"))?,
            marked_at: row.marked_at,
            created_at: row.created_at,
            import_session_id: row.import_session_id.map(Into::into),
        })
    }
}

#[derive(sqlx::FromRow)]
struct NoShowRow {
    id: Uuid,
    event_id: Uuid,
    participant_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<NoShowRow> for NoShowRecord {
    fn from(row: NoShowRow) -> Self {
        Self {
            id: row.id.into(),
            event_id: row.event_id.into(),
            participant_id: row.participant_id.into(),
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BlocklistRow {
    id: Uuid,
    participant_id: Uuid,
    reason: String,
    created_at: DateTime<Utc>,
}

impl From<BlocklistRow> for BlocklistEntry {
    fn from(row: BlocklistRow) -> Self {
        Self {
            id: row.id.into(),
            participant_id: row.participant_id.into(),
            reason: row.reason,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ImportSessionRow {
    id: Uuid,
    event_id: Uuid,
    import_type: String,
    status: String,
    record_count: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<ImportSessionRow> for ImportSession {
    type Error = StoreError;

    fn try_from(row: ImportSessionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            event_id: row.event_id.into(),
            import_type: row.import_type.parse().map_err(corrupt("import_sessions"))?,
            status: row.status.parse().map_err(corrupt("import_sessions"))?,
            record_count: u32::try_from(row.record_count).unwrap_or(0),
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    import_session_id: Uuid,
    action: String,
    details: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = StoreError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            import_session_id: row.import_session_id.into(),
            action: row.action.parse().map_err(corrupt("import_audit_logs"))?,
            details: row.details,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    id: Uuid,
    import_session_id: Uuid,
    attendance_id: Uuid,
    previous_status: Option<String>,
    previous_blocklist_status: Option<bool>,
    is_new_participant: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<SnapshotRow> for AttendanceSnapshot {
    type Error = StoreError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        let previous_status = row
            .previous_status
            .as_deref()
            .map(str::parse::<AttendanceStatus>)
            .transpose()
            .map_err(corrupt("attendance_snapshots"))?;
        Ok(Self {
            id: row.id.into(),
            import_session_id: row.import_session_id.into(),
            attendance_id: row.attendance_id.into(),
            previous_status,
            previous_blocklist_status: row.previous_blocklist_status,
            is_new_participant: row.is_new_participant,
            created_at: row.created_at,
        })
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, status, created_at, \
                            updated_at, approved_at, approved_by";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    approved_at: Option<DateTime<Utc>>,
    approved_by: Option<Uuid>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse().map_err(corrupt("users"))?,
            status: row.status.parse().map_err(corrupt("users"))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            approved_at: row.approved_at,
            approved_by: row.approved_by.map(Into::into),
        })
    }
}

const VOLUNTEER_COLUMNS: &str = "id, name, email, phone, joined_date, created_at";

#[derive(sqlx::FromRow)]
struct VolunteerRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    joined_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<VolunteerRow> for Volunteer {
    fn from(row: VolunteerRow) -> Self {
        Self {
            id: row.id.into(),
            name: row.name,
            email: row.email,
            phone: row.phone,
            joined_date: row.joined_date,
            created_at: row.created_at,
        }
    }
}

const VOLUNTEER_ATTENDANCE_COLUMNS: &str =
    "id, volunteer_id, event_id, attendance_status, created_at";

#[derive(sqlx::FromRow)]
struct VolunteerAttendanceRow {
    id: Uuid,
    volunteer_id: Uuid,
    event_id: Uuid,
    attendance_status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<VolunteerAttendanceRow> for VolunteerAttendance {
    type Error = StoreError;

    fn try_from(row: VolunteerAttendanceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            volunteer_id: row.volunteer_id.into(),
            event_id: row.event_id.into(),
            attendance_status: row
                .attendance_status
                .parse()
                .map_err(corrupt("volunteer_attendance"))?,
            created_at: row.created_at,
        })
    }
}

const VOLUNTEER_WORK_COLUMNS: &str =
    "id, event_id, volunteer_id, task_name, task_status, assigned_at";

#[derive(sqlx::FromRow)]
struct VolunteerWorkRow {
    id: Uuid,
    event_id: Uuid,
    volunteer_id: Uuid,
    task_name: String,
    task_status: String,
    assigned_at: DateTime<Utc>,
}

impl TryFrom<VolunteerWorkRow> for VolunteerWork {
    type Error = StoreError;

    fn try_from(row: VolunteerWorkRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            event_id: row.event_id.into(),
            volunteer_id: row.volunteer_id.into(),
            task_name: row.task_name,
            task_status: row.task_status.parse().map_err(corrupt("volunteer_work"))?,
            assigned_at: row.assigned_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

// ── filters ────────────────────────────────────────────────────────────

const ATTENDANCE_WHERE: &str = "($1::uuid IS NULL OR event_id = $1) \
     AND ($2::uuid[] IS NULL OR participant_id = ANY($2)) \
     AND ($3::uuid[] IS NULL OR id = ANY($3)) \
     AND ($4::text IS NULL OR status = $4) \
     AND ($5::uuid IS NULL OR import_session_id = $5)";

const NO_SHOW_WHERE: &str = "($1::uuid IS NULL OR event_id = $1) \
     AND ($2::uuid[] IS NULL OR participant_id = ANY($2)) \
     AND ($3::uuid[] IS NULL OR id = ANY($3))";

struct AttendanceBinds {
    event_id: Option<Uuid>,
    participant_ids: Option<Vec<Uuid>>,
    ids: Option<Vec<Uuid>>,
    status: Option<&'static str>,
    import_session_id: Option<Uuid>,
}

impl From<&AttendanceFilter> for AttendanceBinds {
    fn from(filter: &AttendanceFilter) -> Self {
        Self {
            event_id: filter.event_id.map(Into::into),
            participant_ids: filter.participant_ids.as_deref().map(to_uuids),
            ids: filter.ids.as_deref().map(to_uuids),
            status: filter.status.map(AttendanceStatus::as_str),
            import_session_id: filter.import_session_id.map(Into::into),
        }
    }
}

struct NoShowBinds {
    event_id: Option<Uuid>,
    participant_ids: Option<Vec<Uuid>>,
    ids: Option<Vec<Uuid>>,
}

impl From<&NoShowFilter> for NoShowBinds {
    fn from(filter: &NoShowFilter) -> Self {
        Self {
            event_id: filter.event_id.map(Into::into),
            participant_ids: filter.participant_ids.as_deref().map(to_uuids),
            ids: filter.ids.as_deref().map(to_uuids),
        }
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn insert_participants(&self, rows: &[Participant]) -> Result<Vec<Participant>, StoreError> {
        for p in rows {
            sqlx::query(
                "INSERT INTO participants \
                 (id, name, email, phone, is_blocklisted, blocklist_reason, import_session_id, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(Uuid::from(p.id))
            .bind(&p.name)
            .bind(&p.email)
            .bind(&p.phone)
            .bind(p.is_blocklisted)
            .bind(&p.blocklist_reason)
            .bind(p.import_session_id.map(Uuid::from))
            .bind(p.created_at)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        }
        Ok(rows.to_vec())
    }

    async fn get_participant(&self, id: ParticipantId) -> Result<Option<Participant>, StoreError> {
        let row = sqlx::query_as::<_, ParticipantRow>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn list_participants(&self, include_blocklisted: bool) -> Result<Vec<Participant>, StoreError> {
        let rows = sqlx::query_as::<_, ParticipantRow>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants \
             WHERE $1 OR is_blocklisted = FALSE ORDER BY created_at DESC"
        ))
        .bind(include_blocklisted)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn participants_by_ids(&self, ids: &[ParticipantId]) -> Result<Vec<Participant>, StoreError> {
        let rows = sqlx::query_as::<_, ParticipantRow>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = ANY($1) ORDER BY name"
        ))
        .bind(to_uuids(ids))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn participants_by_emails(&self, emails: &[String]) -> Result<Vec<Participant>, StoreError> {
        let lowered: Vec<String> = emails.iter().map(|e| e.trim().to_lowercase()).collect();
        let rows = sqlx::query_as::<_, ParticipantRow>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE lower(email) = ANY($1)"
        ))
        .bind(lowered)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn participant_by_email(&self, email: &str) -> Result<Option<Participant>, StoreError> {
        let row = sqlx::query_as::<_, ParticipantRow>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants \
             WHERE lower(email) = $1 ORDER BY created_at LIMIT 1"
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn participant_by_name(&self, name: &str) -> Result<Option<Participant>, StoreError> {
        let row = sqlx::query_as::<_, ParticipantRow>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants \
             WHERE name = $1 ORDER BY created_at LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn participants_by_import(
        &self,
        session: ImportSessionId,
    ) -> Result<Vec<Participant>, StoreError> {
        let rows = sqlx::query_as::<_, ParticipantRow>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE import_session_id = $1"
        ))
        .bind(Uuid::from(session))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_participant(
        &self,
        id: ParticipantId,
        patch: &ParticipantPatch,
    ) -> Result<Option<Participant>, StoreError> {
        let Some(mut participant) = self.get_participant(id).await? else {
            return Ok(None);
        };
        patch.apply(&mut participant);
        sqlx::query(
            "UPDATE participants SET name = $2, email = $3, phone = $4, \
             is_blocklisted = $5, blocklist_reason = $6 WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .bind(&participant.name)
        .bind(&participant.email)
        .bind(&participant.phone)
        .bind(participant.is_blocklisted)
        .bind(&participant.blocklist_reason)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(Some(participant))
    }

    async fn delete_participants(&self, ids: &[ParticipantId]) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM participants WHERE id = ANY($1)")
            .bind(to_uuids(ids))
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected())
    }

    async fn count_participants(&self, blocklisted: Option<bool>) -> Result<u64, StoreError> {
        let n = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM participants WHERE $1::boolean IS NULL OR is_blocklisted = $1",
        )
        .bind(blocklisted)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(to_count(n))
    }

    async fn insert_event(&self, event: &Event) -> Result<Event, StoreError> {
        sqlx::query(
            "INSERT INTO events (id, name, date, location, description, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::from(event.id))
        .bind(&event.name)
        .bind(event.date)
        .bind(&event.location)
        .bind(&event.description)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(event.clone())
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY date DESC, created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_event(&self, id: EventId, patch: &EventPatch) -> Result<Option<Event>, StoreError> {
        let Some(mut event) = self.get_event(id).await? else {
            return Ok(None);
        };
        patch.apply(&mut event);
        sqlx::query(
            "UPDATE events SET name = $2, date = $3, location = $4, description = $5, \
             updated_at = $6 WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .bind(&event.name)
        .bind(event.date)
        .bind(&event.location)
        .bind(&event.description)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(Some(event))
    }

    async fn delete_event(&self, id: EventId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_events(&self) -> Result<u64, StoreError> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(to_count(n))
    }

    async fn insert_attendance(
        &self,
        rows: &[AttendanceRecord],
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        for r in rows {
            sqlx::query(
                "INSERT INTO attendance \
                 (id, event_id, participant_id, status, marked_at, created_at, import_session_id) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(Uuid::from(r.id))
            .bind(Uuid::from(r.event_id))
            .bind(Uuid::from(r.participant_id))
            .bind(r.status.as_str())
            .bind(r.marked_at)
            .bind(r.created_at)
            .bind(r.import_session_id.map(Uuid::from))
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        }
        Ok(rows.to_vec())
    }

    async fn get_attendance(&self, id: AttendanceId) -> Result<Option<AttendanceRecord>, StoreError> {
        let row = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_attendance(
        &self,
        filter: &AttendanceFilter,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let b = AttendanceBinds::from(filter);
        let rows = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE {ATTENDANCE_WHERE} \
             ORDER BY created_at DESC"
        ))
        .bind(b.event_id)
        .bind(b.participant_ids)
        .bind(b.ids)
        .bind(b.status)
        .bind(b.import_session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        convert_all(rows)
    }

    async fn update_attendance_status(
        &self,
        id: AttendanceId,
        status: AttendanceStatus,
        marked_at: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let row = sqlx::query_as::<_, AttendanceRow>(&format!(
            "UPDATE attendance SET status = $2, marked_at = $3 WHERE id = $1 \
             RETURNING {ATTENDANCE_COLUMNS}"
        ))
        .bind(Uuid::from(id))
        .bind(status.as_str())
        .bind(marked_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn delete_attendance(&self, filter: &AttendanceFilter) -> Result<u64, StoreError> {
        if filter.is_unscoped() {
            return Err(StoreError::UnscopedDelete("attendance"));
        }
        let b = AttendanceBinds::from(filter);
        let result = sqlx::query(&format!("DELETE FROM attendance WHERE {ATTENDANCE_WHERE}"))
            .bind(b.event_id)
            .bind(b.participant_ids)
            .bind(b.ids)
            .bind(b.status)
            .bind(b.import_session_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected())
    }

    async fn count_attendance(&self, filter: &AttendanceFilter) -> Result<u64, StoreError> {
        let b = AttendanceBinds::from(filter);
        let n = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM attendance WHERE {ATTENDANCE_WHERE}"
        ))
        .bind(b.event_id)
        .bind(b.participant_ids)
        .bind(b.ids)
        .bind(b.status)
        .bind(b.import_session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(to_count(n))
    }

    async fn insert_no_shows(&self, rows: &[NoShowRecord]) -> Result<Vec<NoShowRecord>, StoreError> {
        for r in rows {
            sqlx::query(
                "INSERT INTO no_shows (id, event_id, participant_id, created_at) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::from(r.id))
            .bind(Uuid::from(r.event_id))
            .bind(Uuid::from(r.participant_id))
            .bind(r.created_at)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        }
        Ok(rows.to_vec())
    }

    async fn get_no_show(&self, id: NoShowId) -> Result<Option<NoShowRecord>, StoreError> {
        let row = sqlx::query_as::<_, NoShowRow>(
            "SELECT id, event_id, participant_id, created_at FROM no_shows WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn list_no_shows(&self, filter: &NoShowFilter) -> Result<Vec<NoShowRecord>, StoreError> {
        let b = NoShowBinds::from(filter);
        let rows = sqlx::query_as::<_, NoShowRow>(&format!(
            "SELECT id, event_id, participant_id, created_at FROM no_shows \
             WHERE {NO_SHOW_WHERE} ORDER BY created_at DESC"
        ))
        .bind(b.event_id)
        .bind(b.participant_ids)
        .bind(b.ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_no_shows(&self, filter: &NoShowFilter) -> Result<u64, StoreError> {
        if filter.is_unscoped() {
            return Err(StoreError::UnscopedDelete("no_shows"));
        }
        let b = NoShowBinds::from(filter);
        let result = sqlx::query(&format!("DELETE FROM no_shows WHERE {NO_SHOW_WHERE}"))
            .bind(b.event_id)
            .bind(b.participant_ids)
            .bind(b.ids)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected())
    }

    async fn count_no_shows(&self, filter: &NoShowFilter) -> Result<u64, StoreError> {
        let b = NoShowBinds::from(filter);
        let n = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM no_shows WHERE {NO_SHOW_WHERE}"
        ))
        .bind(b.event_id)
        .bind(b.participant_ids)
        .bind(b.ids)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(to_count(n))
    }

    async fn insert_blocklist_entry(&self, entry: &BlocklistEntry) -> Result<BlocklistEntry, StoreError> {
        sqlx::query(
            "INSERT INTO blocklist (id, participant_id, reason, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::from(entry.id))
        .bind(Uuid::from(entry.participant_id))
        .bind(&entry.reason)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(entry.clone())
    }

    async fn list_blocklist(&self) -> Result<Vec<BlocklistEntry>, StoreError> {
        let rows = sqlx::query_as::<_, BlocklistRow>(
            "SELECT id, participant_id, reason, created_at FROM blocklist ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_blocklist_entries(&self, participants: &[ParticipantId]) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM blocklist WHERE participant_id = ANY($1)")
            .bind(to_uuids(participants))
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected())
    }

    async fn count_blocklist(&self) -> Result<u64, StoreError> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM blocklist")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(to_count(n))
    }

    async fn insert_import_session(&self, session: &ImportSession) -> Result<ImportSession, StoreError> {
        sqlx::query(
            "INSERT INTO import_sessions (id, event_id, import_type, status, record_count, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::from(session.id))
        .bind(Uuid::from(session.event_id))
        .bind(session.import_type.as_str())
        .bind(session.status.as_str())
        .bind(i32::try_from(session.record_count).unwrap_or(i32::MAX))
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(session.clone())
    }

    async fn get_import_session(&self, id: ImportSessionId) -> Result<Option<ImportSession>, StoreError> {
        let row = sqlx::query_as::<_, ImportSessionRow>(
            "SELECT id, event_id, import_type, status, record_count, created_at \
             FROM import_sessions WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_import_sessions(
        &self,
        event_id: EventId,
        since: DateTime<Utc>,
    ) -> Result<Vec<ImportSession>, StoreError> {
        let rows = sqlx::query_as::<_, ImportSessionRow>(
            "SELECT id, event_id, import_type, status, record_count, created_at \
             FROM import_sessions WHERE event_id = $1 AND created_at >= $2 \
             ORDER BY created_at DESC",
        )
        .bind(Uuid::from(event_id))
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        convert_all(rows)
    }

    async fn set_import_session_status(
        &self,
        id: ImportSessionId,
        status: ImportStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE import_sessions SET status = $2 WHERE id = $1")
            .bind(Uuid::from(id))
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_audit_entry(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO import_audit_logs (id, import_session_id, action, details, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::from(entry.id))
        .bind(Uuid::from(entry.import_session_id))
        .bind(entry.action.as_str())
        .bind(&entry.details)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn list_audit_entries(&self, session: ImportSessionId) -> Result<Vec<AuditEntry>, StoreError> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT id, import_session_id, action, details, created_at FROM import_audit_logs \
             WHERE import_session_id = $1 ORDER BY created_at DESC",
        )
        .bind(Uuid::from(session))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        convert_all(rows)
    }

    async fn insert_snapshots(&self, rows: &[AttendanceSnapshot]) -> Result<(), StoreError> {
        for s in rows {
            sqlx::query(
                "INSERT INTO attendance_snapshots (id, import_session_id, attendance_id, \
                 previous_status, previous_blocklist_status, is_new_participant, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(Uuid::from(s.id))
            .bind(Uuid::from(s.import_session_id))
            .bind(Uuid::from(s.attendance_id))
            .bind(s.previous_status.map(AttendanceStatus::as_str))
            .bind(s.previous_blocklist_status)
            .bind(s.is_new_participant)
            .bind(s.created_at)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        }
        Ok(())
    }

    async fn list_snapshots(
        &self,
        session: ImportSessionId,
    ) -> Result<Vec<AttendanceSnapshot>, StoreError> {
        let rows = sqlx::query_as::<_, SnapshotRow>(
            "SELECT id, import_session_id, attendance_id, previous_status, \
             previous_blocklist_status, is_new_participant, created_at \
             FROM attendance_snapshots WHERE import_session_id = $1 ORDER BY created_at",
        )
        .bind(Uuid::from(session))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        convert_all(rows)
    }

    async fn delete_snapshots(&self, session: ImportSessionId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM attendance_snapshots WHERE import_session_id = $1")
            .bind(Uuid::from(session))
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected())
    }

    async fn insert_user(&self, user: &User) -> Result<User, StoreError> {
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, status, created_at, \
             updated_at, approved_at, approved_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(Uuid::from(user.id))
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.approved_at)
        .bind(user.approved_by.map(Uuid::from))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(user.clone())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_users(&self, role: Role, status: UserStatus) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = $1 AND status = $2 ORDER BY created_at"
        ))
        .bind(role.as_str())
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        convert_all(rows)
    }

    async fn approve_user(
        &self,
        id: UserId,
        approver: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET status = 'approved', approved_at = $3, approved_by = $2, \
             updated_at = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::from(id))
        .bind(Uuid::from(approver))
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn insert_volunteer(&self, volunteer: &Volunteer) -> Result<Volunteer, StoreError> {
        sqlx::query(
            "INSERT INTO volunteers (id, name, email, phone, joined_date, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::from(volunteer.id))
        .bind(&volunteer.name)
        .bind(&volunteer.email)
        .bind(&volunteer.phone)
        .bind(volunteer.joined_date)
        .bind(volunteer.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(volunteer.clone())
    }

    async fn get_volunteer(&self, id: VolunteerId) -> Result<Option<Volunteer>, StoreError> {
        let row = sqlx::query_as::<_, VolunteerRow>(&format!(
            "SELECT {VOLUNTEER_COLUMNS} FROM volunteers WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn volunteer_by_email(&self, email: &str) -> Result<Option<Volunteer>, StoreError> {
        let row = sqlx::query_as::<_, VolunteerRow>(&format!(
            "SELECT {VOLUNTEER_COLUMNS} FROM volunteers WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn list_volunteers(&self, oldest_first: bool) -> Result<Vec<Volunteer>, StoreError> {
        let order = if oldest_first { "ASC" } else { "DESC" };
        let rows = sqlx::query_as::<_, VolunteerRow>(&format!(
            "SELECT {VOLUNTEER_COLUMNS} FROM volunteers ORDER BY joined_date {order}"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_volunteer(
        &self,
        id: VolunteerId,
        patch: &VolunteerPatch,
    ) -> Result<Option<Volunteer>, StoreError> {
        let Some(mut volunteer) = self.get_volunteer(id).await? else {
            return Ok(None);
        };
        patch.apply(&mut volunteer);
        sqlx::query("UPDATE volunteers SET name = $2, email = $3, phone = $4 WHERE id = $1")
            .bind(Uuid::from(id))
            .bind(&volunteer.name)
            .bind(&volunteer.email)
            .bind(&volunteer.phone)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(Some(volunteer))
    }

    async fn delete_volunteer(&self, id: VolunteerId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM volunteers WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_volunteer_attendance(
        &self,
        row: &VolunteerAttendance,
    ) -> Result<VolunteerAttendance, StoreError> {
        let stored = sqlx::query_as::<_, VolunteerAttendanceRow>(&format!(
            "INSERT INTO volunteer_attendance \
             (id, volunteer_id, event_id, attendance_status, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (volunteer_id, event_id) \
             DO UPDATE SET attendance_status = EXCLUDED.attendance_status \
             RETURNING {VOLUNTEER_ATTENDANCE_COLUMNS}"
        ))
        .bind(Uuid::from(row.id))
        .bind(Uuid::from(row.volunteer_id))
        .bind(Uuid::from(row.event_id))
        .bind(row.attendance_status.as_str())
        .bind(row.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        stored.try_into()
    }

    async fn list_volunteer_attendance(
        &self,
        volunteer: VolunteerId,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<VolunteerAttendance>, StoreError> {
        let rows = sqlx::query_as::<_, VolunteerAttendanceRow>(&format!(
            "SELECT {VOLUNTEER_ATTENDANCE_COLUMNS} FROM volunteer_attendance \
             WHERE volunteer_id = $1 ORDER BY created_at DESC OFFSET $2 LIMIT $3"
        ))
        .bind(Uuid::from(volunteer))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        convert_all(rows)
    }

    async fn count_volunteer_attendance(
        &self,
        volunteer: VolunteerId,
        status: Option<VolunteerAttendanceStatus>,
    ) -> Result<u64, StoreError> {
        let n = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM volunteer_attendance \
             WHERE volunteer_id = $1 AND ($2::text IS NULL OR attendance_status = $2)",
        )
        .bind(Uuid::from(volunteer))
        .bind(status.map(VolunteerAttendanceStatus::as_str))
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(to_count(n))
    }

    async fn insert_volunteer_work(&self, work: &VolunteerWork) -> Result<VolunteerWork, StoreError> {
        sqlx::query(
            "INSERT INTO volunteer_work \
             (id, event_id, volunteer_id, task_name, task_status, assigned_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::from(work.id))
        .bind(Uuid::from(work.event_id))
        .bind(Uuid::from(work.volunteer_id))
        .bind(&work.task_name)
        .bind(work.task_status.as_str())
        .bind(work.assigned_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(work.clone())
    }

    async fn get_volunteer_work(&self, id: VolunteerWorkId) -> Result<Option<VolunteerWork>, StoreError> {
        let row = sqlx::query_as::<_, VolunteerWorkRow>(&format!(
            "SELECT {VOLUNTEER_WORK_COLUMNS} FROM volunteer_work WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_volunteer_work(&self, volunteer: VolunteerId) -> Result<Vec<VolunteerWork>, StoreError> {
        let rows = sqlx::query_as::<_, VolunteerWorkRow>(&format!(
            "SELECT {VOLUNTEER_WORK_COLUMNS} FROM volunteer_work \
             WHERE volunteer_id = $1 ORDER BY assigned_at DESC"
        ))
        .bind(Uuid::from(volunteer))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        convert_all(rows)
    }

    async fn update_volunteer_work_status(
        &self,
        id: VolunteerWorkId,
        status: TaskStatus,
    ) -> Result<Option<VolunteerWork>, StoreError> {
        let row = sqlx::query_as::<_, VolunteerWorkRow>(&format!(
            "UPDATE volunteer_work SET task_status = $2 WHERE id = $1 \
             RETURNING {VOLUNTEER_WORK_COLUMNS}"
        ))
        .bind(Uuid::from(id))
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn delete_volunteer_work(&self, id: VolunteerWorkId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM volunteer_work WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}
