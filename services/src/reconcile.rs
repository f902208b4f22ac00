//! Bulk reconciliation between the attendance store and spreadsheets.
//!
//! Export emits one row per recorded (session, student) pair under a fixed
//! header contract; import accepts workbooks that follow the same contract,
//! tolerating banner rows above the header and summary rows below the data.

use std::collections::{BTreeSet, HashMap};
use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use chrono::{NaiveDate, Utc};
use rust_xlsxwriter::{Format, Workbook};
use sea_orm::{ColumnTrait, DbConn, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;

use crate::error::ServiceError;
use db::models::{attendance_record, attendance_session, session_year, student, subject};

/// Column contract shared by export and import.
pub const EXPORT_HEADERS: [&str; 4] = ["Student ID", "Student Name", "Date", "Status"];

/// Status texts that read as present; everything else is absent.
const PRESENT_WORDS: [&str; 4] = ["present", "yes", "true", "1"];

/// Leading cell texts that mark a non-data row (report trailers, banners).
const SKIP_MARKERS: [&str; 7] = [
    "total",
    "present:",
    "absent:",
    "attendance rate",
    "generated",
    "statistics",
    "summary",
];

/// Rows searched for the header before giving up on a workbook.
const HEADER_SCAN_ROWS: usize = 10;

// 1900-system serial 1 is 1899-12-31, with the fictitious 1900-02-29 baked
// in, so the usable epoch sits two days before 1900-01-01.
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

#[derive(Debug, Clone, Copy, Default)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    /// 1-based spreadsheet row.
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub failed: usize,
    pub errors: Vec<RowError>,
    /// Distinct session dates touched, ascending.
    pub dates: Vec<NaiveDate>,
}

/// Exports every recorded (session, student) pair for the subject and year,
/// optionally windowed by session date, as an xlsx workbook.
pub async fn export_attendance(
    db: &DbConn,
    subject_id: i64,
    session_year_id: i64,
    range: DateRange,
) -> Result<Vec<u8>, ServiceError> {
    let Some(subject) = subject::Entity::find_by_id(subject_id).one(db).await? else {
        return Err(ServiceError::NotFound("Subject"));
    };
    if session_year::Entity::find_by_id(session_year_id)
        .one(db)
        .await?
        .is_none()
    {
        return Err(ServiceError::NotFound("Session year"));
    }

    let sessions = sessions_in_range(db, subject_id, session_year_id, range).await?;
    let session_dates: HashMap<i64, NaiveDate> =
        sessions.iter().map(|s| (s.id, s.session_date)).collect();

    let records = records_for_sessions(db, sessions.iter().map(|s| s.id).collect()).await?;
    let students = students_by_id(db, records.iter().map(|r| r.student_id).collect()).await?;

    let mut rows: Vec<(NaiveDate, &student::Model, bool)> = Vec::with_capacity(records.len());
    for record in &records {
        let Some(date) = session_dates.get(&record.session_id) else {
            continue;
        };
        let Some(student) = students.get(&record.student_id) else {
            continue;
        };
        rows.push((*date, student, record.present));
    }
    rows.sort_by(|a, b| (a.0, &a.1.username).cmp(&(b.0, &b.1.username)));

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet().set_name("Attendance")?;

    let header_format = Format::new().set_bold();
    for (col, title) in EXPORT_HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header_format)?;
    }

    for (i, (date, student, present)) in rows.iter().enumerate() {
        let row = (i + 1) as u32;
        sheet.write_string(row, 0, &student.username)?;
        sheet.write_string(row, 1, student.full_name())?;
        sheet.write_string(row, 2, date.format("%Y-%m-%d").to_string())?;
        sheet.write_string(row, 3, status_text(*present))?;
    }
    sheet.autofit();

    tracing::info!(
        subject = %subject.code,
        session_year_id,
        rows = rows.len(),
        "attendance exported"
    );

    workbook.save_to_buffer().map_err(Into::into)
}

/// Per-student report: banner, the standard header, one row per session, and
/// a summary trailer. The layout stays importable by [`import_attendance`].
pub async fn export_student_report(
    db: &DbConn,
    subject_id: i64,
    session_year_id: i64,
    student_identifier: &str,
) -> Result<Vec<u8>, ServiceError> {
    let Some(subject) = subject::Entity::find_by_id(subject_id).one(db).await? else {
        return Err(ServiceError::NotFound("Subject"));
    };
    let Some(year) = session_year::Entity::find_by_id(session_year_id)
        .one(db)
        .await?
    else {
        return Err(ServiceError::NotFound("Session year"));
    };
    let Some(student) = student::Model::resolve_identifier(db, student_identifier.trim()).await?
    else {
        return Err(ServiceError::NotFound("Student"));
    };

    let sessions =
        sessions_in_range(db, subject_id, session_year_id, DateRange::default()).await?;
    let records = records_for_sessions(db, sessions.iter().map(|s| s.id).collect()).await?;
    let present_by_session: HashMap<i64, bool> = records
        .iter()
        .filter(|r| r.student_id == student.id)
        .map(|r| (r.session_id, r.present))
        .collect();

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet().set_name("Report")?;

    let title_format = Format::new().set_bold().set_font_size(14);
    let banner_format = Format::new().set_bold();
    let header_format = Format::new().set_bold();

    sheet.merge_range(
        0,
        0,
        0,
        3,
        &format!(
            "Attendance Report - {} {} ({})",
            subject.code, subject.name, year.name
        ),
        &title_format,
    )?;
    sheet.merge_range(
        1,
        0,
        1,
        3,
        &format!(
            "Student: {} ({}) - generated {}",
            student.full_name(),
            student.username,
            Utc::now().format("%Y-%m-%d")
        ),
        &banner_format,
    )?;

    for (col, title) in EXPORT_HEADERS.iter().enumerate() {
        sheet.write_string_with_format(3, col as u16, *title, &header_format)?;
    }

    let mut present_count = 0usize;
    for (i, session) in sessions.iter().enumerate() {
        let present = present_by_session
            .get(&session.id)
            .copied()
            .unwrap_or(false);
        if present {
            present_count += 1;
        }

        let row = (i + 4) as u32;
        sheet.write_string(row, 0, &student.username)?;
        sheet.write_string(row, 1, student.full_name())?;
        sheet.write_string(row, 2, session.session_date.format("%Y-%m-%d").to_string())?;
        sheet.write_string(row, 3, status_text(present))?;
    }

    let total = sessions.len();
    let rate = if total == 0 {
        0.0
    } else {
        present_count as f64 / total as f64 * 100.0
    };

    let trailer_start = (sessions.len() + 5) as u32;
    sheet.write_string(trailer_start, 0, "Total Sessions:")?;
    sheet.write_string(trailer_start, 1, total.to_string())?;
    sheet.write_string(trailer_start + 1, 0, "Present:")?;
    sheet.write_string(trailer_start + 1, 1, present_count.to_string())?;
    sheet.write_string(trailer_start + 2, 0, "Attendance Rate:")?;
    sheet.write_string(trailer_start + 2, 1, format!("{rate:.1}%"))?;
    sheet.autofit();

    workbook.save_to_buffer().map_err(Into::into)
}

/// Imports attendance rows from an xlsx workbook.
///
/// The header row is located anywhere in the first [`HEADER_SCAN_ROWS`] rows;
/// rows whose leading cell matches a summary marker are skipped. A row's own
/// date column wins over `fallback_date`. Unresolvable students and empty
/// status cells fail row by row without aborting the import; database errors
/// abort.
pub async fn import_attendance(
    db: &DbConn,
    subject_id: i64,
    session_year_id: i64,
    fallback_date: NaiveDate,
    bytes: &[u8],
) -> Result<ImportSummary, ServiceError> {
    if subject::Entity::find_by_id(subject_id)
        .one(db)
        .await?
        .is_none()
    {
        return Err(ServiceError::NotFound("Subject"));
    }
    if session_year::Entity::find_by_id(session_year_id)
        .one(db)
        .await?
        .is_none()
    {
        return Err(ServiceError::NotFound("Session year"));
    }

    let mut workbook = Xlsx::new(Cursor::new(bytes))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ServiceError::Spreadsheet("workbook has no sheets".into()))?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let rows: Vec<&[Data]> = range.rows().collect();
    let first_sheet_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);
    let header = locate_header(&rows)?;

    let mut summary = ImportSummary::default();
    let mut touched: BTreeSet<NaiveDate> = BTreeSet::new();
    let mut sessions: HashMap<NaiveDate, i64> = HashMap::new();

    for (idx, row) in rows.iter().enumerate().skip(header.row + 1) {
        let sheet_row = first_sheet_row + idx + 1;

        if is_blank_row(row) || is_marker_row(row) {
            continue;
        }

        let identifier = cell_to_string(cell_at(row, header.student_id));
        if identifier.is_empty() {
            continue;
        }

        let Some(present) = parse_status(cell_at(row, header.status)) else {
            tracing::warn!(row = sheet_row, "import row discarded, empty status cell");
            summary.failed += 1;
            summary.errors.push(RowError {
                row: sheet_row,
                message: format!("empty status cell for '{identifier}'"),
            });
            continue;
        };

        let Some(student) = student::Model::resolve_identifier(db, &identifier).await? else {
            tracing::warn!(row = sheet_row, %identifier, "import row discarded, unknown student");
            summary.failed += 1;
            summary.errors.push(RowError {
                row: sheet_row,
                message: format!("unknown student '{identifier}'"),
            });
            continue;
        };

        let date = header
            .date
            .and_then(|col| parse_date_cell(cell_at(row, col)))
            .unwrap_or(fallback_date);

        let session_id = match sessions.get(&date) {
            Some(id) => *id,
            None => {
                let session = attendance_session::Model::get_or_create(
                    db,
                    subject_id,
                    session_year_id,
                    date,
                )
                .await?;
                sessions.insert(date, session.id);
                session.id
            }
        };

        attendance_record::Model::upsert_presence(db, session_id, student.id, present).await?;
        touched.insert(date);
        summary.imported += 1;
    }

    summary.dates = touched.into_iter().collect();

    tracing::info!(
        subject_id,
        session_year_id,
        imported = summary.imported,
        failed = summary.failed,
        "attendance import finished"
    );

    Ok(summary)
}

async fn sessions_in_range(
    db: &DbConn,
    subject_id: i64,
    session_year_id: i64,
    range: DateRange,
) -> Result<Vec<attendance_session::Model>, ServiceError> {
    let mut query = attendance_session::Entity::find()
        .filter(attendance_session::Column::SubjectId.eq(subject_id))
        .filter(attendance_session::Column::SessionYearId.eq(session_year_id));
    if let Some(from) = range.from {
        query = query.filter(attendance_session::Column::SessionDate.gte(from));
    }
    if let Some(to) = range.to {
        query = query.filter(attendance_session::Column::SessionDate.lte(to));
    }

    query
        .order_by_asc(attendance_session::Column::SessionDate)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn records_for_sessions(
    db: &DbConn,
    session_ids: Vec<i64>,
) -> Result<Vec<attendance_record::Model>, ServiceError> {
    if session_ids.is_empty() {
        return Ok(Vec::new());
    }

    attendance_record::Entity::find()
        .filter(attendance_record::Column::SessionId.is_in(session_ids))
        .all(db)
        .await
        .map_err(Into::into)
}

async fn students_by_id(
    db: &DbConn,
    mut student_ids: Vec<i64>,
) -> Result<HashMap<i64, student::Model>, ServiceError> {
    student_ids.sort_unstable();
    student_ids.dedup();
    if student_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let students = student::Entity::find()
        .filter(student::Column::Id.is_in(student_ids))
        .all(db)
        .await?;
    Ok(students.into_iter().map(|s| (s.id, s)).collect())
}

fn status_text(present: bool) -> &'static str {
    if present { "Present" } else { "Absent" }
}

struct HeaderColumns {
    /// Index into `rows`, not a sheet row number.
    row: usize,
    student_id: usize,
    status: usize,
    date: Option<usize>,
}

fn locate_header(rows: &[&[Data]]) -> Result<HeaderColumns, ServiceError> {
    let required = ["student id", "student name", "status"];
    let mut best: Option<(usize, Vec<String>)> = None;

    for (idx, row) in rows.iter().take(HEADER_SCAN_ROWS).enumerate() {
        let cells: Vec<String> = row.iter().map(|c| normalize(&cell_to_string(c))).collect();
        let hits = required
            .iter()
            .filter(|r| cells.iter().any(|c| c == *r))
            .count();

        if hits == required.len() {
            let position = |name: &str| cells.iter().position(|c| c == name);
            // All three were just matched.
            let student_id = position("student id").unwrap_or_default();
            let status = position("status").unwrap_or_default();
            return Ok(HeaderColumns {
                row: idx,
                student_id,
                status,
                date: position("date"),
            });
        }

        if best.as_ref().map(|(h, _)| hits > *h).unwrap_or(hits > 0) {
            best = Some((hits, cells));
        }
    }

    let found: Vec<String> = best
        .map(|(_, cells)| cells.into_iter().filter(|c| !c.is_empty()).collect())
        .unwrap_or_default();
    let missing = required
        .iter()
        .filter(|r| !found.contains(&r.to_string()))
        .map(|r| r.to_string())
        .collect();

    Err(ServiceError::SchemaMismatch { missing, found })
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn cell_at<'a>(row: &'a [Data], idx: usize) -> &'a Data {
    row.get(idx).unwrap_or(&Data::Empty)
}

fn is_blank_row(row: &[Data]) -> bool {
    row.iter().all(|c| cell_to_string(c).is_empty())
}

fn is_marker_row(row: &[Data]) -> bool {
    let Some(first) = row.iter().map(cell_to_string).find(|c| !c.is_empty()) else {
        return false;
    };
    let first = normalize(&first);
    SKIP_MARKERS.iter().any(|m| first.starts_with(m))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_owned(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_owned(),
        Data::Error(e) => format!("{e:?}"),
    }
}

fn parse_status(cell: &Data) -> Option<bool> {
    match cell {
        Data::Empty => None,
        Data::Bool(b) => Some(*b),
        Data::Float(f) => Some(*f != 0.0),
        Data::Int(i) => Some(*i != 0),
        _ => {
            let text = normalize(&cell_to_string(cell));
            if text.is_empty() {
                None
            } else {
                Some(PRESENT_WORDS.contains(&text.as_str()))
            }
        }
    }
}

fn parse_date_cell(cell: &Data) -> Option<NaiveDate> {
    match cell {
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()),
        Data::Float(f) => excel_serial_to_date(*f),
        Data::Int(i) => excel_serial_to_date(*i as f64),
        Data::DateTimeIso(s) => parse_date_text(s),
        Data::String(s) => parse_date_text(s),
        _ => None,
    }
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let head = s.get(0..10).unwrap_or(s);
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .ok()
}

fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial <= 0.0 {
        return None;
    }
    let (y, m, d) = EXCEL_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_signed(chrono::Duration::days(serial.trunc() as i64))
}
