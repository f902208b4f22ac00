pub mod m202607140001_create_subjects;
pub mod m202607140002_create_session_years;
pub mod m202607140003_create_students;
pub mod m202607150001_create_attendance_tokens;
pub mod m202607150002_create_attendance_sessions;
pub mod m202607150003_create_attendance_records;
