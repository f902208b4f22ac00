pub mod attendance_record;
pub mod attendance_session;
pub mod attendance_token;
pub mod session_year;
pub mod student;
pub mod subject;
