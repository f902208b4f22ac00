use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202607140001_create_subjects::Migration),
            Box::new(migrations::m202607140002_create_session_years::Migration),
            Box::new(migrations::m202607140003_create_students::Migration),
            Box::new(migrations::m202607150001_create_attendance_tokens::Migration),
            Box::new(migrations::m202607150002_create_attendance_sessions::Migration),
            Box::new(migrations::m202607150003_create_attendance_records::Migration),
        ]
    }
}
