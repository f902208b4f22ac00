use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::error::SqlErr;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: i64,

    pub present: bool,

    /// Location evidence as submitted by the scanning client.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy_m: Option<f64>,

    pub location_verified: bool,
    /// Structured verification breakdown (distance, margins, network method).
    pub verification: Option<Json>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::attendance_session::Entity",
        from = "Column::SessionId",
        to = "super::attendance_session::Column::Id",
        on_delete = "Cascade"
    )]
    Session,
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id",
        on_delete = "Cascade"
    )]
    Student,
}

impl Related<super::attendance_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn find_for(
        db: &DbConn,
        session_id: i64,
        student_id: i64,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id((session_id, student_id)).one(db).await
    }

    /// Inserts the one-and-only record for (session, student).
    ///
    /// The composite key makes a concurrent duplicate insert fail; callers
    /// decide whether that is a duplicate-attendance rejection (scan) or an
    /// update (import).
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        db: &DbConn,
        session_id: i64,
        student_id: i64,
        present: bool,
        location: Option<(f64, f64)>,
        accuracy_m: Option<f64>,
        location_verified: bool,
        verification: Option<Json>,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();
        let record = ActiveModel {
            session_id: Set(session_id),
            student_id: Set(student_id),
            present: Set(present),
            latitude: Set(location.map(|(lat, _)| lat)),
            longitude: Set(location.map(|(_, lng)| lng)),
            accuracy_m: Set(accuracy_m),
            location_verified: Set(location_verified),
            verification: Set(verification),
            created_at: Set(now),
            updated_at: Set(now),
        };

        record.insert(db).await
    }

    /// Create-or-overwrite used by reconciliation: presence wins, location
    /// evidence from an earlier live scan is kept.
    pub async fn upsert_presence(
        db: &DbConn,
        session_id: i64,
        student_id: i64,
        present: bool,
    ) -> Result<Model, DbErr> {
        if let Some(existing) = Self::find_for(db, session_id, student_id).await? {
            return existing.set_present(db, present).await;
        }

        match Self::create(db, session_id, student_id, present, None, None, false, None).await {
            Ok(created) => Ok(created),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                match Self::find_for(db, session_id, student_id).await? {
                    Some(existing) => existing.set_present(db, present).await,
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn set_present(self, db: &DbConn, present: bool) -> Result<Model, DbErr> {
        let mut row: ActiveModel = self.into();
        row.present = Set(present);
        row.updated_at = Set(Utc::now());
        row.update(db).await
    }

    pub async fn count_for_session(db: &DbConn, session_id: i64) -> Result<u64, DbErr> {
        use sea_orm::PaginatorTrait;

        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .count(db)
            .await
    }
}
