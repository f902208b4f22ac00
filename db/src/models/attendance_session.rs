use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::error::SqlErr;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "attendance_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub subject_id: i64,
    pub session_year_id: i64,
    pub session_date: NaiveDate,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::subject::Entity",
        from = "Column::SubjectId",
        to = "super::subject::Column::Id",
        on_delete = "Cascade"
    )]
    Subject,
    #[sea_orm(
        belongs_to = "super::session_year::Entity",
        from = "Column::SessionYearId",
        to = "super::session_year::Column::Id",
        on_delete = "Cascade"
    )]
    SessionYear,
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    Records,
}

impl Related<super::subject::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subject.def()
    }
}

impl Related<super::session_year::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SessionYear.def()
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn find_for_date(
        db: &DbConn,
        subject_id: i64,
        session_year_id: i64,
        date: NaiveDate,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::SubjectId.eq(subject_id))
            .filter(Column::SessionYearId.eq(session_year_id))
            .filter(Column::SessionDate.eq(date))
            .one(db)
            .await
    }

    /// Lazily materializes the session for (subject, year, date).
    ///
    /// Two concurrent first-scans both reach the insert; the loser hits the
    /// unique index and re-reads the winner's row instead of failing.
    pub async fn get_or_create(
        db: &DbConn,
        subject_id: i64,
        session_year_id: i64,
        date: NaiveDate,
    ) -> Result<Model, DbErr> {
        if let Some(existing) = Self::find_for_date(db, subject_id, session_year_id, date).await? {
            return Ok(existing);
        }

        let now = Utc::now();
        let session = ActiveModel {
            subject_id: Set(subject_id),
            session_year_id: Set(session_year_id),
            session_date: Set(date),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        match session.insert(db).await {
            Ok(created) => Ok(created),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Self::find_for_date(db, subject_id, session_year_id, date)
                    .await?
                    .ok_or(e)
            }
            Err(e) => Err(e),
        }
    }
}
