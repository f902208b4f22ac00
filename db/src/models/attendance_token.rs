use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::QueryOrder;
use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "attendance_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Opaque capability string handed to scanning clients. Never recycled.
    pub token: String,

    pub subject_id: i64,
    pub session_year_id: i64,

    /// Issuer geofence origin; both None means no geofencing was requested.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub allowed_radius_m: f64,

    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub active: bool,

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

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        db: &DbConn,
        subject_id: i64,
        session_year_id: i64,
        location: Option<(f64, f64)>,
        allowed_radius_m: f64,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        token: Option<&str>,
    ) -> Result<Model, DbErr> {
        let token = token
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let row = ActiveModel {
            token: Set(token),
            subject_id: Set(subject_id),
            session_year_id: Set(session_year_id),
            latitude: Set(location.map(|(lat, _)| lat)),
            longitude: Set(location.map(|(_, lng)| lng)),
            allowed_radius_m: Set(allowed_radius_m),
            issued_at: Set(issued_at),
            expires_at: Set(expires_at),
            active: Set(true),
            created_at: Set(issued_at),
            updated_at: Set(issued_at),
            ..Default::default()
        };

        row.insert(db).await
    }

    /// Looks up a token that is still usable: active and not yet expired.
    pub async fn find_usable(
        db: &DbConn,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::Token.eq(token))
            .filter(Column::Active.eq(true))
            .filter(Column::ExpiresAt.gt(now))
            .one(db)
            .await
    }

    pub async fn find_for_subject(
        db: &DbConn,
        subject_id: i64,
        token: &str,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::SubjectId.eq(subject_id))
            .filter(Column::Token.eq(token))
            .one(db)
            .await
    }

    pub async fn list_for_subject(db: &DbConn, subject_id: i64) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::SubjectId.eq(subject_id))
            .order_by_desc(Column::IssuedAt)
            .all(db)
            .await
    }

    /// Administrative kill switch; expiry is left untouched.
    pub async fn set_active(self, db: &DbConn, active: bool) -> Result<Model, DbErr> {
        let mut row: ActiveModel = self.into();
        row.active = Set(active);
        row.updated_at = Set(Utc::now());
        row.update(db).await
    }

    pub fn issuer_location(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }
}
