use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "students")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Stable login identifier; this is what exports emit as "Student ID".
    pub username: String,
    /// External registration number, accepted as an alternative import key.
    pub admin_number: String,
    pub first_name: String,
    pub last_name: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    Records,
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &DbConn,
        username: &str,
        admin_number: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();
        let student = ActiveModel {
            username: Set(username.to_owned()),
            admin_number: Set(admin_number.to_owned()),
            first_name: Set(first_name.to_owned()),
            last_name: Set(last_name.to_owned()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        student.insert(db).await
    }

    pub async fn find_by_username(db: &DbConn, username: &str) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::Username.eq(username))
            .one(db)
            .await
    }

    /// Resolves an identifier the way bulk imports present it: login username
    /// first, then registration number, then a purely-numeric internal id.
    pub async fn resolve_identifier(db: &DbConn, identifier: &str) -> Result<Option<Model>, DbErr> {
        let ident = identifier.trim();
        if ident.is_empty() {
            return Ok(None);
        }

        if let Some(found) = Entity::find()
            .filter(Column::Username.eq(ident))
            .one(db)
            .await?
        {
            return Ok(Some(found));
        }

        if let Some(found) = Entity::find()
            .filter(Column::AdminNumber.eq(ident))
            .one(db)
            .await?
        {
            return Ok(Some(found));
        }

        if let Ok(id) = ident.parse::<i64>() {
            return Entity::find_by_id(id).one(db).await;
        }

        Ok(None)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
