use sea_orm::{ActiveValue, entity::prelude::*};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub release_date: String,
    /// Generated by the database from `release_date`; never written.
    pub release_year: i32,
    pub genre: String,
    pub distributor: Option<String>,
    pub budget: Option<i64>,
    pub mpa_rating: Option<String>,
    pub box_office: Option<Json>,
    /// Lowercased copies of the searchable text columns, kept in sync by
    /// `before_save`.
    pub title_folded: String,
    pub genre_folded: String,
    pub distributor_folded: Option<String>,
    pub mpa_rating_folded: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::rating::Entity")]
    Rating,
}

impl Related<super::rating::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rating.def()
    }
}

/// Unicode case folding for text filters. SQLite's own `lower` and `LIKE`
/// only fold ASCII.
pub fn fold(text: &str) -> String {
    text.to_lowercase()
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if let ActiveValue::Set(title) = &self.title {
            self.title_folded = ActiveValue::Set(fold(title));
        }
        if let ActiveValue::Set(genre) = &self.genre {
            self.genre_folded = ActiveValue::Set(fold(genre));
        }
        if let ActiveValue::Set(distributor) = &self.distributor {
            self.distributor_folded = ActiveValue::Set(distributor.as_deref().map(fold));
        }
        if let ActiveValue::Set(mpa_rating) = &self.mpa_rating {
            self.mpa_rating_folded = ActiveValue::Set(mpa_rating.as_deref().map(fold));
        }
        Ok(self)
    }
}
