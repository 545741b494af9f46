use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "plans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,

    pub monthly_price: f64,

    pub yearly_price: f64,

    /// Stripe price ids are stored for the checkout collaborator but never
    /// interpreted by this service.
    pub stripe_monthly_price_id: Option<String>,

    pub stripe_yearly_price_id: Option<String>,

    /// JSON array of display feature strings.
    pub features: String,

    pub is_popular: bool,

    pub display_order: i32,

    /// Searches allowed per calendar month.
    pub search_limit: i32,

    /// Max result rows returned per single search.
    pub rows_limit: i32,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::users::Entity")]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
