use sea_orm::entity::prelude::*;

/// One prospective contact + employer record. Every attribute is optional;
/// the provider frequently omits fields, and absent values are stored as
/// NULL rather than empty strings.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "leads")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub search_history_id: String,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub personal_email: Option<String>,
    pub job_title: Option<String>,
    pub headline: Option<String>,
    pub seniority_level: Option<String>,
    pub functional_level: Option<String>,
    pub linkedin: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,

    pub company_name: Option<String>,
    pub company_website: Option<String>,
    pub company_domain: Option<String>,
    pub company_linkedin: Option<String>,
    pub company_linkedin_uid: Option<String>,
    pub industry: Option<String>,
    pub company_size: Option<String>,
    pub company_founded_year: Option<String>,
    pub company_phone: Option<String>,
    pub company_street_address: Option<String>,
    pub company_full_address: Option<String>,
    pub company_city: Option<String>,
    pub company_state: Option<String>,
    pub company_country: Option<String>,
    pub company_postal_code: Option<String>,
    pub company_description: Option<String>,
    pub company_annual_revenue: Option<String>,
    pub company_annual_revenue_clean: Option<String>,
    pub company_total_funding: Option<String>,
    pub company_total_funding_clean: Option<String>,
    pub company_technologies: Option<String>,
    pub keywords: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::search_history::Entity",
        from = "Column::SearchHistoryId",
        to = "super::search_history::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    SearchHistory,
}

impl Related<super::search_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SearchHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
