use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Default API key for the seeded admin account (regenerate after first login)
const DEFAULT_API_KEY: &str = "leadfinder_default_api_key_please_regenerate";

/// Default admin identity; must be covered by the configured admin allow-list.
const DEFAULT_ADMIN_EMAIL: &str = "admin@leadfind.com";

/// Hash the default password using Argon2id
fn hash_default_password() -> String {
    use argon2::{
        Argon2,
        password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
    };

    let password = b"password";
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password, &salt)
        .expect("Failed to hash default password")
        .to_string()
}

struct PlanSeed {
    name: &'static str,
    monthly_price: f64,
    yearly_price: f64,
    features: &'static [&'static str],
    is_popular: bool,
    display_order: i32,
    search_limit: i32,
    rows_limit: i32,
}

const PLAN_SEEDS: &[PlanSeed] = &[
    PlanSeed {
        name: "Free",
        monthly_price: 0.0,
        yearly_price: 0.0,
        features: &[
            "2 searches per month",
            "50 records per search",
            "Export to CSV & JSON",
            "Search history",
        ],
        is_popular: false,
        display_order: 0,
        search_limit: 2,
        rows_limit: 50,
    },
    PlanSeed {
        name: "Basic",
        monthly_price: 15.0,
        yearly_price: 150.0,
        features: &[
            "100 searches per month",
            "100 records per search",
            "Export to CSV & JSON",
            "Search history",
            "Priority support",
        ],
        is_popular: true,
        display_order: 1,
        search_limit: 100,
        rows_limit: 100,
    },
    PlanSeed {
        name: "Ultra",
        monthly_price: 25.0,
        yearly_price: 250.0,
        features: &[
            "1,000 searches per month",
            "1,000 records per search",
            "Export to CSV & JSON",
            "Search history",
            "Priority support",
            "Advanced filters",
        ],
        is_popular: false,
        display_order: 2,
        search_limit: 1000,
        rows_limit: 1000,
    },
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Plans)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Users)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(SearchHistory)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Leads)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Quota accounting counts a user's searches since first-of-month.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_search_history_user_created")
                    .table(SearchHistory)
                    .col(crate::entities::search_history::Column::UserId)
                    .col(crate::entities::search_history::Column::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_leads_search_history")
                    .table(Leads)
                    .col(crate::entities::leads::Column::SearchHistoryId)
                    .to_owned(),
            )
            .await?;

        let now = chrono::Utc::now().to_rfc3339();

        for seed in PLAN_SEEDS {
            let features = serde_json::to_string(seed.features)
                .map_err(|e| DbErr::Custom(format!("Failed to serialize plan features: {e}")))?;

            let insert = sea_orm_migration::sea_query::Query::insert()
                .into_table(Plans)
                .columns([
                    crate::entities::plans::Column::Name,
                    crate::entities::plans::Column::MonthlyPrice,
                    crate::entities::plans::Column::YearlyPrice,
                    crate::entities::plans::Column::Features,
                    crate::entities::plans::Column::IsPopular,
                    crate::entities::plans::Column::DisplayOrder,
                    crate::entities::plans::Column::SearchLimit,
                    crate::entities::plans::Column::RowsLimit,
                    crate::entities::plans::Column::CreatedAt,
                    crate::entities::plans::Column::UpdatedAt,
                ])
                .values_panic([
                    seed.name.into(),
                    seed.monthly_price.into(),
                    seed.yearly_price.into(),
                    features.into(),
                    seed.is_popular.into(),
                    seed.display_order.into(),
                    seed.search_limit.into(),
                    seed.rows_limit.into(),
                    now.clone().into(),
                    now.clone().into(),
                ])
                .to_owned();

            manager.exec_stmt(insert).await?;
        }

        // Seed default admin user with hashed password
        let password_hash = hash_default_password();

        let insert = sea_orm_migration::sea_query::Query::insert()
            .into_table(Users)
            .columns([
                crate::entities::users::Column::Email,
                crate::entities::users::Column::PasswordHash,
                crate::entities::users::Column::ApiKey,
                crate::entities::users::Column::CreatedAt,
                crate::entities::users::Column::UpdatedAt,
            ])
            .values_panic([
                DEFAULT_ADMIN_EMAIL.into(),
                password_hash.into(),
                DEFAULT_API_KEY.into(),
                now.clone().into(),
                now.into(),
            ])
            .to_owned();

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Leads).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SearchHistory).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Plans).to_owned())
            .await?;

        Ok(())
    }
}
