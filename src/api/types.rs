use serde::Serialize;
use serde_json::Value;

use crate::db::User;
use crate::entities::{leads, plans, search_history};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub email: String,
    pub api_key: String,
    pub plan_id: Option<i32>,
    pub created_at: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            api_key: user.api_key,
            plan_id: user.plan_id,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlanDto {
    pub id: i32,
    pub name: String,
    pub monthly_price: f64,
    pub yearly_price: f64,
    pub stripe_monthly_price_id: Option<String>,
    pub stripe_yearly_price_id: Option<String>,
    pub features: Vec<String>,
    pub is_popular: bool,
    pub display_order: i32,
    pub search_limit: i32,
    pub rows_limit: i32,
}

impl From<plans::Model> for PlanDto {
    fn from(model: plans::Model) -> Self {
        // The features column holds a JSON array written by the same code
        let features = serde_json::from_str(&model.features).unwrap_or_default();
        Self {
            id: model.id,
            name: model.name,
            monthly_price: model.monthly_price,
            yearly_price: model.yearly_price,
            stripe_monthly_price_id: model.stripe_monthly_price_id,
            stripe_yearly_price_id: model.stripe_yearly_price_id,
            features,
            is_popular: model.is_popular,
            display_order: model.display_order,
            search_limit: model.search_limit,
            rows_limit: model.rows_limit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchHistoryDto {
    pub id: String,
    pub parameters: Value,
    pub result_count: i32,
    pub created_at: String,
}

impl From<search_history::Model> for SearchHistoryDto {
    fn from(model: search_history::Model) -> Self {
        let parameters = serde_json::from_str(&model.parameters).unwrap_or(Value::Null);
        Self {
            id: model.id,
            parameters,
            result_count: model.result_count,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LeadDto {
    pub id: String,
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

impl From<leads::Model> for LeadDto {
    fn from(model: leads::Model) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            full_name: model.full_name,
            email: model.email,
            personal_email: model.personal_email,
            job_title: model.job_title,
            headline: model.headline,
            seniority_level: model.seniority_level,
            functional_level: model.functional_level,
            linkedin: model.linkedin,
            city: model.city,
            state: model.state,
            country: model.country,
            company_name: model.company_name,
            company_website: model.company_website,
            company_domain: model.company_domain,
            company_linkedin: model.company_linkedin,
            company_linkedin_uid: model.company_linkedin_uid,
            industry: model.industry,
            company_size: model.company_size,
            company_founded_year: model.company_founded_year,
            company_phone: model.company_phone,
            company_street_address: model.company_street_address,
            company_full_address: model.company_full_address,
            company_city: model.company_city,
            company_state: model.company_state,
            company_country: model.company_country,
            company_postal_code: model.company_postal_code,
            company_description: model.company_description,
            company_annual_revenue: model.company_annual_revenue,
            company_annual_revenue_clean: model.company_annual_revenue_clean,
            company_total_funding: model.company_total_funding,
            company_total_funding_clean: model.company_total_funding_clean,
            company_technologies: model.company_technologies,
            keywords: model.keywords,
        }
    }
}
