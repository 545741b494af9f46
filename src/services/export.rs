use std::fmt::Write;

use crate::entities::leads;

/// Column order for lead exports. Matches the stored lead schema, contact
/// fields first, company fields after.
const EXPORT_COLUMNS: [&str; 35] = [
    "first_name",
    "last_name",
    "full_name",
    "email",
    "personal_email",
    "job_title",
    "headline",
    "seniority_level",
    "functional_level",
    "linkedin",
    "city",
    "state",
    "country",
    "company_name",
    "company_website",
    "company_domain",
    "company_linkedin",
    "company_linkedin_uid",
    "industry",
    "company_size",
    "company_founded_year",
    "company_phone",
    "company_street_address",
    "company_full_address",
    "company_city",
    "company_state",
    "company_country",
    "company_postal_code",
    "company_description",
    "company_annual_revenue",
    "company_annual_revenue_clean",
    "company_total_funding",
    "company_total_funding_clean",
    "company_technologies",
    "keywords",
];

fn lead_fields(lead: &leads::Model) -> [&Option<String>; 35] {
    [
        &lead.first_name,
        &lead.last_name,
        &lead.full_name,
        &lead.email,
        &lead.personal_email,
        &lead.job_title,
        &lead.headline,
        &lead.seniority_level,
        &lead.functional_level,
        &lead.linkedin,
        &lead.city,
        &lead.state,
        &lead.country,
        &lead.company_name,
        &lead.company_website,
        &lead.company_domain,
        &lead.company_linkedin,
        &lead.company_linkedin_uid,
        &lead.industry,
        &lead.company_size,
        &lead.company_founded_year,
        &lead.company_phone,
        &lead.company_street_address,
        &lead.company_full_address,
        &lead.company_city,
        &lead.company_state,
        &lead.company_country,
        &lead.company_postal_code,
        &lead.company_description,
        &lead.company_annual_revenue,
        &lead.company_annual_revenue_clean,
        &lead.company_total_funding,
        &lead.company_total_funding_clean,
        &lead.company_technologies,
        &lead.keywords,
    ]
}

/// Render leads as CSV with a header row. Every field is quoted, with
/// embedded quotes doubled, so descriptions with commas and newlines stay
/// in one cell.
#[must_use]
pub fn leads_to_csv(leads: &[leads::Model]) -> String {
    let mut csv = EXPORT_COLUMNS.join(",");
    csv.push('\n');

    for lead in leads {
        let mut first = true;
        for field in lead_fields(lead) {
            if !first {
                csv.push(',');
            }
            first = false;

            let value = field.as_deref().unwrap_or_default();
            let _ = write!(csv, "\"{}\"", value.replace('"', "\"\""));
        }
        csv.push('\n');
    }

    csv
}
