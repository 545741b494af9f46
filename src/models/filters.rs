use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Typed search filters submitted by the caller. Every field is optional,
/// but a request must carry at least one usable field after sanitization.
/// Unknown keys are rejected at deserialization rather than silently
/// forwarded to the provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchFilters {
    pub company_industry: Option<Vec<String>>,
    pub company_keywords: Option<Vec<String>>,
    pub contact_job_title: Option<Vec<String>>,
    pub contact_location: Option<Vec<String>>,
    pub email_status: Option<Vec<String>>,
    pub company_size: Option<Vec<String>>,
    pub min_revenue: Option<String>,
    pub fetch_count: Option<i64>,
}

impl SearchFilters {
    /// Produce the provider payload: only keys whose value is a non-empty
    /// list, a non-blank (post-trim) string, or a present scalar survive.
    #[must_use]
    pub fn sanitize(&self) -> Map<String, Value> {
        let mut params = Map::new();

        insert_list(&mut params, "company_industry", &self.company_industry);
        insert_list(&mut params, "company_keywords", &self.company_keywords);
        insert_list(&mut params, "contact_job_title", &self.contact_job_title);
        insert_list(&mut params, "contact_location", &self.contact_location);
        insert_list(&mut params, "email_status", &self.email_status);
        insert_list(&mut params, "company_size", &self.company_size);

        if let Some(revenue) = &self.min_revenue {
            let trimmed = revenue.trim();
            if !trimmed.is_empty() {
                params.insert("min_revenue".to_string(), Value::from(trimmed));
            }
        }

        if let Some(count) = self.fetch_count {
            params.insert("fetch_count".to_string(), Value::from(count));
        }

        params
    }
}

fn insert_list(params: &mut Map<String, Value>, key: &str, values: &Option<Vec<String>>) {
    if let Some(values) = values {
        let cleaned: Vec<&str> = values
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .collect();

        if !cleaned.is_empty() {
            params.insert(key.to_string(), Value::from(cleaned));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_drops_empty_lists_and_blank_strings() {
        let filters = SearchFilters {
            company_industry: Some(vec!["software".to_string()]),
            company_keywords: Some(vec![]),
            contact_job_title: Some(vec!["   ".to_string()]),
            min_revenue: Some("  ".to_string()),
            ..Default::default()
        };

        let params = filters.sanitize();
        assert_eq!(params.len(), 1);
        assert_eq!(params["company_industry"], serde_json::json!(["software"]));
    }

    #[test]
    fn sanitize_trims_list_entries() {
        let filters = SearchFilters {
            contact_location: Some(vec![" united states ".to_string(), String::new()]),
            ..Default::default()
        };

        let params = filters.sanitize();
        assert_eq!(
            params["contact_location"],
            serde_json::json!(["united states"])
        );
    }

    #[test]
    fn sanitize_keeps_fetch_count_scalar() {
        let filters = SearchFilters {
            fetch_count: Some(25),
            ..Default::default()
        };

        let params = filters.sanitize();
        assert_eq!(params["fetch_count"], serde_json::json!(25));
    }

    #[test]
    fn empty_filters_sanitize_to_empty_map() {
        assert!(SearchFilters::default().sanitize().is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let raw = serde_json::json!({ "company_industry": ["saas"], "bogus": 1 });
        assert!(serde_json::from_value::<SearchFilters>(raw).is_err());
    }

    #[test]
    fn non_integer_fetch_count_is_rejected() {
        // Absent means "use the plan default" downstream, but a present
        // value must be an integer.
        let raw = serde_json::json!({ "company_industry": ["saas"], "fetch_count": "abc" });
        assert!(serde_json::from_value::<SearchFilters>(raw).is_err());

        let raw = serde_json::json!({ "company_industry": ["saas"], "fetch_count": 25 });
        let filters = serde_json::from_value::<SearchFilters>(raw).unwrap();
        assert_eq!(filters.fetch_count, Some(25));
    }
}
