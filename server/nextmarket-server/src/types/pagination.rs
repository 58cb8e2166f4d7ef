//! Query parameters shared by the list endpoints

use plugins_registry_api::{PageRequest, DEFAULT_PAGE_SIZE};
use serde::Deserialize;
use utoipa::IntoParams;

/// `page`/`pageSize` as sent by the web console
///
/// Out-of-range values are clamped rather than rejected: page to at least 1,
/// page size to 1..=100.
#[derive(Debug, Default, Deserialize, IntoParams, Clone)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    #[param(example = 1, minimum = 1)]
    pub page: Option<u32>,

    #[serde(rename = "pageSize")]
    #[param(example = 20, minimum = 1, maximum = 100)]
    pub page_size: Option<u32>,
}

impl PaginationParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}

/// Query of `GET /api/v1/plugins`
#[derive(Debug, Default, Deserialize, IntoParams, Clone)]
#[into_params(parameter_in = Query)]
pub struct ListPluginsParams {
    pub page: Option<u32>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<u32>,
    /// Tier filter: `free` or `enterprise`
    #[serde(rename = "type")]
    pub tier: Option<String>,
}

impl ListPluginsParams {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Query of `GET /api/v1/plugins/search`
#[derive(Debug, Default, Deserialize, IntoParams, Clone)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Keyword matched against name, description and keywords
    pub q: Option<String>,
    pub page: Option<u32>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<u32>,
}

impl SearchParams {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// `?version_id=` of the config endpoints
#[derive(Debug, Default, Deserialize, IntoParams, Clone)]
#[into_params(parameter_in = Query)]
pub struct VersionQuery {
    pub version_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let params = PaginationParams::default();
        assert_eq!(params.page_request(), PageRequest::new(1, 20));
    }

    #[test]
    fn test_pagination_clamps() {
        let params = PaginationParams {
            page: Some(0),
            page_size: Some(1000),
        };
        let request = params.page_request();
        assert_eq!(request.page, 1);
        assert_eq!(request.page_size, 100);
    }

    #[test]
    fn test_list_params_from_query_string() {
        let params: ListPluginsParams =
            serde_json::from_value(serde_json::json!({"page": 3, "pageSize": 5, "type": "free"}))
                .unwrap();
        assert_eq!(params.pagination().page_request().offset(), 10);
        assert_eq!(params.tier.as_deref(), Some("free"));
    }
}
