//! Centralized API route path constants
//!
//! utoipa `#[path(...)]` attributes need string literals, so the handler
//! annotations repeat these paths; keep the two in sync.

/// API base path
pub const API_V1: &str = "/api/v1";

/// Health check endpoints
pub mod health {
    pub const HEALTH: &str = "/health";
}

/// Plugin endpoints, relative to [`API_V1`](super::API_V1)
pub mod plugins {
    pub const PLUGINS: &str = "/plugins";
    pub const SEARCH: &str = "/plugins/search";
    pub const UPLOAD: &str = "/plugins/upload";
    pub const BY_ID: &str = "/plugins/:id";
    /// Wildcard so scoped names such as `@acme/widget` match unencoded
    pub const BY_NAME: &str = "/plugins/by-name/*name";
    pub const CONFIG: &str = "/plugins/:id/config";
    pub const DOWNLOAD: &str = "/plugins/:id/versions/:version/download";
}

/// Stored file endpoints, relative to [`API_V1`](super::API_V1)
pub mod files {
    pub const ICON: &str = "/files/icons/*file";
}

/// OpenAPI document
pub mod docs {
    pub const OPENAPI_JSON: &str = "/api-docs/openapi.json";
}
