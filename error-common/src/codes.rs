// Stable error codes surfaced in API error envelopes

pub mod validation {
    pub const INVALID_INPUT: &str = "VALIDATION_1001";
    pub const INVALID_FORMAT: &str = "VALIDATION_1003";
}

pub mod package {
    pub const MALFORMED_ARCHIVE: &str = "PACKAGE_2001";
    pub const INVALID_VERSION: &str = "PACKAGE_2002";
    pub const DUPLICATE_VERSION: &str = "PACKAGE_2003";
    pub const SCHEMA_MISSING: &str = "PACKAGE_2004";
    pub const SCHEMA_INVALID: &str = "PACKAGE_2005";
}

pub mod resource {
    pub const NOT_FOUND: &str = "RESOURCE_3001";
}

pub mod storage {
    pub const OBJECT_STORE_FAILED: &str = "STORAGE_4001";
}

pub mod database {
    pub const CONNECTION_FAILED: &str = "DB_5001";
    pub const QUERY_FAILED: &str = "DB_5002";
}
