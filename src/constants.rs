// ABOUTME: Service-wide constants grouped into small namespaces
// ABOUTME: Token TTLs, cookie suffixes, header names, and store key layout
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 AMS Works

/// Token lifetimes in seconds
pub mod ttl {
    /// Access token lifetime (15 minutes)
    pub const ACCESS_TOKEN_SECS: u64 = 900;
    /// Refresh token lifetime (7 days)
    pub const REFRESH_TOKEN_SECS: u64 = 604_800;
    /// Magic-link and email-verification token lifetime (10 minutes)
    pub const EPHEMERAL_TOKEN_SECS: u64 = 600;
    /// OAuth protection-state cookie lifetime (20 minutes)
    pub const OAUTH_STATE_COOKIE_SECS: u64 = 1_200;
}

/// Cookie naming; the prefix is configurable, the suffixes are not
pub mod cookies {
    /// Default cookie name prefix
    pub const DEFAULT_PREFIX: &str = "ams";
    /// Access-token cookie suffix (HttpOnly)
    pub const ACCESS_SUFFIX: &str = "_at";
    /// Refresh-token cookie suffix (HttpOnly)
    pub const REFRESH_SUFFIX: &str = "_rt";
    /// Access-expiry companion suffix (readable by browser JS)
    pub const ACCESS_EXPIRY_SUFFIX: &str = "_at_exp";
    /// Refresh-expiry companion suffix (readable by browser JS)
    pub const REFRESH_EXPIRY_SUFFIX: &str = "_rt_exp";
    /// OAuth protection-state cookie suffix, prefixed by the provider name
    pub const OAUTH_STATE_SUFFIX: &str = "_oauth_state";
}

/// Header names the service reads or writes
pub mod headers {
    /// Long-lived API token channel; takes precedence over the bearer channel
    pub const API_TOKEN: &str = "x-api-token";
    /// Request correlation ID, generated when absent
    pub const CORRELATION_ID: &str = "x-correlation-id";
    /// Post-login redirect location returned from the OAuth callback
    pub const WEB_LOCATION: &str = "x-web-location";
    /// Client IP when fronted by Cloudflare; fallback is the socket address
    pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";
}

/// Ephemeral store key layout
pub mod store {
    /// Separator inside the combined `"<user_id>::<uuid>"` key
    pub const COMBINED_KEY_SEPARATOR: &str = "::";
    /// Prefix for rate-limit counter keys, keeping them out of session scans
    pub const RATE_LIMIT_KEY_PREFIX: &str = "rl:";
    /// Sliding rate-limit window
    pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;
    /// Default in-memory entry cap
    pub const DEFAULT_MAX_ENTRIES: usize = 10_000;
    /// Default expired-entry sweep interval
    pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;
}

/// HTTP surface layout
pub mod routes {
    /// Versioned base path of the access management service
    pub const API_BASE: &str = "/api/v1/ams";
}

/// Pagination bounds
pub mod pagination {
    /// How many API tokens are scanned when enforcing role quotas
    pub const API_TOKEN_SCAN_LIMIT: u32 = 100;
}

/// Requestor identity placeholders
pub mod requestor {
    use uuid::Uuid;

    /// Placeholder identity attached to anonymous rate-limited requests
    #[must_use]
    pub const fn anonymous() -> Uuid {
        Uuid::nil()
    }
}
