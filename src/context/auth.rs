// ABOUTME: Requestor identity carried through request extensions
// ABOUTME: Set by the auth gates, read by the per-user route handlers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AMS Works

use uuid::Uuid;

use crate::constants::requestor;

/// The authenticated user ID of the current request
///
/// Injected into request extensions by the middleware gates. Anonymous
/// rate-limited requests carry the nil placeholder instead of a real ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestorId(pub Uuid);

impl RequestorId {
    /// Placeholder identity for anonymous rate-limited requests
    #[must_use]
    pub const fn anonymous() -> Self {
        Self(requestor::anonymous())
    }

    /// Whether this is the anonymous placeholder
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.0 == requestor::anonymous()
    }
}

impl std::fmt::Display for RequestorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
