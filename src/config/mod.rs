// ABOUTME: Configuration module for deployment-specific settings
// ABOUTME: Environment variable parsing and typed server configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AMS Works

/// Environment-based configuration management
pub mod environment;
