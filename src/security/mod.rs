// ABOUTME: Security helpers for the HTTP boundary
// ABOUTME: Cookie parsing and assembly with environment-aware attributes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AMS Works

/// Cookie parsing and assembly
pub mod cookies;
