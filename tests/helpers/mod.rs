// ABOUTME: Shared helper modules for integration tests
// ABOUTME: HTTP testing utilities for exercising the router in-process
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AMS Works

pub mod axum_test;
