// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (caller identity, security headers).

pub mod auth;
pub mod security;

pub use auth::resolve_caller;
