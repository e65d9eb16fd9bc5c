// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Brightfield Primary School

//! school-edge - Edge Gateway for the Brightfield Primary School Website
//!
//! This crate fronts the school's public website: it stamps a per-request
//! CSP nonce onto every page response, forwards pages to the render
//! upstream, and exposes the self-service portal API backed by the school's
//! REST backend, authenticated through a signed HMAC token bootstrap.
//!
//! ## Modules
//!
//! - `api` - Portal HTTP API handlers (Axum)
//! - `auth` - Signed token bootstrap against the backend API
//! - `backend` - Authenticated pass-through client for portal calls
//! - `edge` - CSP nonce preprocessor and render upstream forwarder

pub mod api;
pub mod auth;
pub mod backend;
pub mod config;
pub mod edge;
pub mod error;
pub mod models;
pub mod state;
