// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod account;
pub mod activity;

pub use account::{Account, ClientCredentials, TokenSet, TokenState};
pub use activity::Activity;
