//! # CloudNav
//!
//! A personal link dashboard: a public, read-only view of grouped links and
//! a password-protected admin surface that edits them.
//!
//! ## Document
//!
//! All content lives in one document (settings, groups, sections, links)
//! stored under a single key. Every write is normalized first: orders are
//! renumbered densely, dangling references are repaired or dropped, and
//! settings fall back to defaults field by field.
//!
//! ## Writes
//!
//! A single task owns the store and applies requests in arrival order, so a
//! read-modify-write from one admin request never interleaves with another.
//!
//! ## Admin sessions
//!
//! Login exchanges the configured password for an HMAC-signed session
//! cookie. Failed logins are counted per client IP and answered more slowly
//! the more often they fail.

pub mod api;
pub mod cli;
pub mod model;
pub mod store;
