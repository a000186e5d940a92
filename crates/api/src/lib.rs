//! HTTP API: report triggering, status polling and artifact download.

pub mod app;
