//! GitHub infrastructure adapter.
//!
//! Implements [`pipeline::VersionControl`] against the GitHub REST API with
//! [`reqwest`]. Three read-only endpoints are used: the pull-request list of a
//! team repository, the commit list of one pull request, and a single commit
//! with its file diff.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules.
//! Transport failures are classified into [`pipeline::GatewayError`]; deciding
//! what they mean for the run is left to the pipeline.

pub mod client;
mod dto;

pub use client::{GithubClient, GithubConfig, DEFAULT_API_URL, DEFAULT_ORG, HTTP_TIMEOUT};
