//! HTTP client for the lead backend.
//!
//! Every call maps onto one endpoint of the backend API. Business-level
//! outcomes (not found, ambiguous match, server-side validation) come back as
//! values or [`ApiError::Rejected`]; anything that prevented a well-formed
//! answer is a transport-class error.

mod client;
mod error;

pub use client::{HttpLeadApi, LeadApi, OutgoingChat, DEFAULT_API_URL};
pub use error::{ApiError, Result};
