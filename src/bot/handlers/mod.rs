//! Discord interaction handlers
//!
//! This module provides handlers for Discord interactions that are not commands:
//! autocomplete suggestions and the gateway message listener.

/// Autocomplete handlers for shop items and pet names
pub mod autocomplete;
/// Gateway event handler driving message rewards
pub mod messages;
