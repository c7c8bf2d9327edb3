//! HTTP handlers: browser pages and their AJAX actions, accounts, and the REST API.

pub mod accounts;
pub mod api;
pub mod forms;
