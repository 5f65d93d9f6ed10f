//! HTTP client bound to one base URL
//!
//! Thin layer over `reqwest`: default user agent, basic or bearer auth, a
//! pluggable error checker and response decoder, and a `tracing` span per
//! request.

pub mod client;
pub mod errors;
pub mod response;

pub use client::{Client, ClientBuilder, DEFAULT_USER_AGENT, ErrChecker, default_err_checker};
pub use errors::{HttpError, RequestError};
pub use response::{JsonDecoder, Response, ResponseDecoder};

pub use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
pub use reqwest::{Method, StatusCode};
