//! Client-side data-access layer for the todo service.
//!
//! # Overview
//! Two layers sit between UI code and the REST server:
//! - the API client (`TodoClient` + `Transport`, combined in `TodoApi`)
//!   turns typed calls into exactly one HTTP request each and unwraps the
//!   `{"data": ...}` envelope;
//! - `TodoStore` keeps the list, pagination, filter and sort parameters and
//!   the loading/error flags in a watchable state container.
//!
//! # Design
//! - `TodoClient` is stateless and I/O-free: `build_*` produces an
//!   `HttpRequest`, `parse_*` consumes an `HttpResponse`.
//! - `Transport` is the single I/O seam; `ReqwestTransport` is the default.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod store;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use api::TodoApi;
pub use client::TodoClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use store::{TodoState, TodoStore};
pub use transport::{ReqwestTransport, Transport};
pub use types::{CreateTodo, ListParams, Meta, Todo, TodoId, TodoPage, UpdateTodo};
