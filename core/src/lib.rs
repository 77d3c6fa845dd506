//! Blocking client for the Scrapyd job-scheduling HTTP API.
//!
//! # Overview
//! [`ScrapydApi`] exposes one method per Scrapyd operation: deploy a project
//! version, schedule and cancel jobs, and list projects, versions, spiders
//! and jobs. Each call builds an endpoint URL, shapes the request payload,
//! makes a single round trip and returns the field the operation is about.
//!
//! # Design
//! - [`Client`] is the transport adapter. It sends an [`HttpRequest`] through
//!   a [`Transport`] and decodes the uniform `{"status": ...}` envelope into
//!   the remaining fields or an [`ApiError`].
//! - [`UreqTransport`] is the default transport; anything implementing
//!   [`Transport`] can replace it, including test doubles.
//! - The endpoint table, target and timeout are fixed when the façade is
//!   built; no state is shared between calls.
//!
//! ```no_run
//! use scrapyd_client::{ScheduleOptions, ScrapydApi};
//!
//! # fn main() -> scrapyd_client::Result<()> {
//! let api = ScrapydApi::builder("http://localhost:6800")
//!     .auth("user", "secret")
//!     .build()?;
//! let job = api.schedule(
//!     "myproject",
//!     "quotes",
//!     &ScheduleOptions::new().setting("DOWNLOAD_DELAY", 2),
//! )?;
//! println!("{job}: {:?}", api.job_status("myproject", &job)?);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use api::ScrapydApi;
pub use client::{check_status, decode_envelope, Client, Envelope};
pub use config::{ApiBuilder, ApiConfig, Credentials, DEFAULT_TARGET};
pub use endpoints::{Endpoint, Endpoints};
pub use error::{ApiError, ErrorKind, Result};
pub use http::{FilePart, Form, HttpMethod, HttpRequest, HttpResponse, Multipart, RequestBody, Timeout};
pub use transport::{Transport, UreqTransport};
pub use types::{Egg, Job, JobList, JobState, ScheduleOptions, UploadedSpiders};
