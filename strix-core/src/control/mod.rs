//! Control plane: request/response calls to the host.
//!
//! - [`client`] - `ControlPlaneClient` (server info, launch, resume, quit,
//!   app list, box art)
//! - [`server_info`] - `ServerDescriptor` and friends
//! - [`transport`] - the HTTP seam and its `reqwest` implementation
//! - [`xml`] - reply envelope verification

pub mod client;
pub mod server_info;
pub mod transport;
pub mod xml;

pub use client::{ControlPlaneClient, DEFAULT_REQUEST_TIMEOUT, HTTP_PORT, HTTPS_PORT, RequestLogLevel};
pub use server_info::{
    AppDescriptor, DisplayMode, GpuCodecSupport, PairState, ServerDescriptor, VersionQuad,
};
pub use transport::{HttpReply, ReqwestTransport, Transport};
pub use xml::{Envelope, verify_status};

/// URL type of the control-plane endpoints.
pub use reqwest::Url;
