//! pmslink core - media server discovery, connection and playback library.
//!
//! This crate lets a media player find home media servers on the LAN, pick
//! the best way to reach each one, and turn library items into something a
//! player can open.
//!
//! # Architecture
//!
//! - [`gdm`]: UDP multicast discovery and client registration beacon
//! - [`registry`]: Shared table of known servers
//! - [`connection`]: Address arbitration, data requests with protocol fallback
//! - [`playback`]: Stream extraction, part selection, URL building, transcoding
//! - [`services`]: Background discovery and registration loops
//! - [`bootstrap`]: Composition root wiring the services together
//! - [`settings`] / [`identity`]: Player settings and client identification
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`Prober`](connection::Prober) / [`HttpTransport`](connection::HttpTransport):
//!   network access for arbitration and data requests
//! - [`Chooser`](playback::Chooser): user selection between media parts
//! - [`FileSystem`](playback::FileSystem): local file existence checks
//!
//! Each trait has a default implementation; tests substitute fakes.

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod bootstrap;
pub mod connection;
pub mod error;
pub mod gdm;
pub mod identity;
pub mod playback;
pub mod protocol_constants;
pub mod registry;
pub mod services;
pub mod settings;
pub mod xml;

// Re-export commonly used types at the crate root
pub use bootstrap::{
    bootstrap_services, bootstrap_with_transport, BootstrapConfig, BootstrappedServices,
};
pub use error::{ErrorCode, PmsError, PmsResult};
pub use identity::ClientIdentity;
pub use settings::{Settings, SettingsError, StreamControl, StreamPolicy};

// Re-export discovery and registry types
pub use gdm::{ClientRegistration, DiscoveredServer, GdmBeacon, GdmConfig, GdmError, GdmResult};
pub use registry::{
    DiscoveryOrigin, Scheme, ServerClass, ServerRecord, ServerRegistry, ServerStatus,
    ServerSummary,
};

// Re-export connection types
pub use connection::{
    ArbitrationOutcome, ConnectionArbiter, HttpMethod, LibraryClient, ReqwestTransport,
    TransportError,
};

// Re-export playback types
pub use playback::{
    Chooser, FileSystem, LocalFileSystem, PlaybackDescriptor, PlaybackError, PlaybackRequest,
    PlaybackResolver, PlaybackResult,
};

// Re-export service types
pub use services::GdmService;
