//! Connection arbitration.
//!
//! Picks one reachable address per server out of every candidate the record
//! knows about, and carries data requests to it with protocol fallback.

mod arbiter;
mod candidate;
mod library;
mod transport;

pub use arbiter::{ArbitrationOutcome, ConnectionArbiter, TranscodeSession};
pub use candidate::{
    build_candidates, select_best, CandidateOrigin, ConnectionCandidate, ProbeResult,
};
pub use library::{LibraryClient, PlaybackState};
pub use transport::{
    HttpMethod, HttpResponse, HttpTransport, Prober, ReqwestTransport, TransportError,
};
