//! ROI crossing counter
//!
//! This crate counts, per user-drawn line boundary ("region"), how many objects of each
//! tracked class cross that line while a recorded video plays, and reports a fixed-interval
//! histogram of those crossings back to a remote requester.
//!
//! # Processing Model
//!
//! Everything runs on one thread, in a fixed order:
//!
//! 1. **Requests** are served one connection at a time.
//! 2. **Regions** within a request are evaluated in submission order.
//! 3. **Frames** within a video are processed in increasing index order.
//! 4. **Classes** within a frame are updated in the fixed `ObjectClass::ALL` order.
//!
//! The first fault for any region aborts the whole request; callers receive either every
//! histogram or a single error message, never a mix.
//!
//! # Module Structure
//!
//! - `roi`: line boundaries, colour tags and the request/response payloads
//! - `histogram`: interval bucketing of crossing frame indices
//! - `frame`, `ingest`: decoded frames and video sources
//! - `detect`: detector backends and the tracked class set
//! - `track`: identity tracking across frames
//! - `zone`: line-crossing geometry
//! - `counter`, `evaluator`, `orchestrator`: the counting engine
//! - `protocol`, `server`, `client`: socket framing and endpoints
//! - `config`: server configuration

pub mod client;
pub mod config;
pub mod counter;
pub mod detect;
pub mod evaluator;
pub mod frame;
pub mod histogram;
pub mod ingest;
pub mod orchestrator;
pub mod protocol;
pub mod roi;
pub mod server;
pub mod track;
pub mod zone;

pub use counter::ClassCrossingCounter;
pub use detect::{BackendRegistry, BoundingBox, Detection, DetectorBackend, ObjectClass};
pub use evaluator::RoiEvaluator;
pub use frame::Frame;
pub use histogram::{bucket_intervals, BUCKET_COUNT};
pub use ingest::{FileSource, FrameSource, VideoLibrary};
pub use orchestrator::RequestOrchestrator;
pub use protocol::Framing;
pub use roi::{ColorTag, ErrorResult, LineBoundary, Point, Response, RoiResult};
pub use server::{ListenerConfig, RoiServer, ServerHandle};
pub use track::{ByteTracker, TrackedDetection, Tracker, TrackerSettings};
pub use zone::LineZone;
