//! Telemetry client for Haas CNC machine controllers.
//!
//! Talks the serial "Q-code" protocol: short ASCII queries, a fixed settle
//! delay instead of an acknowledgement, and terse comma/space separated
//! replies. The crate interprets those replies into typed fields and
//! assembles them into one consistent [`MachineSnapshot`] per poll cycle.

pub mod collector;
pub mod config;
pub mod dispatcher;
pub mod interpret;
pub mod snapshot;
pub mod transport;
pub mod worker;

pub use collector::MachineDataCollector;
pub use config::{ConfigError, SerialEndpointConfig, TelemetryConfig};
pub use dispatcher::{DispatchError, QueryDispatcher, RawResponse, SerialDispatcher};
pub use snapshot::{AxisPositions, MachineSnapshot, MachineStatus};
pub use transport::{SerialTransport, TransportError};
pub use worker::{TelemetryHandle, TelemetryRequest, WorkerError};
