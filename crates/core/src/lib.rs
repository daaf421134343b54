pub mod agent;
pub mod clock;
pub mod config;
pub mod error;
pub mod forwarder;
pub mod line_protocol;
pub mod logging;
pub mod metrics;
pub mod model;

pub use agent::{Agent, Sleeper, ThreadSleeper, TickReport};
pub use clock::TimestampClock;
pub use config::Config;
pub use error::{CoreError, Result, Stage, TickError};
pub use forwarder::{Forwarder, HttpForwarder};
pub use line_protocol::LineProtocol;
pub use metrics::{Sampler, SystemSampler};
pub use model::*;
