pub mod reading;
pub mod status;

pub use reading::{parse_timestamp, Reading, SessionId, Snapshot};
pub use status::{DeviceStatusReport, EstimateReport, SessionPhase, SessionStatusReport};
