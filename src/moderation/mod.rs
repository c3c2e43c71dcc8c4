/// Voice moderation engine: target resolution, access checks, bulk execution and logging
pub mod access;
pub mod audit;
pub mod executor;
pub mod gateway;
pub mod operation;
pub mod request;
pub mod snapshot;
pub mod suggest;

pub use gateway::HttpVoiceGateway;
pub use operation::{OperationKind, OperationReport, TargetScope};
pub use request::{Addressing, CommandInput, validate};
pub use snapshot::GuildSnapshot;
