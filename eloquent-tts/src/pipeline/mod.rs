//! Synthesis job pipeline

pub mod busy;
pub mod dispatcher;
pub mod orchestrator;
pub mod request;

pub use busy::{BusyFlag, BusyGuard};
pub use dispatcher::{ChunkDispatcher, DispatchStats};
pub use orchestrator::{Orchestrator, OrchestratorSettings, SynthesisOutput};
pub use request::{JobEnvelope, JobInput, JobOutput, JobStatus, SynthesisRequest, Task};
