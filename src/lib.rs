pub mod agents;
pub mod batch_file;
pub mod config;
pub mod error;
pub mod gateway;
pub mod normalizer;
pub mod page;
pub mod providers;
pub mod report;

pub use agents::{AgentRegistry, AgentResult, Batch, InvocationRequest, Orchestrator};
pub use batch_file::BatchFile;
pub use config::{Config, Credentials};
pub use error::{AgencyError, ErrorKind, Result};
pub use gateway::Gateway;
pub use report::{aggregate, Report};
