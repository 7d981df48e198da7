pub mod agent;
pub mod catalog;
pub mod orchestrator;
pub mod registry;


#[cfg(test)]
mod orchestrator_test;

pub use agent::{
    AgentDescriptor, AgentFailure, AgentResult, PageInputs, Params, ParseFailure, ResultData, ResultStatus,
};
pub use catalog::SearchHit;
pub use orchestrator::{Batch, Invocation, InvocationRequest, InvocationState, Orchestrator};
pub use registry::{AgentRegistry, RegistryError};
