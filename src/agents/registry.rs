use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::agents::agent::{AgentDescriptor, Params};
use crate::agents::catalog;
use crate::error::{AgencyError, ErrorKind, Result};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("unknown agent '{0}'")]
    UnknownAgent(String),

    #[error("missing required params: {}", .0.join(", "))]
    MissingParams(Vec<String>),

    #[error("agent '{0}' is already registered")]
    Duplicate(String),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::UnknownAgent(_) => ErrorKind::UnknownAgent,
            RegistryError::MissingParams(_) => ErrorKind::MissingParam,
            // only raised at startup, never recorded against an invocation
            RegistryError::Duplicate(_) => ErrorKind::InvalidParam,
        }
    }
}

/// Closed set of agents known to a process, fixed after startup.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    descriptors: Vec<AgentDescriptor>,
    index: HashMap<&'static str, usize>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in marketing catalogue.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();
        for descriptor in catalog::descriptors() {
            registry
                .register(descriptor)
                .map_err(|e| AgencyError::RegistryError(e.to_string()))?;
        }
        debug!("Registered {} built-in agents", registry.len());
        Ok(registry)
    }

    pub fn register(&mut self, descriptor: AgentDescriptor) -> std::result::Result<(), RegistryError> {
        if self.index.contains_key(descriptor.name) {
            return Err(RegistryError::Duplicate(descriptor.name.to_string()));
        }
        self.index.insert(descriptor.name, self.descriptors.len());
        self.descriptors.push(descriptor);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> std::result::Result<&AgentDescriptor, RegistryError> {
        self.index
            .get(name)
            .map(|position| &self.descriptors[*position])
            .ok_or_else(|| RegistryError::UnknownAgent(name.to_string()))
    }

    pub fn validate(
        &self,
        descriptor: &AgentDescriptor,
        params: &Params,
    ) -> std::result::Result<(), RegistryError> {
        let missing = descriptor.missing_inputs(params);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::MissingParams(missing))
        }
    }

    /// Agent names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.descriptors.iter().map(|descriptor| descriptor.name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
