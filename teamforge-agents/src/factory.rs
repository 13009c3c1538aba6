//! ABOUTME: Dispatches a declared step `type` to a concrete agent adapter instance
//! ABOUTME: One instance is created per flow step; adapters are never shared across steps

use std::sync::Arc;

use teamforge_core::agent::{Agent, AgentFactory, AgentSpec};
use teamforge_core::error::CoreError;

use crate::debug::DebugAgent;
use crate::process::ProcessAgent;

/// The default factory: `claude`/`gemini`/`qwen` shell out to the like-named
/// executable; `debug` is the deterministic in-process adapter.
#[derive(Default)]
pub struct DefaultAgentFactory;

impl AgentFactory for DefaultAgentFactory {
    fn create(&self, agent_type: &str, spec: AgentSpec) -> Result<Arc<dyn Agent>, CoreError> {
        let agent: Arc<dyn Agent> = match agent_type {
            "claude" | "gemini" | "qwen" => Arc::new(ProcessAgent::new(
                spec.instance_name,
                agent_type.to_string(),
                agent_type.to_string(),
                spec.args,
                spec.env,
            )),
            "debug" => Arc::new(DebugAgent::new(spec.instance_name, spec.env)),
            other => {
                return Err(CoreError::Setup {
                    step: spec.instance_name,
                    message: format!("unknown agent type `{other}`"),
                })
            }
        };
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn known_types_construct() {
        let factory = DefaultAgentFactory;
        for t in ["claude", "gemini", "qwen", "debug"] {
            let agent = factory
                .create(
                    t,
                    AgentSpec {
                        instance_name: format!("w/{t}"),
                        args: vec![],
                        env: HashMap::new(),
                    },
                )
                .unwrap();
            assert_eq!(agent.agent_type(), t);
        }
    }

    #[test]
    fn unknown_type_is_a_setup_error() {
        let factory = DefaultAgentFactory;
        let err = factory
            .create(
                "mystery",
                AgentSpec {
                    instance_name: "w/a".to_string(),
                    args: vec![],
                    env: HashMap::new(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Setup { .. }));
    }
}
