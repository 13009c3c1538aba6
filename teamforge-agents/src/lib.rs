//! ABOUTME: Concrete step agent adapters and the factory that binds a step's declared type
//! ABOUTME: to one of them

mod debug;
mod factory;
mod process;

pub use debug::DebugAgent;
pub use factory::DefaultAgentFactory;
pub use process::ProcessAgent;
