mod actors;
pub mod archive;
pub mod cancel;
pub mod config;
pub mod error;
pub mod events;
pub mod outcome;
pub mod params;
pub mod sink;
pub mod surface;
pub mod terminate;
pub mod types;

pub use actors::job::Terminated;
// re-export the supervisor handle as if it is the supervisor itself.
pub use actors::supervisor::SupervisorHandle as Supervisor;
pub use config::SupervisorConfig;
pub use events::JobStatus;
pub use surface::RequestSurface;
