//! Vidu video-generation nodes: text, image, reference and start/end-frame
//! to video, featured presets and prompt recommendation, plus an MCP server
//! that exposes them as tools.

pub mod codec;
pub mod config;
pub mod error;
pub mod mcp;
pub mod tasks;
pub mod vidu;

pub use error::{ViduError, ViduResult};
pub use tasks::{Artifact, Node, NodeOutputs, OutputOptions, RunContext};
pub use vidu::ViduClient;
