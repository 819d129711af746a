//! Child process control and cooperative stop signaling.
//!
//! Two primitives used by the session supervisor:
//! - `ChildProcessHandle`: one spawned OS process with poll-alive,
//!   wait-with-timeout, graceful terminate and forced kill
//! - `StopSignalChannel`: a sentinel-file channel for asking the engine
//!   process to shut itself down

pub mod child;
pub mod error;
pub mod sentinel;

pub use child::{ChildProcessHandle, ShutdownTier};
pub use error::{ProcError, ProcResult};
pub use sentinel::StopSignalChannel;
