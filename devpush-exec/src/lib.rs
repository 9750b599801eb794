//! devpush command execution: walks a devfile's command graph and runs it in
//! the containers of a pushed component.
//!
//! - [`engine`]: leaf execs, composites (sequential and parallel), supervisor restarts
//! - [`push`]: init/build/run selection and the top-level push sequence
//! - [`events`]: begin/complete events and the sinks that consume them
//! - [`output`]: stdout/stderr capture with drain acknowledgment
//! - [`transport`]: the exec capability a backend client implements
//! - [`supervisor`]: supervisor paths, programs and control argv

pub mod engine;
mod error;
pub mod events;
pub mod output;
pub mod push;
pub mod supervisor;
pub mod transport;

pub use engine::{ExecutionEngine, Invocation};
pub use error::{BranchFailure, ExecError, Purpose, TransportError};
pub use events::{
    sink_for, sink_with_output, EventSink, ExecutionEvent, JsonEventSink, NoopEventSink,
    TracingEventSink,
};
pub use output::{OutputSink, OutputWriter, Stream};
pub use push::{execute_push_commands, select_push_commands, PushCommandNames, PushCommands};
pub use supervisor::{RestartPolicy, SupervisorProgram};
pub use transport::{ComponentInfo, ExecClient, ExecTarget};
