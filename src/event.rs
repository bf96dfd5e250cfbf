use crate::buffer::StreamKind;
use crate::demux::OutputEvent;

/// Event from a download session's background reader tasks
#[derive(Debug)]
pub enum SessionEvent {
    /// Demultiplexed output from one of the child's pipes
    Output {
        kind: StreamKind,
        event: OutputEvent,
    },
    /// A pipe read failed mid-stream; treated as end-of-stream
    ReadError { kind: StreamKind, message: String },
}
