//! Background processing and consumer-side session state

pub mod coordinator;
pub mod progress;
pub mod session;

pub use coordinator::{
    AnalysisBackend, AsyncTaskCoordinator, AudioBackend, TaskConsumer, TaskEvent, TaskHandle, TaskId,
    TaskKind, TaskOutput, TaskState,
};
pub use progress::{LogProgressReporter, ProgressReporter, ProgressState};
pub use session::{AnalysisSession, SessionView};
