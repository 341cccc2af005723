//! Domain model (tasks, ids, time units, errors).

pub mod errors;
pub mod ids;
pub mod task;
pub mod time_unit;

pub use self::errors::{BoxError, ExecutorError, TaskError, panic_message};
pub use self::ids::DispatchId;
pub use self::task::{
    BackgroundTask, CombinedTask, TaskEnvelope, UiTask, background_task, combined_task, ui_task,
};
pub use self::time_unit::TimeUnit;
