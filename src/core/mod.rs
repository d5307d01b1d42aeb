pub mod cancellation;
pub mod clock;
pub mod context;
pub mod error;

pub use cancellation::Cancellation;
pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{CallContext, TASK_TIMEOUT_MILLIS, TASK_TIMEOUT_MILLIS_CONFIG};
pub use error::{PolarisError, Result};
