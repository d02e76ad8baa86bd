mod channel;
mod cursor;
mod layout;
mod name;
mod sem;
mod shutdown;

pub use channel::{CloseError, RingChannel, RingError, SolutionChannel};
pub use layout::DEFAULT_CAPACITY;
pub use name::{ChannelName, DEFAULT_PREFIX, NameError};
pub use sem::SemError;
pub use shutdown::ShutdownToken;
