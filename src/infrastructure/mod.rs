pub mod directories;
pub mod heartbeat;
pub mod logging;
pub mod shutdown;
