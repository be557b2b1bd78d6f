mod console;
mod process;
mod process_helper;

pub use console::ConsoleSink;
pub use process::{ProcessHandle, ProcessStartInfo, ProcessSupervisor, STOP_COMMAND};
pub use process_helper::ProcessHelper;
