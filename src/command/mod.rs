mod args;
mod runner;

pub use args::{CookieSource, DownloadRequest, FormatPreset, ToolPaths, build_args, discover_tools};
pub use runner::{DownloadRunner, SessionHandle};
