mod input;
mod renderer;
mod view;

pub use input::{handle_key, handle_paste};
pub use renderer::Renderer;
pub use view::{DownloadStatus, LogView};
