//! CLI command handlers. Each command is in its own file.

mod add;
mod fetcher;
mod gen;
mod plugin;
mod save;

pub use add::run_add;
pub use fetcher::run_fetcher;
pub use gen::run_gen;
pub use plugin::run_plugin;
pub use save::run_save;

use std::path::Path;

/// Name this binary was invoked as (basename of argv[0]), used for plugin
/// lookup and generated scripts.
pub fn self_name() -> String {
    std::env::args_os()
        .next()
        .as_deref()
        .and_then(|argv0| Path::new(argv0).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dl".to_string())
}
