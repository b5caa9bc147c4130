//! Platform-specific implementations.
//!
//! macOS samples the title of the active window and exports to the
//! pasteboard. Elsewhere there is no window observer and exports go to
//! stdout.

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "macos")]
pub use macos::{active_window_title, export_text};

/// Whether [`active_window_title`] can report anything here.
pub const HAS_WINDOW_OBSERVER: bool = cfg!(target_os = "macos");

#[cfg(not(target_os = "macos"))]
pub fn active_window_title() -> Option<String> {
    None
}

/// Write exported text to stdout.
#[cfg(not(target_os = "macos"))]
pub fn export_text(text: &str) -> std::io::Result<()> {
    use std::io::Write;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", text)?;
    stdout.flush()
}
