//! macOS platform support.
//!
//! Active window sampling through `CGWindowListCopyWindowInfo` and clipboard
//! export through the general `NSPasteboard`.

use std::ffi::c_void;

use objc2::rc::Retained;
use objc2::ClassType;
use objc2_app_kit::{NSPasteboard, NSPasteboardTypeString, NSRunningApplication, NSWorkspace};
use objc2_foundation::{NSArray, NSDictionary, NSNumber, NSObject, NSString};

// =============================================================================
// Active Window
// =============================================================================

const WINDOW_LIST_ON_SCREEN_ONLY: u32 = 1 << 0;
const WINDOW_LIST_EXCLUDE_DESKTOP_ELEMENTS: u32 = 1 << 4;
const NULL_WINDOW_ID: u32 = 0;

// Windows above layer 0 are menus, the dock and other overlays
const NORMAL_WINDOW_LAYER: i32 = 0;

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGWindowListCopyWindowInfo(option: u32, relative_to_window: u32) -> *mut c_void;
}

type WindowInfo = NSDictionary<NSString, NSObject>;

/// Title of the frontmost window of the frontmost application.
///
/// `None` when there is no such window or it has no title. Titles are only
/// reported once the process has the Screen Recording permission.
pub fn active_window_title() -> Option<String> {
    // SAFETY: NSWorkspace is documented as thread safe; the returned objects
    // are retained for the duration of this call.
    let pid = unsafe {
        let workspace = NSWorkspace::sharedWorkspace();
        let app: Retained<NSRunningApplication> = workspace.frontmostApplication()?;
        app.processIdentifier()
    };

    // SAFETY: The copy follows the Create rule, so ownership of the +1 array
    // moves into `Retained`. CFArray is toll-free bridged with NSArray and
    // every element is a CFDictionary with CFString keys.
    let windows: Retained<NSArray<WindowInfo>> = unsafe {
        let raw = CGWindowListCopyWindowInfo(
            WINDOW_LIST_ON_SCREEN_ONLY | WINDOW_LIST_EXCLUDE_DESKTOP_ELEMENTS,
            NULL_WINDOW_ID,
        );
        Retained::from_raw(raw.cast::<NSArray<WindowInfo>>())?
    };

    // Front to back, so the first match is the active window
    windows
        .iter()
        .filter(|info| {
            let owner = number(info, "kCGWindowOwnerPID").map(NSNumber::as_i32);
            let layer = number(info, "kCGWindowLayer").map(NSNumber::as_i32);
            owner == Some(pid) && layer == Some(NORMAL_WINDOW_LAYER)
        })
        .find_map(|info| {
            let title = value::<NSString>(info, "kCGWindowName")?.to_string();
            (!title.is_empty()).then_some(title)
        })
}

fn number<'a>(info: &'a WindowInfo, key: &str) -> Option<&'a NSNumber> {
    value::<NSNumber>(info, key)
}

fn value<'a, T: ClassType>(info: &'a WindowInfo, key: &str) -> Option<&'a T> {
    let value = info.get(&NSString::from_str(key))?;
    // SAFETY: The class check guarantees `value` is a `T`.
    value
        .is_kind_of::<T>()
        .then(|| unsafe { &*(value as *const NSObject).cast::<T>() })
}

// =============================================================================
// Pasteboard
// =============================================================================

/// Replace the general pasteboard contents with `text`.
pub fn export_text(text: &str) -> std::io::Result<()> {
    let contents = NSString::from_str(text);

    // SAFETY: NSPasteboardTypeString is a static provided by AppKit, and the
    // general pasteboard may be used from any thread.
    let written = unsafe {
        let pasteboard = NSPasteboard::generalPasteboard();
        pasteboard.clearContents();
        pasteboard.setString_forType(&contents, NSPasteboardTypeString)
    };

    if written {
        Ok(())
    } else {
        Err(std::io::Error::other("pasteboard rejected the data"))
    }
}
