//! Pure foreground-poll classification.

/// Window classes belonging to the shell's own desktop and taskbar. A
/// foreground window of one of these classes means "the user is looking at
/// the desktop".
pub const SHELL_WINDOW_CLASSES: [&str; 3] = ["Progman", "WorkerW", "Shell_TrayWnd"];

/// A window rectangle in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    /// A rect spanning the given size at the origin.
    pub fn of_size(width: i32, height: i32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    /// Height in pixels.
    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// Snapshot of the current foreground window, as queried at a poll tick.
#[derive(Debug, Clone)]
pub struct ForegroundWindow {
    /// Native window handle.
    pub handle: isize,

    /// Window class name.
    pub class_name: String,

    /// Window bounds in screen coordinates.
    pub rect: Rect,

    /// Whether the window placement reports maximized.
    pub maximized: bool,
}

/// What a poll tick observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollVerdict {
    /// Nothing to act on (no foreground window, or it is our own surface).
    Ignore,

    /// The shell's desktop or taskbar is foreground.
    ShellForeground,

    /// Another window is maximized or covers the exact display bounds.
    Occluded,

    /// A normal window is foreground but does not cover the display.
    Clear,
}

/// Classifies a foreground snapshot against the desktop bounds.
pub fn classify(
    foreground: Option<&ForegroundWindow>,
    own_handle: isize,
    desktop: Rect,
) -> PollVerdict {
    let Some(fg) = foreground else {
        return PollVerdict::Ignore;
    };
    if fg.handle == own_handle {
        return PollVerdict::Ignore;
    }
    if SHELL_WINDOW_CLASSES.contains(&fg.class_name.as_str()) {
        return PollVerdict::ShellForeground;
    }

    let fullscreen = fg.rect == desktop;
    if fg.maximized || fullscreen {
        PollVerdict::Occluded
    } else {
        PollVerdict::Clear
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESKTOP: Rect = Rect {
        left: 0,
        top: 0,
        right: 1920,
        bottom: 1080,
    };

    fn window(class: &str, rect: Rect, maximized: bool) -> ForegroundWindow {
        ForegroundWindow {
            handle: 0x1234,
            class_name: class.to_string(),
            rect,
            maximized,
        }
    }

    #[test]
    fn own_window_and_no_window_are_ignored() {
        assert_eq!(classify(None, 1, DESKTOP), PollVerdict::Ignore);

        let own = ForegroundWindow {
            handle: 1,
            class_name: "Chrome_WidgetWin_1".into(),
            rect: DESKTOP,
            maximized: true,
        };
        assert_eq!(classify(Some(&own), 1, DESKTOP), PollVerdict::Ignore);
    }

    #[test]
    fn shell_classes_win_even_when_fullscreen() {
        for class in SHELL_WINDOW_CLASSES {
            let fg = window(class, DESKTOP, true);
            assert_eq!(classify(Some(&fg), 1, DESKTOP), PollVerdict::ShellForeground);
        }
    }

    #[test]
    fn exact_display_bounds_is_occluded() {
        let fg = window("Chrome_WidgetWin_1", DESKTOP, false);
        assert_eq!(classify(Some(&fg), 1, DESKTOP), PollVerdict::Occluded);
    }

    #[test]
    fn maximized_is_occluded_regardless_of_rect() {
        let fg = window("Notepad", Rect::of_size(800, 600), true);
        assert_eq!(classify(Some(&fg), 1, DESKTOP), PollVerdict::Occluded);
    }

    #[test]
    fn ordinary_window_is_clear() {
        let fg = window("Notepad", Rect::of_size(800, 600), false);
        assert_eq!(classify(Some(&fg), 1, DESKTOP), PollVerdict::Clear);
    }
}
