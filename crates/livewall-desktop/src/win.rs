//! Win32 side of desktop embedding.

use tracing::{debug, info, warn};
use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::{BOOL, HWND, LPARAM, POINT, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{MonitorFromPoint, MONITOR_DEFAULTTOPRIMARY};
use windows::Win32::UI::HiDpi::{
    GetDpiForMonitor, SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
    MDT_EFFECTIVE_DPI,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, FindWindowExW, FindWindowW, GetClassNameW, GetForegroundWindow, GetSystemMetrics,
    GetWindowLongW, GetWindowPlacement, GetWindowRect, SendMessageTimeoutW, SetParent,
    SetWindowLongW, SetWindowPos, GWL_EXSTYLE, HWND_BOTTOM, SMTO_NORMAL, SM_CXSCREEN, SM_CYSCREEN,
    SWP_NOACTIVATE, SW_SHOWMAXIMIZED, WINDOWPLACEMENT, WS_EX_APPWINDOW, WS_EX_TOOLWINDOW,
};

use crate::poll::{ForegroundWindow, Rect};
use crate::EmbedResult;

/// Undocumented Progman message that spawns the WorkerW background host.
const WM_SPAWN_WORKERW: u32 = 0x052C;

/// How the surface ended up layered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachMode {
    /// Reparented beneath the shell's icon layer.
    WorkerW,

    /// Degraded: pinned to the bottom of the Z order.
    BottomOfStack,
}

/// Sets per-monitor-v2 DPI awareness for the process.
///
/// Must run before any window is created so geometry queries report physical
/// pixels.
pub fn set_dpi_awareness() {
    let result = unsafe { SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) };
    if let Err(e) = result {
        warn!(error = %e, "failed to set per-monitor DPI awareness");
    }
}

/// Effective scale factor of the primary monitor, clamped to >= 1.0.
pub fn display_scale() -> f64 {
    let monitor = unsafe { MonitorFromPoint(POINT { x: 0, y: 0 }, MONITOR_DEFAULTTOPRIMARY) };
    let mut dpi_x = 0u32;
    let mut dpi_y = 0u32;
    match unsafe { GetDpiForMonitor(monitor, MDT_EFFECTIVE_DPI, &mut dpi_x, &mut dpi_y) } {
        Ok(()) => (dpi_x as f64 / 96.0).max(1.0),
        Err(e) => {
            warn!(error = %e, "DPI query failed, assuming scale 1.0");
            1.0
        }
    }
}

/// Physical bounds of the primary display.
pub fn desktop_rect() -> Rect {
    let width = unsafe { GetSystemMetrics(SM_CXSCREEN) };
    let height = unsafe { GetSystemMetrics(SM_CYSCREEN) };
    Rect::of_size(width, height)
}

/// Reparents the render surface beneath the shell's icon layer.
///
/// Handshake: ask `Progman` to spawn its WorkerW background host, then find
/// the WorkerW that sits behind `SHELLDLL_DefView`. When the shell never
/// produces one, degrade to bottom-of-Z placement (the height-1 shave keeps
/// the shell from treating the surface as a fullscreen app).
pub fn attach(surface: isize, desktop: Rect) -> EmbedResult<AttachMode> {
    scrub_taskbar_style(surface);

    let surface_hwnd = HWND(surface as *mut _);

    match find_workerw()? {
        Some(workerw) => {
            unsafe { SetParent(surface_hwnd, workerw)? };
            info!(workerw = workerw.0 as isize, "attached to desktop WorkerW");
            Ok(AttachMode::WorkerW)
        }
        None => {
            warn!("WorkerW not found, falling back to bottom-of-stack placement");
            unsafe {
                SetWindowPos(
                    surface_hwnd,
                    HWND_BOTTOM,
                    0,
                    0,
                    desktop.width(),
                    desktop.height() - 1,
                    SWP_NOACTIVATE,
                )?;
            }
            Ok(AttachMode::BottomOfStack)
        }
    }
}

/// Hides the surface from the taskbar and Alt-Tab.
fn scrub_taskbar_style(surface: isize) {
    let hwnd = HWND(surface as *mut _);
    unsafe {
        let mut ex_style = GetWindowLongW(hwnd, GWL_EXSTYLE);
        ex_style |= WS_EX_TOOLWINDOW.0 as i32;
        ex_style &= !(WS_EX_APPWINDOW.0 as i32);
        SetWindowLongW(hwnd, GWL_EXSTYLE, ex_style);
    }
}

/// Locates the WorkerW window that hosts the desktop background.
fn find_workerw() -> EmbedResult<Option<HWND>> {
    let progman = unsafe { FindWindowW(w!("Progman"), PCWSTR::null())? };

    // Ask the shell to (re)create the background host. The result value is
    // irrelevant; only the side effect matters.
    unsafe {
        SendMessageTimeoutW(
            progman,
            WM_SPAWN_WORKERW,
            WPARAM(0),
            LPARAM(0),
            SMTO_NORMAL,
            1000,
            None,
        );
    }

    let mut found: Option<HWND> = None;
    unsafe {
        // Errors from a callback-stopped enumeration are expected; the
        // out-param tells us whether the search succeeded.
        let _ = EnumWindows(
            Some(find_workerw_callback),
            LPARAM(&mut found as *mut Option<HWND> as isize),
        );
    }

    debug!(found = found.is_some(), "WorkerW search finished");
    Ok(found)
}

unsafe extern "system" fn find_workerw_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let found = &mut *(lparam.0 as *mut Option<HWND>);

    // The WorkerW we want is the sibling following the window that owns the
    // icon view (SHELLDLL_DefView).
    if FindWindowExW(hwnd, HWND::default(), w!("SHELLDLL_DefView"), PCWSTR::null()).is_ok() {
        if let Ok(workerw) = FindWindowExW(HWND::default(), hwnd, w!("WorkerW"), PCWSTR::null()) {
            *found = Some(workerw);
        }
        return BOOL::from(false);
    }

    BOOL::from(true)
}

/// Snapshot of the current foreground window for the poll state machine.
pub fn foreground_snapshot() -> Option<ForegroundWindow> {
    let hwnd = unsafe { GetForegroundWindow() };
    if hwnd.is_invalid() {
        return None;
    }

    let mut class_buffer = [0u16; 256];
    let len = unsafe { GetClassNameW(hwnd, &mut class_buffer) };
    let class_name = String::from_utf16_lossy(&class_buffer[..len.max(0) as usize]);

    let mut rect = RECT::default();
    if unsafe { GetWindowRect(hwnd, &mut rect) }.is_err() {
        return None;
    }

    let mut placement = WINDOWPLACEMENT {
        length: std::mem::size_of::<WINDOWPLACEMENT>() as u32,
        ..Default::default()
    };
    let maximized = unsafe { GetWindowPlacement(hwnd, &mut placement) }
        .map(|_| placement.showCmd == SW_SHOWMAXIMIZED.0 as u32)
        .unwrap_or(false);

    Some(ForegroundWindow {
        handle: hwnd.0 as isize,
        class_name,
        rect: Rect {
            left: rect.left,
            top: rect.top,
            right: rect.right,
            bottom: rect.bottom,
        },
        maximized,
    })
}
