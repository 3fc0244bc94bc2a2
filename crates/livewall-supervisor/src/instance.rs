//! Single-instance enforcement.

use tracing::info;

use crate::{SupervisorError, SupervisorResult};

/// Holds the OS-global instance mutex for the lifetime of the process.
///
/// Acquire this before binding ports or creating windows; a second engine
/// must exit without touching any other component.
#[derive(Debug)]
pub struct SingleInstance {
    #[cfg(windows)]
    handle: windows::Win32::Foundation::HANDLE,

    #[cfg(not(windows))]
    _lock_file: std::fs::File,
}

// The mutex handle is only ever closed from Drop.
unsafe impl Send for SingleInstance {}

#[cfg(windows)]
impl SingleInstance {
    /// Creates the named mutex, failing if another process already owns it.
    pub fn acquire(name: &str) -> SupervisorResult<Self> {
        use windows::core::HSTRING;
        use windows::Win32::Foundation::{GetLastError, ERROR_ALREADY_EXISTS};
        use windows::Win32::System::Threading::CreateMutexW;

        let handle = unsafe { CreateMutexW(None, false, &HSTRING::from(name)) }
            .map_err(|e| SupervisorError::MutexFailed(e.message().to_string()))?;

        if unsafe { GetLastError() } == ERROR_ALREADY_EXISTS {
            unsafe {
                let _ = windows::Win32::Foundation::CloseHandle(handle);
            }
            return Err(SupervisorError::AlreadyRunning);
        }

        info!(name, "instance mutex acquired");
        Ok(Self { handle })
    }

    /// Shows the "already running" notice for a refused second instance.
    pub fn show_already_running_notice() {
        use windows::core::w;
        use windows::Win32::UI::WindowsAndMessaging::{MessageBoxW, MB_ICONHAND};

        unsafe {
            MessageBoxW(
                windows::Win32::Foundation::HWND::default(),
                w!("Another instance of the wallpaper engine is already running."),
                w!("livewall engine"),
                MB_ICONHAND,
            );
        }
    }
}

#[cfg(windows)]
impl Drop for SingleInstance {
    fn drop(&mut self) {
        unsafe {
            let _ = windows::Win32::Foundation::CloseHandle(self.handle);
        }
    }
}

#[cfg(not(windows))]
impl SingleInstance {
    /// Non-Windows builds approximate the named mutex with an advisory lock
    /// on a well-known file.
    pub fn acquire(name: &str) -> SupervisorResult<Self> {
        let file_name = name.replace(['\\', '/'], "_");
        let path = std::env::temp_dir().join(format!("{file_name}.lock"));
        let lock_file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        match lock_file.try_lock() {
            Ok(()) => {
                info!(path = %path.display(), "instance lock acquired");
                Ok(Self { _lock_file: lock_file })
            }
            Err(_) => Err(SupervisorError::AlreadyRunning),
        }
    }

    /// No message box outside Windows; the log line is the notice.
    pub fn show_already_running_notice() {
        tracing::error!("another engine instance is already running");
    }
}
