//! Attaching to the target process.
//!
//! The session opens a handle with query + read rights only, locates the main
//! module through a module snapshot and exposes the OS read primitive through
//! [`ReadMemory`].

#[cfg(not(target_os = "windows"))]
mod procfs;
#[cfg(target_os = "windows")]
mod win32;

#[cfg(not(target_os = "windows"))]
use procfs as platform;
#[cfg(target_os = "windows")]
use win32 as platform;

use tracing::debug;

use crate::error::{Error, Result};
use crate::memory::ReadMemory;

/// A running process as reported by the OS process snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
}

/// A loaded module as reported by the OS module snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: String,
    pub base_address: u64,
    pub size: usize,
}

/// Open session on the target process.
///
/// The underlying handle is released when the session is dropped.
pub struct ProcessHandle {
    pub pid: u32,
    pub exe_name: String,
    pub base_address: u64,
    pub module_size: usize,
    raw: platform::RawHandle,
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("exe_name", &self.exe_name)
            .field("base_address", &format_args!("{:#x}", self.base_address))
            .field("module_size", &self.module_size)
            .finish()
    }
}

impl ProcessHandle {
    /// Find the first process whose image name equals `exe_name` and open it.
    pub fn find_and_open(exe_name: &str) -> Result<Self> {
        let processes = platform::list_processes()?;
        let pid = select_process(&processes, exe_name)
            .ok_or_else(|| Error::ProcessNotFound(exe_name.to_string()))?;
        Self::open(pid, exe_name)
    }

    /// Open a known process id; `exe_name` selects the module whose base is used.
    pub fn open(pid: u32, exe_name: &str) -> Result<Self> {
        let raw = platform::open(pid)?;
        let modules = platform::list_modules(pid)?;
        let module = select_module(&modules, exe_name)?;

        debug!(
            "Attached to pid {} ({}), base {:#x}, size {:#x}",
            pid, exe_name, module.base_address, module.size
        );

        Ok(Self {
            pid,
            exe_name: exe_name.to_string(),
            base_address: module.base_address,
            module_size: module.size,
            raw,
        })
    }

    /// Whether the target process still exists
    pub fn is_alive(&self) -> bool {
        self.raw.is_alive(self.pid)
    }
}

impl ReadMemory for ProcessHandle {
    fn read_into(&self, address: u64, buf: &mut [u8]) -> usize {
        if address == 0 || buf.is_empty() {
            return 0;
        }
        self.raw.read_into(address, buf)
    }

    fn base_address(&self) -> u64 {
        self.base_address
    }

    fn module_size(&self) -> usize {
        self.module_size
    }
}

/// First process whose name matches exactly. Duplicates are not disambiguated.
pub fn select_process(processes: &[ProcessInfo], exe_name: &str) -> Option<u32> {
    processes
        .iter()
        .find(|p| p.name == exe_name)
        .map(|p| p.pid)
}

/// Module whose name equals the executable name.
pub fn select_module(modules: &[ModuleInfo], exe_name: &str) -> Result<ModuleInfo> {
    modules
        .iter()
        .find(|m| m.name == exe_name && m.base_address != 0)
        .cloned()
        .ok_or_else(|| Error::ModuleNotFound(exe_name.to_string()))
}

/// Enumerate running processes
pub fn list_processes() -> Result<Vec<ProcessInfo>> {
    platform::list_processes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processes() -> Vec<ProcessInfo> {
        vec![
            ProcessInfo {
                pid: 10,
                name: "explorer.exe".into(),
            },
            ProcessInfo {
                pid: 20,
                name: "SoTGame.exe".into(),
            },
            ProcessInfo {
                pid: 30,
                name: "SoTGame.exe".into(),
            },
        ]
    }

    #[test]
    fn test_select_process_first_match_wins() {
        assert_eq!(select_process(&processes(), "SoTGame.exe"), Some(20));
    }

    #[test]
    fn test_select_process_is_case_sensitive() {
        assert_eq!(select_process(&processes(), "sotgame.exe"), None);
        assert_eq!(select_process(&processes(), "SoTGame"), None);
    }

    #[test]
    fn test_select_module() {
        let modules = vec![
            ModuleInfo {
                name: "ntdll.dll".into(),
                base_address: 0x7FFA_0000_0000,
                size: 0x1000,
            },
            ModuleInfo {
                name: "SoTGame.exe".into(),
                base_address: 0x7FF6_0000_0000,
                size: 0x600_0000,
            },
        ];
        let module = select_module(&modules, "SoTGame.exe").unwrap();
        assert_eq!(module.base_address, 0x7FF6_0000_0000);

        let err = select_module(&modules, "Other.exe").unwrap_err();
        assert!(matches!(err, Error::ModuleNotFound(name) if name == "Other.exe"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_open_own_process() {
        static MARKER: [u8; 8] = *b"sotcore!";

        let exe = std::env::current_exe().unwrap();
        let exe_name = exe.file_name().unwrap().to_string_lossy().into_owned();
        let process = ProcessHandle::open(std::process::id(), &exe_name).unwrap();

        assert_ne!(process.base_address, 0);
        assert!(process.is_alive());

        let mut buf = [0u8; 8];
        let read = process.read_into(MARKER.as_ptr() as u64, &mut buf);
        assert_eq!(read, 8);
        assert_eq!(&buf, b"sotcore!");
    }

    #[test]
    fn test_find_missing_process() {
        let err = ProcessHandle::find_and_open("definitely-not-running-4f1c.exe").unwrap_err();
        assert!(matches!(err, Error::ProcessNotFound(_)));
    }
}
