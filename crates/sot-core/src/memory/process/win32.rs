use std::ffi::c_void;
use std::mem;

use windows::Win32::Foundation::{CloseHandle, HANDLE, STILL_ACTIVE};
use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, MODULEENTRY32W, Module32FirstW, Module32NextW, PROCESSENTRY32W,
    Process32FirstW, Process32NextW, TH32CS_SNAPMODULE, TH32CS_SNAPMODULE32, TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Threading::{
    GetExitCodeProcess, OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_READ,
};

use super::{ModuleInfo, ProcessInfo};
use crate::error::{Error, Result};

pub struct RawHandle(HANDLE);

impl RawHandle {
    pub fn read_into(&self, address: u64, buf: &mut [u8]) -> usize {
        let mut read = 0usize;
        // SAFETY: the destination is a live, exclusively borrowed buffer of
        // `buf.len()` bytes; the source address is only dereferenced by the OS.
        let _ = unsafe {
            ReadProcessMemory(
                self.0,
                address as *const c_void,
                buf.as_mut_ptr().cast(),
                buf.len(),
                Some(&mut read),
            )
        };
        read
    }

    pub fn is_alive(&self, _pid: u32) -> bool {
        let mut code = 0u32;
        // SAFETY: the handle was opened with PROCESS_QUERY_INFORMATION.
        unsafe { GetExitCodeProcess(self.0, &mut code) }.is_ok()
            && code == STILL_ACTIVE.0 as u32
    }
}

impl Drop for RawHandle {
    fn drop(&mut self) {
        // SAFETY: the handle is owned by this value and closed exactly once.
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

/// Open with query + read rights only; the target is never written.
pub fn open(pid: u32) -> Result<RawHandle> {
    // SAFETY: OpenProcess has no memory-safety preconditions.
    let handle = unsafe { OpenProcess(PROCESS_QUERY_INFORMATION | PROCESS_VM_READ, false, pid) }
        .map_err(|e| Error::AccessDenied {
            pid,
            message: e.to_string(),
        })?;
    Ok(RawHandle(handle))
}

fn wide_to_string(wide: &[u16]) -> String {
    let end = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..end])
}

pub fn list_processes() -> Result<Vec<ProcessInfo>> {
    // SAFETY: the snapshot handle is closed before returning on every path.
    unsafe {
        let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)
            .map_err(|e| Error::ProcessNotFound(format!("process snapshot failed: {e}")))?;

        let mut entry = PROCESSENTRY32W {
            dwSize: mem::size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };

        let mut processes = Vec::new();
        let mut more = Process32FirstW(snapshot, &mut entry).is_ok();
        while more {
            processes.push(ProcessInfo {
                pid: entry.th32ProcessID,
                name: wide_to_string(&entry.szExeFile),
            });
            more = Process32NextW(snapshot, &mut entry).is_ok();
        }

        let _ = CloseHandle(snapshot);
        Ok(processes)
    }
}

pub fn list_modules(pid: u32) -> Result<Vec<ModuleInfo>> {
    // SAFETY: the snapshot handle is closed before returning on every path.
    unsafe {
        let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPMODULE | TH32CS_SNAPMODULE32, pid)
            .map_err(|e| Error::AccessDenied {
                pid,
                message: format!("module snapshot failed: {e}"),
            })?;

        let mut entry = MODULEENTRY32W {
            dwSize: mem::size_of::<MODULEENTRY32W>() as u32,
            ..Default::default()
        };

        let mut modules = Vec::new();
        let mut more = Module32FirstW(snapshot, &mut entry).is_ok();
        while more {
            modules.push(ModuleInfo {
                name: wide_to_string(&entry.szModule),
                base_address: entry.modBaseAddr as u64,
                size: entry.modBaseSize as usize,
            });
            more = Module32NextW(snapshot, &mut entry).is_ok();
        }

        let _ = CloseHandle(snapshot);
        Ok(modules)
    }
}
