//! `/proc` backend, used when the target runs under a compatibility layer on
//! a Unix host.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::os::unix::fs::FileExt;
use std::path::Path;

use super::{ModuleInfo, ProcessInfo};
use crate::error::{Error, Result};

pub struct RawHandle(File);

impl RawHandle {
    pub fn read_into(&self, address: u64, buf: &mut [u8]) -> usize {
        let mut filled = 0;
        while filled < buf.len() {
            match self.0.read_at(&mut buf[filled..], address.wrapping_add(filled as u64)) {
                Ok(0) | Err(_) => break,
                Ok(n) => filled += n,
            }
        }
        filled
    }

    pub fn is_alive(&self, pid: u32) -> bool {
        Path::new(&format!("/proc/{pid}")).exists()
    }
}

pub fn open(pid: u32) -> Result<RawHandle> {
    match File::open(format!("/proc/{pid}/mem")) {
        Ok(file) => Ok(RawHandle(file)),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::ProcessNotFound(pid.to_string())),
        Err(e) => Err(Error::AccessDenied {
            pid,
            message: e.to_string(),
        }),
    }
}

/// Image name of a process: basename of argv[0] (either path separator),
/// falling back to `comm`.
fn process_name(pid: &str) -> Option<String> {
    if let Ok(cmdline) = fs::read(format!("/proc/{pid}/cmdline")) {
        let argv0 = cmdline.split(|&b| b == 0).next().unwrap_or_default();
        let argv0 = String::from_utf8_lossy(argv0);
        if let Some(name) = argv0.rsplit(['/', '\\']).next()
            && !name.is_empty()
        {
            return Some(name.to_string());
        }
    }

    fs::read_to_string(format!("/proc/{pid}/comm"))
        .ok()
        .map(|s| s.trim_end().to_string())
}

pub fn list_processes() -> Result<Vec<ProcessInfo>> {
    let mut processes = Vec::new();
    for entry in fs::read_dir("/proc")? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(pid_str) = file_name.to_str() else {
            continue;
        };
        let Ok(pid) = pid_str.parse::<u32>() else {
            continue;
        };
        if let Some(name) = process_name(pid_str) {
            processes.push(ProcessInfo { pid, name });
        }
    }
    processes.sort_by_key(|p| p.pid);
    Ok(processes)
}

pub fn list_modules(pid: u32) -> Result<Vec<ModuleInfo>> {
    let maps = fs::read_to_string(format!("/proc/{pid}/maps")).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::ProcessNotFound(pid.to_string()),
        _ => Error::AccessDenied {
            pid,
            message: e.to_string(),
        },
    })?;
    Ok(parse_maps(&maps))
}

/// Collapse file-backed mappings into one module per path, spanning from the
/// lowest start to the highest end.
pub fn parse_maps(maps: &str) -> Vec<ModuleInfo> {
    let mut spans: BTreeMap<String, (u64, u64)> = BTreeMap::new();

    for line in maps.lines() {
        // "start-end perms offset dev inode pathname"
        let mut parts = line.splitn(6, char::is_whitespace);
        let Some(range) = parts.next() else {
            continue;
        };
        let path = parts.nth(4).map(str::trim).unwrap_or_default();
        if path.is_empty() || path.starts_with('[') {
            continue;
        }

        let Some((start, end)) = range.split_once('-') else {
            continue;
        };
        let (Ok(start), Ok(end)) = (
            u64::from_str_radix(start, 16),
            u64::from_str_radix(end, 16),
        ) else {
            continue;
        };

        let span = spans.entry(path.to_string()).or_insert((start, end));
        span.0 = span.0.min(start);
        span.1 = span.1.max(end);
    }

    let mut modules: Vec<ModuleInfo> = spans
        .into_iter()
        .map(|(path, (start, end))| ModuleInfo {
            name: path.rsplit(['/', '\\']).next().unwrap_or(&path).to_string(),
            base_address: start,
            size: (end - start) as usize,
        })
        .collect();
    modules.sort_by_key(|m| m.base_address);
    modules
}
