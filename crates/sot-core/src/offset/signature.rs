use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::scanner::Pattern;
use crate::error::Result;

pub const WORLD: &str = "world";
pub const GLOBAL_OBJECTS: &str = "global_objects";
pub const GLOBAL_NAMES: &str = "global_names";

/// A RIP-relative reference to a global, located by a byte pattern.
///
/// The displacement is read at `match + instr_offset + disp_offset` and is
/// relative to the end of the instruction (`match + instr_offset + instr_len`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSignature {
    pub pattern: String,
    #[serde(default)]
    pub instr_offset: usize,
    pub disp_offset: usize,
    pub instr_len: usize,
    /// Read a pointer at the resolved address
    #[serde(default)]
    pub deref: bool,
}

impl CodeSignature {
    pub fn rip_relative(pattern: &str, disp_offset: usize, instr_len: usize) -> Self {
        Self {
            pattern: pattern.to_string(),
            instr_offset: 0,
            disp_offset,
            instr_len,
            deref: true,
        }
    }

    pub fn compile(&self) -> Result<Pattern> {
        Pattern::parse(&self.pattern)
    }
}

/// All signatures known for one anchor, tried in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEntry {
    pub name: String,
    pub signatures: Vec<CodeSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureSet {
    pub version: String,
    pub entries: Vec<SignatureEntry>,
}

impl SignatureSet {
    pub fn entry(&self, name: &str) -> Option<&SignatureEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    /// Parse every pattern up front so a malformed set fails before scanning.
    pub fn validate(&self) -> Result<()> {
        for entry in &self.entries {
            for signature in &entry.signatures {
                signature.compile()?;
            }
        }
        Ok(())
    }
}

impl Default for SignatureSet {
    fn default() -> Self {
        builtin_signatures()
    }
}

/// Signatures for the three anchors of the supported client build.
pub fn builtin_signatures() -> SignatureSet {
    SignatureSet {
        version: "builtin".to_string(),
        entries: vec![
            SignatureEntry {
                name: WORLD.to_string(),
                signatures: vec![CodeSignature::rip_relative(
                    "48 8B 05 ? ? ? ? 48 8B 88 ? ? ? ? 48 85 C9 74 06 48 8B 49 70",
                    3,
                    7,
                )],
            },
            SignatureEntry {
                name: GLOBAL_OBJECTS.to_string(),
                signatures: vec![CodeSignature::rip_relative(
                    "89 0D ? ? ? ? 48 8B DF 48 89 5C 24",
                    2,
                    22,
                )],
            },
            SignatureEntry {
                name: GLOBAL_NAMES.to_string(),
                signatures: vec![CodeSignature::rip_relative(
                    "48 8B 1D ? ? ? ? 48 85 DB 75 ? B9 08 04 00 00",
                    3,
                    7,
                )],
            },
        ],
    }
}

pub fn load_signatures<P: AsRef<Path>>(path: P) -> Result<SignatureSet> {
    let content = fs::read_to_string(&path)?;
    let data: SignatureSet = serde_json::from_str(&content)?;
    data.validate()?;
    Ok(data)
}

pub fn save_signatures<P: AsRef<Path>>(path: P, signatures: &SignatureSet) -> Result<()> {
    let content = serde_json::to_string_pretty(signatures)?;
    fs::write(path, content)?;
    Ok(())
}
