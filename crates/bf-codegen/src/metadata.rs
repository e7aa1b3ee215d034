//! Constants embedded in every artifact, and reading them back.

use bf_types::{MachineConfig, SourceBuffer};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use wasmparser::{Parser, Payload};

use crate::error::{CodegenError, CodegenResult};
use crate::types::{COMPILER_VERSION, META_SECTION_NAME, SOURCE_SECTION_NAME};

/// Provenance of a generated module, stored as JSON in the `bf.meta` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub module_name: String,
    pub compiler_version: String,
    /// The configuration the module was generated for.
    pub config: MachineConfig,
    pub source_len: usize,
    /// Lowercase hex SHA-256 of the source bytes.
    pub source_sha256: String,
}

impl ArtifactMetadata {
    pub fn new(module_name: &str, source: &SourceBuffer, config: &MachineConfig) -> Self {
        Self {
            module_name: module_name.to_string(),
            compiler_version: COMPILER_VERSION.to_string(),
            config: *config,
            source_len: source.len(),
            source_sha256: sha256_hex(source.bytes()),
        }
    }

    /// Whether `source` is the text this module was compiled from.
    pub fn matches_source(&self, source: &[u8]) -> bool {
        self.source_len == source.len() && self.source_sha256 == sha256_hex(source)
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Read the [`ArtifactMetadata`] embedded in a module.
///
/// Returns `Ok(None)` for a well-formed module without a `bf.meta` section.
pub fn read_metadata(wasm: &[u8]) -> CodegenResult<Option<ArtifactMetadata>> {
    match find_custom_section(wasm, META_SECTION_NAME)? {
        Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
        None => Ok(None),
    }
}

/// Read the source text embedded in a module.
pub fn read_source(wasm: &[u8]) -> CodegenResult<Option<Vec<u8>>> {
    find_custom_section(wasm, SOURCE_SECTION_NAME)
}

fn find_custom_section(wasm: &[u8], name: &str) -> CodegenResult<Option<Vec<u8>>> {
    for payload in Parser::new(0).parse_all(wasm) {
        let payload = payload.map_err(|e| CodegenError::MalformedModule(e.to_string()))?;
        if let Payload::CustomSection(reader) = payload {
            if reader.name() == name {
                return Ok(Some(reader.data().to_vec()));
            }
        }
    }
    Ok(None)
}
