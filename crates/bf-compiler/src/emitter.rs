//! Writes compiled modules to disk.

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bf_types::{MachineConfig, SourceBuffer};
use tempfile::NamedTempFile;
use tracing::{info, instrument};

use crate::error::{CompileError, CompileResult};

const ARTIFACT_EXTENSION: &str = ".wasm";

/// Normalise an artifact name: keep it when it already ends with `.wasm`
/// (in any case), otherwise append `.wasm`.
pub fn artifact_path(name: impl AsRef<Path>) -> PathBuf {
    let name = name.as_ref();
    let lossy = name.to_string_lossy();
    let has_extension = lossy.len() >= ARTIFACT_EXTENSION.len()
        && lossy.is_char_boundary(lossy.len() - ARTIFACT_EXTENSION.len())
        && lossy[lossy.len() - ARTIFACT_EXTENSION.len()..].eq_ignore_ascii_case(ARTIFACT_EXTENSION);
    if has_extension {
        return name.to_path_buf();
    }
    let mut path = OsString::from(name.as_os_str());
    path.push(ARTIFACT_EXTENSION);
    PathBuf::from(path)
}

/// Compile `source` and write the module to the normalised `name`.
///
/// The module is named after the artifact's file stem. The bytes go to a
/// temporary file next to the destination, which is then renamed into
/// place; on failure the temporary file is removed and the destination is
/// left untouched.
#[instrument(skip_all, fields(source = %source.name()))]
pub fn emit_executable(
    name: impl AsRef<Path>,
    source: &SourceBuffer,
    config: &MachineConfig,
) -> CompileResult<PathBuf> {
    let path = artifact_path(name);
    let module_name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "program".to_string());

    let wasm = bf_codegen::compile_named(source, config, &module_name)?;
    write_atomically(&path, &wasm).map_err(|source| CompileError::ArtifactWrite {
        path: path.clone(),
        source,
    })?;

    info!(path = %path.display(), bytes = wasm.len(), "artifact written");
    Ok(path)
}

fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_appended() {
        assert_eq!(artifact_path("hello"), PathBuf::from("hello.wasm"));
        assert_eq!(artifact_path("hello.b"), PathBuf::from("hello.b.wasm"));
        assert_eq!(artifact_path("out/hello"), PathBuf::from("out/hello.wasm"));
    }

    #[test]
    fn test_suffix_kept_in_any_case() {
        assert_eq!(artifact_path("hello.wasm"), PathBuf::from("hello.wasm"));
        assert_eq!(artifact_path("HELLO.WASM"), PathBuf::from("HELLO.WASM"));
        assert_eq!(artifact_path("hello.Wasm"), PathBuf::from("hello.Wasm"));
    }

    #[test]
    fn test_suffix_must_be_whole() {
        assert_eq!(artifact_path("hellowasm"), PathBuf::from("hellowasm.wasm"));
        assert_eq!(artifact_path("wasm"), PathBuf::from("wasm.wasm"));
    }
}
