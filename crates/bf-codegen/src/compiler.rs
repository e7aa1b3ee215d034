//! Main WASM module assembler.
//!
//! Orchestrates the code generation pipeline:
//! 1. Validate the configuration and resolve brackets (reject unbalanced source)
//! 2. Emit runtime helper functions
//! 3. Lower the source into `run` and the chunks outlined from it
//! 4. Assemble all WASM sections into a module
//! 5. Embed the source, metadata and names in custom sections
//! 6. Validate with `wasmparser`

use std::borrow::Cow;
use std::path::Path;

use bf_resolver::BracketMap;
use bf_types::{MachineConfig, SourceBuffer};
use tracing::debug;
use wasm_encoder::{
    CodeSection, ConstExpr, CustomSection, DataSection, EntityType, ExportKind, ExportSection,
    FunctionSection, ImportSection, IndirectNameMap, MemorySection, MemoryType, Module, NameMap,
    NameSection, TypeSection, ValType,
};

use crate::error::{CodegenError, CodegenResult};
use crate::lower::{self, LoweredProgram, LOCAL_BYTE, LOCAL_DP};
use crate::metadata::ArtifactMetadata;
use crate::runtime::{self, *};
use crate::types::*;

// ══════════════════════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════════════════════

/// Compile `source` into a `.wasm` binary, naming the module after the
/// source's file stem.
pub fn compile(source: &SourceBuffer, config: &MachineConfig) -> CodegenResult<Vec<u8>> {
    compile_named(source, config, &default_module_name(source))
}

/// Compile `source` into a `.wasm` binary with an explicit module name.
///
/// Returns the raw bytes of a valid WebAssembly module on success, or a
/// [`CodegenError`] describing what went wrong. The same inputs always
/// produce the same bytes.
pub fn compile_named(
    source: &SourceBuffer,
    config: &MachineConfig,
    module_name: &str,
) -> CodegenResult<Vec<u8>> {
    compile_with_metadata(source, config, module_name).map(|(wasm, _)| wasm)
}

/// Compile and also return the metadata embedded in the module.
pub fn compile_with_metadata(
    source: &SourceBuffer,
    config: &MachineConfig,
    module_name: &str,
) -> CodegenResult<(Vec<u8>, ArtifactMetadata)> {
    config.validate()?;
    if u32::try_from(source.len()).is_err() {
        return Err(CodegenError::LimitExceeded(format!(
            "source of {} bytes exceeds the 32-bit offset range",
            source.len()
        )));
    }
    let brackets = BracketMap::build(source.bytes())?;

    let compiler = Compiler {
        source,
        config,
        metadata: ArtifactMetadata::new(module_name, source, config),
    };
    let wasm = compiler.compile()?;
    debug!(
        module = module_name,
        bytes = wasm.len(),
        loops = brackets.pair_count(),
        max_depth = brackets.max_depth(),
        "module generated"
    );
    Ok((wasm, compiler.metadata))
}

fn default_module_name(source: &SourceBuffer) -> String {
    Path::new(source.name())
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "program".to_string())
}

// ══════════════════════════════════════════════════════════════════════════════
// Compiler
// ══════════════════════════════════════════════════════════════════════════════

/// The top-level compiler state.
struct Compiler<'a> {
    source: &'a SourceBuffer,
    config: &'a MachineConfig,
    metadata: ArtifactMetadata,
}

impl Compiler<'_> {
    /// Run the full compilation pipeline.
    fn compile(&self) -> CodegenResult<Vec<u8>> {
        let mut module = Module::new();

        // 1. Type section
        module.section(&self.emit_types());

        // 2. Import section
        module.section(&self.emit_imports());

        // 3. Function section + Code section (built together)
        let lowered = lower::emit_run(self.source.bytes(), self.config);
        let (func_section, code_section) = self.emit_functions(&lowered);
        module.section(&func_section);

        // 4. Memory section
        module.section(&self.emit_memory());

        // 5. Export section
        module.section(&self.emit_exports());

        // 6. Code section
        module.section(&code_section);

        // 7. Data section
        module.section(&self.emit_data());

        // 8. Custom sections
        module.section(&CustomSection {
            name: Cow::Borrowed(SOURCE_SECTION_NAME),
            data: Cow::Borrowed(self.source.bytes()),
        });
        let meta = serde_json::to_vec(&self.metadata)?;
        module.section(&CustomSection {
            name: Cow::Borrowed(META_SECTION_NAME),
            data: Cow::Owned(meta),
        });
        module.section(&self.emit_names(lowered.chunks.len() as u32));

        let wasm_bytes = module.finish();

        // 9. Validate
        wasmparser::validate(&wasm_bytes)
            .map_err(|e| CodegenError::ValidationFailed(format!("{e}")))?;

        Ok(wasm_bytes)
    }

    // ── Type section ─────────────────────────────────────────────────────

    fn emit_types(&self) -> TypeSection {
        let mut types = TypeSection::new();

        // TYPE_VOID_VOID: () -> ()
        types.ty().function(vec![], vec![]);
        // TYPE_I32_VOID: (i32) -> ()
        types.ty().function(vec![ValType::I32], vec![]);
        // TYPE_VOID_I32: () -> i32
        types.ty().function(vec![], vec![ValType::I32]);
        // TYPE_I32X4_I32: (i32, i32, i32, i32) -> i32
        types.ty().function(vec![ValType::I32; 4], vec![ValType::I32]);
        // TYPE_I32_I32: (i32) -> i32
        types.ty().function(vec![ValType::I32], vec![ValType::I32]);

        types
    }

    // ── Import section ───────────────────────────────────────────────────

    fn emit_imports(&self) -> ImportSection {
        let mut imports = ImportSection::new();

        // IMPORT_FD_READ
        imports.import(WASI_MODULE, "fd_read", EntityType::Function(TYPE_I32X4_I32));
        // IMPORT_FD_WRITE
        imports.import(WASI_MODULE, "fd_write", EntityType::Function(TYPE_I32X4_I32));
        // IMPORT_PROC_EXIT
        imports.import(WASI_MODULE, "proc_exit", EntityType::Function(TYPE_I32_VOID));

        imports
    }

    // ── Function + Code sections ─────────────────────────────────────────

    fn emit_functions(&self, lowered: &LoweredProgram) -> (FunctionSection, CodeSection) {
        let mut func_section = FunctionSection::new();
        let mut code_section = CodeSection::new();

        // RT_READ_BYTE () -> i32
        func_section.function(TYPE_VOID_I32);
        code_section.function(&runtime::emit_read_byte());

        // RT_WRITE_BYTE (i32) -> ()
        func_section.function(TYPE_I32_VOID);
        code_section.function(&runtime::emit_write_byte());

        // RT_POINTER_FAULT (i32) -> ()
        func_section.function(TYPE_I32_VOID);
        code_section.function(&runtime::emit_pointer_fault());

        // RT_RUN () -> ()
        func_section.function(TYPE_VOID_VOID);
        code_section.function(&lowered.run);

        // RT_START () -> ()
        func_section.function(TYPE_VOID_VOID);
        code_section.function(&runtime::emit_start());

        // Chunks of `run`: (dp: i32) -> i32
        for chunk in &lowered.chunks {
            func_section.function(TYPE_I32_I32);
            code_section.function(chunk);
        }

        (func_section, code_section)
    }

    // ── Memory section ───────────────────────────────────────────────────

    fn emit_memory(&self) -> MemorySection {
        let pages = memory_pages(self.config.tape_bytes());
        let mut memory = MemorySection::new();
        memory.memory(MemoryType {
            minimum: pages,
            maximum: Some(pages),
            memory64: false,
            shared: false,
            page_size_log2: None,
        });
        memory
    }

    // ── Export section ────────────────────────────────────────────────────

    fn emit_exports(&self) -> ExportSection {
        let mut exports = ExportSection::new();
        exports.export("_start", ExportKind::Func, rt_func_idx(RT_START));
        exports.export("run", ExportKind::Func, rt_func_idx(RT_RUN));
        exports.export("memory", ExportKind::Memory, 0);
        exports
    }

    // ── Data section ─────────────────────────────────────────────────────

    fn emit_data(&self) -> DataSection {
        let mut data_sec = DataSection::new();
        data_sec.active(
            0,
            &ConstExpr::i32_const(MESSAGE as i32),
            FAULT_MESSAGE.iter().copied(),
        );
        data_sec.active(0, &ConstExpr::i32_const(DIGITS_END as i32), [b'\n']);
        data_sec
    }

    // ── Name section ─────────────────────────────────────────────────────

    fn emit_names(&self, chunk_count: u32) -> NameSection {
        let mut names = NameSection::new();
        names.module(&self.metadata.module_name);

        let mut functions = NameMap::new();
        functions.append(IMPORT_FD_READ, "fd_read");
        functions.append(IMPORT_FD_WRITE, "fd_write");
        functions.append(IMPORT_PROC_EXIT, "proc_exit");
        functions.append(rt_func_idx(RT_READ_BYTE), "read_byte");
        functions.append(rt_func_idx(RT_WRITE_BYTE), "write_byte");
        functions.append(rt_func_idx(RT_POINTER_FAULT), "pointer_fault");
        functions.append(rt_func_idx(RT_RUN), "run");
        functions.append(rt_func_idx(RT_START), "_start");
        for chunk in 0..chunk_count {
            functions.append(chunk_func_idx(chunk), &format!("run.chunk{chunk}"));
        }
        names.functions(&functions);

        let mut fault_locals = NameMap::new();
        fault_locals.append(0, "offset");
        fault_locals.append(1, "cursor");
        let mut run_locals = NameMap::new();
        run_locals.append(LOCAL_DP, "dp");
        run_locals.append(LOCAL_BYTE, "byte");
        let mut locals = IndirectNameMap::new();
        locals.append(rt_func_idx(RT_POINTER_FAULT), &fault_locals);
        locals.append(rt_func_idx(RT_RUN), &run_locals);
        for chunk in 0..chunk_count {
            locals.append(chunk_func_idx(chunk), &run_locals);
        }
        names.locals(&locals);

        names
    }
}
