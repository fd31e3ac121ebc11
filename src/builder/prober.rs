//! The option prober: synthesizes a C/C++ snippet from an option's probing
//! inputs, compiles (and optionally links) it with the detected toolchain,
//! and records the pass/fail result as the option's resolved `value`.

use std::path::Path;

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::builder::flags::{translate_all, TranslateContext};
use crate::core::option::ProbeInputs;
use crate::core::toolchain::{ToolKind, ToolName};
use crate::util::process::ProcessBuilder;

/// Sanitize a type name into a valid C identifier fragment, per §4.4 step 2:
/// non-alphanumerics become `_`.
fn sanitize_type_name(ty: &str) -> String {
    ty.chars().map(|c| if c.is_alphanumeric() { c } else { '_' }).collect()
}

/// One function-reference line: the raw call expression if it looks like a
/// call (contains `(`), otherwise a forced pointer reference that keeps an
/// otherwise-unused symbol from being optimized away before linking.
fn func_reference_line(func: &str) -> String {
    if func.contains('(') {
        format!("{func};")
    } else {
        format!("volatile void* p{func} = (void*)&{func};")
    }
}

/// Assemble the test snippet's source text, in the order §4.4 specifies.
fn synthesize_snippet(includes: &[String], types: &[String], snippets: &[String], funcs: &[String]) -> String {
    let mut src = String::new();
    for include in includes {
        src.push_str(&format!("#include \"{include}\"\n"));
    }
    for ty in types {
        src.push_str(&format!("typedef {ty} __type_{};\n", sanitize_type_name(ty)));
    }
    for snippet in snippets {
        src.push_str(snippet);
        src.push('\n');
    }
    src.push_str("int main(int argc, char** argv) {\n");
    for func in funcs {
        src.push_str("    ");
        src.push_str(&func_reference_line(func));
        src.push('\n');
    }
    src.push_str("    return 0;\n}\n");
    src
}

/// A colon inside a translated flag segment is rewritten to a space before
/// invocation (the legacy wire format joined some flag groups with `:`).
fn colon_to_space(segment: &str) -> String {
    segment.replace(':', " ")
}

fn split_args(joined: &str) -> Vec<String> {
    colon_to_space(joined).split_whitespace().map(str::to_string).collect()
}

/// One side (C or C++) of a probe: the funcs/includes/types/snippets plus
/// the flags that govern compilation.
struct ProbeSide<'a> {
    toolkind: ToolKind,
    includes: &'a [String],
    types: &'a [String],
    snippets: &'a [String],
    funcs: &'a [String],
    ext: &'static str,
    raw_flags: Vec<String>,
}

fn run_compile(program: &Path, toolname: ToolName, side: &ProbeSide, inputs: &ProbeInputs, dir: &Path) -> Result<bool> {
    if side.funcs.is_empty() && side.includes.is_empty() && side.types.is_empty() && side.snippets.is_empty() {
        return Ok(true);
    }
    let src_path = dir.join(format!("probe.{}", side.ext));
    let obj_path = dir.join("probe.o");
    let source = synthesize_snippet(side.includes, side.types, side.snippets, side.funcs);
    std::fs::write(&src_path, source).context("writing probe source")?;

    let ctx = TranslateContext::default();
    let mut abstract_flags = Vec::new();
    for (item, values) in [
        ("languages", &inputs.languages),
        ("warnings", &inputs.warnings),
        ("optimizes", &inputs.optimizes),
        ("defines", &inputs.defines),
        ("udefines", &inputs.udefines),
    ] {
        let joined = translate_all(side.toolkind, toolname, item, values, ctx)?;
        if !joined.is_empty() {
            abstract_flags.extend(split_args(&joined));
        }
    }

    let mut builder = ProcessBuilder::new(program).arg("-c");
    builder = builder.args(&abstract_flags);
    builder = builder.args(&side.raw_flags);
    builder = builder.arg("-o").arg(&obj_path).arg(&src_path);

    let status = builder.status();
    let obj_created = obj_path.exists();
    if !obj_created {
        let _ = std::fs::remove_file(&obj_path);
    }
    Ok(status.map(|s| s.success()).unwrap_or(false) && obj_created)
}

/// Run the compile (and, if link inputs are present, link) probe for one
/// option, returning the boolean result that becomes its `value`.
pub fn probe(
    inputs: &ProbeInputs,
    cc_program: Option<&Path>,
    cc_toolname: Option<ToolName>,
    cxx_program: Option<&Path>,
    cxx_toolname: Option<ToolName>,
    ld_program: Option<&Path>,
    ld_toolname: Option<ToolName>,
) -> Result<bool> {
    let dir = TempDir::new().context("creating probe tempdir")?;

    let mut ok = true;
    let mut last_obj: Option<std::path::PathBuf> = None;

    if !inputs.c_side_is_empty() {
        let Some(program) = cc_program else { return Ok(false) };
        let toolname = cc_toolname.unwrap_or(ToolName::Gcc);
        let mut raw_flags: Vec<String> = inputs.cxflags.clone();
        raw_flags.extend(inputs.cflags.clone());
        let side = ProbeSide {
            toolkind: ToolKind::Cc,
            includes: &inputs.cincludes,
            types: &inputs.ctypes,
            snippets: &inputs.csnippets,
            funcs: &inputs.cfuncs,
            ext: "c",
            raw_flags,
        };
        let side_ok = run_compile(program, toolname, &side, inputs, dir.path())?;
        ok = ok && side_ok;
        if side_ok {
            last_obj = Some(dir.path().join("probe.o"));
        }
    }

    if !inputs.cxx_side_is_empty() {
        let Some(program) = cxx_program else { return Ok(false) };
        let toolname = cxx_toolname.unwrap_or(ToolName::Gxx);
        let mut raw_flags: Vec<String> = inputs.cxflags.clone();
        raw_flags.extend(inputs.cxxflags.clone());
        let side = ProbeSide {
            toolkind: ToolKind::Cxx,
            includes: &inputs.cxxincludes,
            types: &inputs.cxxtypes,
            snippets: &inputs.cxxsnippets,
            funcs: &inputs.cxxfuncs,
            ext: "cpp",
            raw_flags,
        };
        let side_ok = run_compile(program, toolname, &side, inputs, dir.path())?;
        ok = ok && side_ok;
        if side_ok {
            last_obj = Some(dir.path().join("probe.o"));
        }
    }

    if ok && (!inputs.links.is_empty() || !inputs.syslinks.is_empty()) {
        let (Some(program), Some(obj)) = (ld_program, last_obj) else {
            return Ok(false);
        };
        let toolname = ld_toolname.unwrap_or(ToolName::Gcc);
        let ctx = TranslateContext::default();
        let mut link_flags = Vec::new();
        for (item, values) in [("linkdirs", &inputs.linkdirs), ("links", &inputs.links), ("syslinks", &inputs.syslinks)] {
            let joined = translate_all(ToolKind::Ld, toolname, item, values, ctx)?;
            if !joined.is_empty() {
                link_flags.extend(split_args(&joined));
            }
        }
        let bin_path = dir.path().join("probe.bin");
        let mut builder = ProcessBuilder::new(program).args(&link_flags);
        builder = builder.args(&inputs.ldflags);
        builder = builder.arg("-o").arg(&bin_path).arg(&obj);
        let status = builder.status();
        let linked = bin_path.exists();
        ok = status.map(|s| s.success()).unwrap_or(false) && linked;
        let _ = std::fs::remove_file(&bin_path);
    }

    // `dir` (and everything inside it) is removed on drop regardless of how
    // this function returns.
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn func_reference_line_calls_when_it_looks_callable() {
        assert_eq!(func_reference_line("pthread_create()"), "pthread_create();");
        assert_eq!(func_reference_line("pthread_create"), "volatile void* ppthread_create = (void*)&pthread_create;");
    }

    #[test]
    fn sanitize_type_name_replaces_non_alphanumerics() {
        assert_eq!(sanitize_type_name("struct foo*"), "struct_foo_");
    }

    #[test]
    fn snippet_orders_includes_types_snippets_then_main() {
        let snippet = synthesize_snippet(
            &["pthread.h".to_string()],
            &["pthread_t".to_string()],
            &["#define X 1".to_string()],
            &["pthread_create".to_string()],
        );
        let include_pos = snippet.find("#include").unwrap();
        let typedef_pos = snippet.find("typedef").unwrap();
        let define_pos = snippet.find("#define X").unwrap();
        let main_pos = snippet.find("int main").unwrap();
        assert!(include_pos < typedef_pos && typedef_pos < define_pos && define_pos < main_pos);
    }

    #[test]
    fn colon_segments_become_spaces() {
        assert_eq!(colon_to_space("-Wl,-rpath='x':-lfoo"), "-Wl,-rpath='x' -lfoo");
    }
}
