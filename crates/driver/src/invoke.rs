//! Child-process orchestration.
//!
//! Classifies the wrapped command, obtains preprocessed assembly from it,
//! runs the translation engine, and feeds the result to the downstream
//! assembler: on stdin for gas-family assemblers, through a temporary
//! `.asm` file for armasm.

use gaspp_engine::{translate, Arch, Dialect, EngineConfig};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::info;

/// Options resolved by the CLI layer.
pub struct DriverOptions {
    pub arch: Option<String>,
    pub as_type: String,
    pub fix_unreq: bool,
    pub force_thumb: bool,
}

/// What the wrapped command is being asked to do.
#[derive(Debug, PartialEq, Eq)]
enum InputKind {
    /// Version/feature probing only; exec the child untouched
    Probe,
    /// A C file to compile with `-S` first
    CSource(usize),
    /// An assembly file to preprocess
    Assembly(usize),
}

/// Environment booleans are presence-only.
fn env_flag(name: &str) -> bool {
    std::env::var_os(name).is_some()
}

pub fn run(options: &DriverOptions, command: &[String]) -> Result<i32, String> {
    let dialect = Dialect::from_name(&options.as_type).map_err(|e| e.to_string())?;

    let kind = classify(command)?;
    if kind == InputKind::Probe {
        return exec_child(command);
    }
    let input_index = match &kind {
        InputKind::CSource(i) | InputKind::Assembly(i) => *i,
        InputKind::Probe => unreachable!(),
    };

    let arch = resolve_arch(options.arch.as_deref(), command)?;
    let config = EngineConfig {
        arch,
        dialect,
        fix_unreq: options.fix_unreq,
        force_thumb: options.force_thumb,
        fix_xcode5: env_flag("GASPP_FIX_XCODE5"),
        armasm64_skip_neg_offset: env_flag("GASPP_ARMASM64_SKIP_NEG_OFFSET"),
        armasm64_skip_prfum: env_flag("GASPP_ARMASM64_SKIP_PRFUM"),
        armasm64_invert_scale: env_flag("GASPP_ARMASM64_INVERT_SCALE"),
    };

    let source = preprocess(command, &kind, dialect)?;
    let translated = translate(&source, &config).map_err(|e| e.to_string())?;

    if env_flag("GASPP_DEBUG") {
        print!("{}", translated);
        return Ok(0);
    }

    if dialect == Dialect::Armasm {
        assemble_via_file(command, input_index, &translated)
    } else {
        assemble_via_stdin(command, input_index, &translated)
    }
}

/// Find the input file and decide how to drive the child.
fn classify(command: &[String]) -> Result<InputKind, String> {
    for (i, arg) in command.iter().enumerate().skip(1) {
        if arg.starts_with('-') {
            continue;
        }
        if arg.ends_with(".c") {
            return Ok(InputKind::CSource(i));
        }
        if arg.ends_with(".s") || arg.ends_with(".S") || arg.ends_with(".asm") {
            return Ok(InputKind::Assembly(i));
        }
    }
    let probing = command
        .iter()
        .skip(1)
        .any(|a| matches!(a.as_str(), "-v" | "--version" | "-h" | "-dumpversion"));
    if probing {
        Ok(InputKind::Probe)
    } else {
        Err("no .c or .s/.S input file found in the wrapped command".to_string())
    }
}

/// Resolve the architecture from `-arch` (ours or the child's) or from the
/// child command name.
fn resolve_arch(explicit: Option<&str>, command: &[String]) -> Result<Arch, String> {
    if let Some(name) = explicit {
        return Arch::from_name(name).map_err(|e| e.to_string());
    }
    for (i, arg) in command.iter().enumerate() {
        if arg == "-arch"
            && let Some(name) = command.get(i + 1)
        {
            return Arch::from_name(name).map_err(|e| e.to_string());
        }
    }
    let tool = Path::new(&command[0])
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_default();
    // armasm64 would otherwise hit the "arm" substring below
    if tool.contains("armasm64") {
        return Ok(Arch::Aarch64);
    }
    for token in ["aarch64", "arm64", "arm", "powerpc", "ppc"] {
        if tool.contains(token) {
            return Arch::from_name(token).map_err(|e| e.to_string());
        }
    }
    Err("unable to determine the target architecture; pass -arch".to_string())
}

/// Build and run the command that yields preprocessed assembly.
fn preprocess(
    command: &[String],
    kind: &InputKind,
    dialect: Dialect,
) -> Result<String, String> {
    let pre_cmd = if dialect == Dialect::Armasm {
        // armasm has no preprocessor; run cpp with the windows defines the
        // sources expect
        let input = match kind {
            InputKind::Assembly(i) | InputKind::CSource(i) => &command[*i],
            InputKind::Probe => unreachable!(),
        };
        let mut cmd = vec![
            "cpp".to_string(),
            "-undef".to_string(),
            "-D_WIN32".to_string(),
        ];
        cmd.extend(
            command
                .iter()
                .skip(1)
                .filter(|a| a.starts_with("-I") || a.starts_with("-D") || a.starts_with("-U"))
                .cloned(),
        );
        cmd.push(input.clone());
        cmd
    } else {
        build_preprocess_cmd(command, kind)
    };

    info!("preprocess: {}", pre_cmd.join(" "));
    let output = Command::new(&pre_cmd[0])
        .args(&pre_cmd[1..])
        .stderr(Stdio::inherit())
        .output()
        .map_err(|e| format!("failed to run {}: {}", pre_cmd[0], e))?;
    if !output.status.success() {
        return Err(format!(
            "{} exited with status {}",
            pre_cmd[0],
            output.status.code().unwrap_or(1)
        ));
    }
    String::from_utf8(output.stdout).map_err(|_| "preprocessed output is not UTF-8".to_string())
}

/// Derive the preprocess command from the wrapped one: strip `-c` and the
/// output file, add `-S` (C input) or `-E` (assembly input), write to
/// stdout.
fn build_preprocess_cmd(command: &[String], kind: &InputKind) -> Vec<String> {
    let mut cmd = Vec::with_capacity(command.len() + 2);
    let mut skip_next = false;
    for arg in command {
        if skip_next {
            skip_next = false;
            continue;
        }
        match arg.as_str() {
            "-c" => continue,
            "-o" => {
                skip_next = true;
                continue;
            }
            _ => cmd.push(arg.clone()),
        }
    }
    cmd.push(match kind {
        InputKind::CSource(_) => "-S".to_string(),
        _ => "-E".to_string(),
    });
    cmd.push("-o".to_string());
    cmd.push("-".to_string());
    cmd
}

/// Pipe the translated stream to the wrapped command on stdin.
fn assemble_via_stdin(
    command: &[String],
    input_index: usize,
    translated: &str,
) -> Result<i32, String> {
    let mut as_cmd: Vec<String> = command.to_vec();
    as_cmd[input_index] = "-".to_string();
    as_cmd.insert(input_index, "assembler".to_string());
    as_cmd.insert(input_index, "-x".to_string());

    info!("assemble: {}", as_cmd.join(" "));
    let mut child = Command::new(&as_cmd[0])
        .args(&as_cmd[1..])
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to run {}: {}", as_cmd[0], e))?;
    child
        .stdin
        .take()
        .ok_or_else(|| "assembler stdin unavailable".to_string())?
        .write_all(translated.as_bytes())
        .map_err(|e| format!("failed to feed the assembler: {}", e))?;
    let status = child
        .wait()
        .map_err(|e| format!("failed to wait for {}: {}", as_cmd[0], e))?;
    Ok(status.code().unwrap_or(1))
}

/// Removes the temporary `.asm` on every exit path.
struct TempAsm(PathBuf);

impl Drop for TempAsm {
    fn drop(&mut self) {
        fs::remove_file(&self.0).ok();
    }
}

/// armasm reads a file, not stdin: write the translation next to the
/// intended object file and substitute it for the input.
fn assemble_via_file(
    command: &[String],
    input_index: usize,
    translated: &str,
) -> Result<i32, String> {
    let object = output_path(command)
        .ok_or_else(|| "armasm invocation has no -o output file".to_string())?;
    let asm_path = object.with_extension("asm");
    fs::write(&asm_path, translated)
        .map_err(|e| format!("failed to write {}: {}", asm_path.display(), e))?;
    let _guard = TempAsm(asm_path.clone());

    let mut as_cmd: Vec<String> = command.to_vec();
    as_cmd[input_index] = asm_path.display().to_string();

    info!("assemble: {}", as_cmd.join(" "));
    let status = Command::new(&as_cmd[0])
        .args(&as_cmd[1..])
        .status()
        .map_err(|e| format!("failed to run {}: {}", as_cmd[0], e))?;
    Ok(status.code().unwrap_or(1))
}

fn output_path(command: &[String]) -> Option<PathBuf> {
    for (i, arg) in command.iter().enumerate() {
        if arg == "-o"
            && let Some(path) = command.get(i + 1)
        {
            return Some(PathBuf::from(path));
        }
        if let Some(path) = arg.strip_prefix("-o")
            && !path.is_empty()
        {
            return Some(PathBuf::from(path));
        }
    }
    None
}

/// Probe invocations run the child untouched.
fn exec_child(command: &[String]) -> Result<i32, String> {
    info!("exec: {}", command.join(" "));
    let status = Command::new(&command[0])
        .args(&command[1..])
        .status()
        .map_err(|e| format!("failed to run {}: {}", command[0], e))?;
    Ok(status.code().unwrap_or(1))
}
