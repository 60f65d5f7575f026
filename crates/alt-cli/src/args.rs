//! Parseo manual de argumentos.
//!
//! ```text
//! alt-cli sweep [--batch-size N] [--dry-run] [--verbose] [--every SECS]
//! alt-cli submit --file PATH [--verbose]
//! alt-cli status --id UUID
//! ```
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Sweep { batch_size: Option<usize>, dry_run: bool, every: Option<u64> },
    Submit { file: PathBuf },
    Status { id: Uuid },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    pub command: Command,
    pub verbose: bool,
}

pub const USAGE: &str = "uso: alt-cli <sweep|submit|status> [opciones]
  sweep  [--batch-size N] [--dry-run] [--every SECS] [--verbose]
  submit --file PATH [--verbose]
  status --id UUID";

fn value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i).map(String::as_str).ok_or_else(|| format!("{flag} requiere un valor"))
}

/// `args` sin el nombre del binario.
pub fn parse(args: &[String]) -> Result<Cli, String> {
    let Some(command) = args.first() else {
        return Err("falta el comando".into());
    };
    let mut verbose = false;
    let mut batch_size = None;
    let mut dry_run = false;
    let mut every = None;
    let mut file = None;
    let mut id = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--verbose" | "-v" => verbose = true,
            "--dry-run" => dry_run = true,
            "--batch-size" => {
                let raw = value(args, &mut i, "--batch-size")?;
                let n: usize = raw.parse().map_err(|_| format!("--batch-size inválido: {raw}"))?;
                if n == 0 {
                    return Err("--batch-size debe ser >= 1".into());
                }
                batch_size = Some(n);
            }
            "--every" => {
                let raw = value(args, &mut i, "--every")?;
                let n: u64 = raw.parse().map_err(|_| format!("--every inválido: {raw}"))?;
                if n == 0 {
                    return Err("--every debe ser >= 1".into());
                }
                every = Some(n);
            }
            "--file" => file = Some(PathBuf::from(value(args, &mut i, "--file")?)),
            "--id" => {
                let raw = value(args, &mut i, "--id")?;
                id = Some(Uuid::parse_str(raw).map_err(|_| format!("--id inválido: {raw}"))?);
            }
            other => return Err(format!("opción desconocida: {other}")),
        }
        i += 1;
    }

    let command = match command.as_str() {
        "sweep" => Command::Sweep { batch_size, dry_run, every },
        "submit" => Command::Submit { file: file.ok_or("submit requiere --file")? },
        "status" => Command::Status { id: id.ok_or("status requiere --id")? },
        other => return Err(format!("comando desconocido: {other}")),
    };
    Ok(Cli { command, verbose })
}
