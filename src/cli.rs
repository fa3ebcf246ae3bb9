//! Interfaz de línea de comandos.
//!
//! - `run [SUITE...]`: corre suites contra el clúster configurado.
//! - `list`: suites disponibles.
//! - `check`: verifica offline una salida capturada contra registros
//!   esperados, con las mismas semánticas que usan los suites.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use harness_adapters::TokioExecutor;
use harness_core::{ExpectArrayEntries, ExpectEntries, ExpectMultipleArrayEntries, FieldMask, Validator};
use log::error;
use serde_json::Value;

use crate::config::HarnessConfig;
use crate::errors::SuiteError;
use crate::suites::{registry, resolve, run_suites, SuiteContext};

#[derive(Debug, Parser)]
#[command(name = "gadget-harness", version, about = "Harness de integración para kubectl-gadget")]
pub struct Cli {
    /// Más detalle en los logs (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Corre suites de integración (todos si no se nombra ninguno).
    Run {
        suites: Vec<String>,
        /// Resumen como líneas JSON.
        #[arg(long)]
        json: bool,
    },
    /// Lista los suites disponibles.
    List,
    /// Valida una salida capturada contra registros JSON esperados.
    Check(CheckArgs),
}

/// Forma de la salida y semántica de comparación.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Semantics {
    /// Objetos JSON concatenados; cada esperado debe aparecer.
    Stream,
    /// Un único array; igualdad de multiconjunto.
    Array,
    /// Arrays concatenados; cada esperado debe aparecer en alguno.
    MultiArray,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[arg(long, value_enum)]
    pub semantics: Semantics,

    /// Archivo con un array JSON de registros esperados.
    #[arg(long)]
    pub expected: PathBuf,

    /// JSON pointer que se pone a cero en cada registro actual (repetible).
    #[arg(long = "mask", value_name = "POINTER")]
    pub masks: Vec<String>,

    /// Salida capturada; stdin si falta o es `-`.
    pub input: Option<PathBuf>,
}

impl CheckArgs {
    pub fn validator(&self, expected: Vec<Value>) -> Box<dyn Validator> {
        let mask = FieldMask::new(self.masks.iter().cloned());
        match self.semantics {
            Semantics::Stream => Box::new(ExpectEntries::new(mask, expected)),
            Semantics::Array => Box::new(ExpectArrayEntries::new(mask, expected)),
            Semantics::MultiArray => Box::new(ExpectMultipleArrayEntries::new(mask, expected)),
        }
    }
}

/// Valida `captured` según `args`. Los errores de lectura del archivo de
/// esperados son de uso; los de decodificación o matching, de verificación.
pub fn check(args: &CheckArgs, captured: &str) -> Result<(), SuiteError> {
    let expected: Vec<Value> = serde_json::from_str(&std::fs::read_to_string(&args.expected)?)?;
    args.validator(expected).validate(captured)?;
    Ok(())
}

fn read_input(path: Option<&Path>) -> io::Result<String> {
    match path {
        Some(p) if p != Path::new("-") => std::fs::read_to_string(p),
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

pub async fn execute(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::List => {
            for (name, suite) in registry() {
                println!("{name:<18} {}", suite.description());
            }
            Ok(())
        }
        Command::Check(args) => read_input(args.input.as_deref()).map_err(SuiteError::from)
                                                                 .and_then(|captured| check(&args, &captured))
                                                                 .map(|()| println!("ok")),
        Command::Run { suites, json } => return run(&suites, json).await,
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(names: &[String], json: bool) -> ExitCode {
    let prepared = resolve(names).and_then(|suites| Ok((suites, HarnessConfig::from_env()?)));
    let (suites, config) = match prepared {
        Ok(prepared) => prepared,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(err.exit_code());
        }
    };

    let ctx = Arc::new(SuiteContext::new(config, TokioExecutor::new()));
    let summaries = run_suites(ctx, &suites).await;
    for s in &summaries {
        if json {
            match serde_json::to_string(s) {
                Ok(line) => println!("{line}"),
                Err(err) => error!("summary of {}: {err}", s.suite),
            }
        } else {
            let seconds = s.duration_ms as f64 / 1000.0;
            match &s.error {
                None => println!("PASS {} ({seconds:.1}s)", s.suite),
                Some(err) => println!("FAIL {} ({seconds:.1}s): {err}", s.suite),
            }
        }
    }
    match summaries.iter().map(|s| s.exit_code).max().unwrap_or(0) {
        0 => ExitCode::SUCCESS,
        code => ExitCode::from(code),
    }
}
