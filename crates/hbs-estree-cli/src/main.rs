/*
 * main.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Command-line front end: Handlebars parser JSON in, ESTree JSON out
 */

use anyhow::{Context, Result};
use clap::Parser;
use hbs_estree::{CompileOptions, Diagnostic, MapResolver, Node, compile_with_resolver};
use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "hbs-estree")]
#[command(about = "Compile a Handlebars template AST (parser JSON) into an ESTree program")]
#[command(version)]
struct Args {
    /// Template AST as produced by `Handlebars.parse` (reads stdin when omitted or `-`)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Write the ESTree JSON here instead of stdout
    #[arg(short = 'o', long = "output", value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Emit `export function render(...)`
    #[arg(long)]
    export: bool,

    /// Function applied to escaped `{{value}}` interpolations
    #[arg(long, value_name = "NAME", default_value = "escape")]
    escape_fn: String,

    /// Function applied to raw `{{{value}}}` interpolations
    #[arg(long, value_name = "NAME", default_value = "String")]
    stringify_fn: String,

    /// Name of the generated render function
    #[arg(long, value_name = "NAME", default_value = "render")]
    render_name: String,

    /// JSON object mapping helper names to import sources
    #[arg(long, value_name = "FILE.json")]
    helpers: Option<PathBuf>,

    /// Import a helper from a module (repeatable)
    #[arg(long = "helper", value_name = "NAME=SOURCE", value_parser = parse_helper)]
    helper: Vec<(String, String)>,

    /// Drop unsupported constructs with a warning instead of failing
    #[arg(long)]
    legacy: bool,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,

    /// Report diagnostics on stderr as JSON instead of text
    #[arg(long)]
    diagnostics: bool,
}

fn parse_helper(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((name, source)) if !name.is_empty() && !source.is_empty() => {
            Ok((name.to_string(), source.to_string()))
        }
        _ => Err(format!("expected NAME=SOURCE, got '{}'", value)),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hbs_estree=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let input = read_input(args.input.as_ref())?;
    let ast = Node::from_json(&input).context("Failed to parse template AST")?;

    let mut resolver = match &args.helpers {
        Some(path) => MapResolver::from_file(path)
            .context(format!("Failed to load helpers from {:?}", path))?,
        None => MapResolver::new(),
    };
    for (name, source) in &args.helper {
        resolver.add(name.as_str(), source.as_str());
    }

    let options = CompileOptions::new()
        .with_export(args.export)
        .with_escape_fn(&args.escape_fn)
        .with_stringify_fn(&args.stringify_fn)
        .with_render_name(&args.render_name)
        .with_strict(!args.legacy);

    tracing::debug!(helpers = resolver.len(), "compiling");

    let compilation = match compile_with_resolver(&ast, &options, &resolver) {
        Ok(compilation) => compilation,
        Err(err) => {
            report(&[Diagnostic::from_error(&err)], args.diagnostics)?;
            std::process::exit(1);
        }
    };
    report(&compilation.diagnostics, args.diagnostics)?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&compilation.program)
    } else {
        serde_json::to_string(&compilation.program)
    }
    .context("Failed to serialize ESTree program")?;

    match &args.output {
        Some(path) => fs::write(path, json + "\n")
            .context(format!("Failed to write output: {:?}", path))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json).context("Failed to write to stdout")?;
        }
    }

    Ok(())
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) if path.as_os_str() != "-" => {
            fs::read_to_string(path).context(format!("Failed to read file: {:?}", path))
        }
        _ => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            Ok(buffer)
        }
    }
}

fn report(diagnostics: &[Diagnostic], as_json: bool) -> Result<()> {
    if diagnostics.is_empty() {
        return Ok(());
    }
    if as_json {
        let json = serde_json::to_string(diagnostics).context("Failed to serialize diagnostics")?;
        eprintln!("{}", json);
    } else {
        for diagnostic in diagnostics {
            eprintln!("{}", diagnostic);
        }
    }
    Ok(())
}
