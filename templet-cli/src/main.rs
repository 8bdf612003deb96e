//! Command-line interface for templet
//! Decompose, validate, and format templet template files.
//!
//! Usage:
//!   templet tokens <path>      - Dump the token stream as JSON
//!   templet ast <path>         - Dump the full parse result as JSON
//!   templet symbols <path>     - Dump the block/slot outline as JSON
//!   templet highlight <path>   - Dump semantic tokens as JSON
//!   templet diagnose <path>    - Run diagnostics; exits non-zero on errors
//!   templet format <path>      - Print (or rewrite with --write) the formatted file
//!
//! Every subcommand accepts `-` as the path to read from standard input.

use clap::{Arg, ArgAction, Command};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use templet_analysis::{
    diagnostics, document_symbols, format, semantic_tokens, DiagnosticsContext, FormatOptions,
    FsReader, ParserTag, Severity,
};
use templet_parser::templet::parse;

fn main() -> ExitCode {
    let matches = Command::new("templet")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A tool for inspecting, validating and formatting templet files")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("tokens")
                .about("Dump the token stream as JSON")
                .arg(path_arg()),
        )
        .subcommand(
            Command::new("ast")
                .about("Dump the parse result (tree, tokens, errors) as JSON")
                .arg(path_arg()),
        )
        .subcommand(
            Command::new("symbols")
                .about("Dump the nested block/slot outline as JSON")
                .arg(path_arg()),
        )
        .subcommand(
            Command::new("highlight")
                .about("Dump semantic highlighting tokens as JSON")
                .arg(path_arg()),
        )
        .subcommand(
            Command::new("diagnose")
                .about("Run structural and cross-file diagnostics")
                .arg(path_arg())
                .arg(
                    Arg::new("root")
                        .long("root")
                        .help("Workspace root for partial/extend resolution (repeatable)")
                        .value_name("DIR")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Emit diagnostics as JSON instead of plain lines")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("format")
                .about("Format a template, canonicalizing structural tags")
                .arg(path_arg())
                .arg(
                    Arg::new("write")
                        .long("write")
                        .short('w')
                        .help("Rewrite the file in place instead of printing")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("tag")
                        .long("tag")
                        .help("Host language of code content: html, markdown, typescript, babel")
                        .default_value("html"),
                )
                .arg(
                    Arg::new("keep-blank-lines")
                        .long("keep-blank-lines")
                        .help("Maximum consecutive blank lines to keep; negative disables clamping")
                        .allow_hyphen_values(true)
                        .default_value("2"),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("tokens", sub)) => {
            let parsed = parse(&read_source(path_of(sub)));
            print_json(&parsed.tokens);
            ExitCode::SUCCESS
        }
        Some(("ast", sub)) => {
            let parsed = parse(&read_source(path_of(sub)));
            print_json(&parsed);
            ExitCode::SUCCESS
        }
        Some(("symbols", sub)) => {
            let text = read_source(path_of(sub));
            let parsed = parse(&text);
            print_json(&document_symbols(&text, &parsed));
            ExitCode::SUCCESS
        }
        Some(("highlight", sub)) => {
            let text = read_source(path_of(sub));
            let parsed = parse(&text);
            print_json(&semantic_tokens(&text, &parsed));
            ExitCode::SUCCESS
        }
        Some(("diagnose", sub)) => handle_diagnose(sub),
        Some(("format", sub)) => handle_format(sub),
        _ => unreachable!("subcommand is required"),
    }
}

fn path_arg() -> Arg {
    Arg::new("path")
        .help("Template file, or '-' for standard input")
        .required(true)
        .index(1)
}

fn path_of(matches: &clap::ArgMatches) -> &str {
    matches
        .get_one::<String>("path")
        .expect("path is required")
}

fn read_source(path: &str) -> String {
    if path == "-" {
        let mut buffer = String::new();
        if let Err(error) = std::io::stdin().read_to_string(&mut buffer) {
            eprintln!("Error reading standard input: {error}");
            std::process::exit(1);
        }
        return buffer;
    }
    std::fs::read_to_string(path).unwrap_or_else(|error| {
        eprintln!("Cannot read {path}: {error}");
        std::process::exit(1);
    })
}

fn print_json<T: serde::Serialize>(value: &T) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|error| {
        eprintln!("Error serializing output: {error}");
        std::process::exit(1);
    });
    println!("{rendered}");
}

fn handle_diagnose(matches: &clap::ArgMatches) -> ExitCode {
    let path = path_of(matches);
    let text = read_source(path);
    let roots: Vec<PathBuf> = matches
        .get_many::<String>("root")
        .into_iter()
        .flatten()
        .map(PathBuf::from)
        .collect();
    let file = (path != "-").then(|| PathBuf::from(path));
    let reader = FsReader;
    let ctx = DiagnosticsContext {
        file: file.as_deref(),
        roots: &roots,
        index: None,
        reader: &reader,
    };

    let found = diagnostics(&text, &ctx);
    if matches.get_flag("json") {
        print_json(&found);
    } else {
        for diagnostic in &found {
            println!("{path}:{diagnostic}");
        }
    }

    if found.iter().any(|d| d.severity == Severity::Error) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn handle_format(matches: &clap::ArgMatches) -> ExitCode {
    let path = path_of(matches);
    let text = read_source(path);

    let tag = matches.get_one::<String>("tag").expect("has default");
    let parser_tag: ParserTag = tag.parse().unwrap_or_else(|error| {
        eprintln!("{error}");
        std::process::exit(1);
    });
    let keep = matches
        .get_one::<String>("keep-blank-lines")
        .expect("has default");
    let keep_blank_lines: i32 = keep.parse().unwrap_or_else(|_| {
        eprintln!("Invalid --keep-blank-lines value: {keep}");
        std::process::exit(1);
    });

    let options = FormatOptions {
        parser_tag,
        keep_blank_lines,
        doc_id: (path != "-").then_some(path),
        ..FormatOptions::default()
    };

    let parsed = parse(&text);
    let formatted = match format(&text, &parsed, &options) {
        Ok(formatted) => formatted,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::FAILURE;
        }
    };

    if matches.get_flag("write") && path != "-" {
        if let Err(error) = std::fs::write(path, &formatted) {
            eprintln!("Cannot write {path}: {error}");
            return ExitCode::FAILURE;
        }
    } else {
        print!("{formatted}");
    }
    ExitCode::SUCCESS
}
