mod cli;
mod tui;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use pandoc_blocks_config::Config;
use pandoc_blocks_engine::{
    Document, EditorSession, PandocConverter, PandocOptions, PreviewCache, io, parse,
    reconstruct, render_page,
};
use std::path::Path;
use std::time::Duration;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // The editor owns the terminal; log lines would tear its screen
    if !matches!(cli.command, Commands::Edit { .. }) {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    let config = Config::load_or_default()
        .with_context(|| format!("loading {}", Config::config_path().display()))?;

    match cli.command {
        Commands::Blocks { ref file, json } => {
            let document = load_document(file, &converter(&cli, &config))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&document)?);
            } else {
                print_block_table(&document);
            }
        }
        Commands::Roundtrip {
            ref file,
            ref output,
        } => {
            let document = load_document(file, &converter(&cli, &config))?;
            emit(output.as_deref(), &reconstruct(&document))?;
        }
        Commands::Preview {
            ref file,
            ref output,
        } => {
            let converter = converter(&cli, &config);
            let document = load_document(file, &converter)?;
            let mut cache = PreviewCache::new(&converter);
            emit(output.as_deref(), &render_page(&document, &mut cache))?;
        }
        Commands::Check => {
            let converter = PandocConverter::locate(pandoc_options(&cli, &config))?;
            let version = converter.version()?;
            println!("pandoc: {}", converter.options().program.display());
            println!("version: {version}");
            println!("timeout: {:?}", converter.options().timeout);
        }
        Commands::Edit { ref file } => {
            let mut session = EditorSession::new(converter(&cli, &config));
            let path = file.clone().or_else(|| config.default_file.clone());
            let mut status = None;
            if let Some(path) = path {
                if path.exists() {
                    if let Some(error) = session.open(&path)? {
                        status = Some(format!("Pandoc failed, file kept as one block: {error}"));
                    }
                } else {
                    status = Some(format!("New file {}", path.display()));
                    session.set_path(path);
                }
            }
            tui::run(session, status)?;
        }
    }

    Ok(())
}

fn pandoc_options(cli: &Cli, config: &Config) -> PandocOptions {
    let defaults = PandocOptions::default();
    PandocOptions {
        program: cli
            .pandoc
            .clone()
            .or_else(|| config.pandoc_path.clone())
            .unwrap_or(defaults.program.clone()),
        timeout: cli
            .timeout
            .map(Duration::from_secs)
            .unwrap_or_else(|| config.timeout()),
        mathjax: config.mathjax,
        highlight_style: config.highlight_style.clone(),
        ..defaults
    }
}

/// A located pandoc, or an unresolved one whose calls fail and degrade
fn converter(cli: &Cli, config: &Config) -> PandocConverter {
    let options = pandoc_options(cli, config);
    PandocConverter::locate(options.clone()).unwrap_or_else(|e| {
        log::warn!("{e}");
        PandocConverter::new(options)
    })
}

fn load_document(path: &Path, converter: &PandocConverter) -> Result<Document> {
    let markdown =
        io::read_markdown(path).with_context(|| format!("reading {}", path.display()))?;
    let outcome = parse(&markdown, converter);
    if let Some(error) = &outcome.error {
        log::warn!(
            "{} kept as a single verbatim block: {error}",
            path.display()
        );
    }
    Ok(outcome.document)
}

fn print_block_table(document: &Document) {
    for (index, block) in document.iter().enumerate() {
        println!(
            "{index:>4}  {:<9} {}  {:<36}  {}",
            block.kind.as_str(),
            block.level,
            block.id.as_str(),
            block.summary()
        );
    }
}

fn emit(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            io::write_markdown(path, content)
                .with_context(|| format!("writing {}", path.display()))?;
        }
        None => println!("{content}"),
    }
    Ok(())
}
