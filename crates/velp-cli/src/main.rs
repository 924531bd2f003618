use std::path::PathBuf;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use velp_cli::{encode_range, load_annotations, load_config, resolve, DocumentFixture};
use velp_tree::ParId;

fn cli() -> Command {
    let document = Arg::new("document")
        .long("document")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Document fixture (JSON)");

    Command::new("velp")
        .version(velp_cli::VERSION)
        .about("Annotation anchoring diagnostics")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("resolve")
                .about("Restore stored annotations and report their placement")
                .arg(document.clone())
                .arg(
                    Arg::new("annotations")
                        .long("annotations")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Stored annotations (JSON array)"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Review configuration (TOML)"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("encode")
                .about("Encode a character range of a paragraph")
                .arg(document)
                .arg(Arg::new("par").long("par").required(true).help("Paragraph id"))
                .arg(
                    Arg::new("start")
                        .long("start")
                        .required(true)
                        .value_parser(value_parser!(usize))
                        .help("First character offset"),
                )
                .arg(
                    Arg::new("end")
                        .long("end")
                        .required(true)
                        .value_parser(value_parser!(usize))
                        .help("Offset past the last character"),
                ),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "velp=info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("resolve", args)) => {
            let document = args.get_one::<PathBuf>("document").context("missing --document")?;
            let annotations = args.get_one::<PathBuf>("annotations").context("missing --annotations")?;
            let config = load_config(args.get_one::<PathBuf>("config").map(PathBuf::as_path))?;

            let fixture = DocumentFixture::load(document)?;
            let report = resolve(&fixture, load_annotations(annotations)?, config).await?;

            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.to_text());
            }
        }
        Some(("encode", args)) => {
            let document = args.get_one::<PathBuf>("document").context("missing --document")?;
            let par = args.get_one::<String>("par").context("missing --par")?;
            let start = *args.get_one::<usize>("start").context("missing --start")?;
            let end = *args.get_one::<usize>("end").context("missing --end")?;

            let doc = DocumentFixture::load(document)?.build()?;
            let interval = encode_range(&doc, &ParId::new(par.as_str()), start, end)?;
            println!("{}", serde_json::to_string_pretty(&interval)?);
        }
        _ => {}
    }
    Ok(())
}
