//! `planning` command-line entry point.

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use planning_cli::{
    init_tracing, render_norms, render_rollup, run_norms, run_rollup, NormsArgs, RollupArgs,
};
use planning_core::{FilterSelection, Level, Selection};
use std::path::PathBuf;

fn level_flag(level: Level) -> &'static str {
    match level {
        Level::Channel => "channel",
        Level::Chain => "chain",
        Level::Depot => "depot",
        Level::SubCat => "subcat",
        Level::Sku => "sku",
    }
}

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .value_parser(value_parser!(PathBuf))
        .help("TOML configuration file")
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output as JSON")
}

fn rows_arg() -> Arg {
    Arg::new("rows")
        .long("rows")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("JSON array of forecast rows")
}

fn cli() -> Command {
    let mut rollup = Command::new("rollup")
        .about("Group rows, layer team inputs, and print the bridge")
        .arg(rows_arg())
        .arg(
            Arg::new("updates")
                .long("updates")
                .value_parser(value_parser!(PathBuf))
                .help("JSON array of row updates merged by id"),
        )
        .arg(
            Arg::new("edits")
                .long("edits")
                .value_parser(value_parser!(PathBuf))
                .help("JSON array of team-input edits"),
        )
        .arg(config_arg())
        .arg(json_arg());

    for level in Level::ALL {
        let name = level_flag(level);
        rollup = rollup.arg(
            Arg::new(name)
                .long(name)
                .help(format!("{level} selection (\"All\" leaves it open)")),
        );
    }

    Command::new("planning")
        .version(planning_core::VERSION)
        .about("Consensus planning rollup engine")
        .subcommand_required(true)
        .subcommand(rollup)
        .subcommand(
            Command::new("norms")
                .about("Derive stock norms from forecast accuracy")
                .arg(rows_arg())
                .arg(
                    Arg::new("level")
                        .long("level")
                        .default_value("SKU")
                        .value_parser(|s: &str| s.parse::<Level>().map_err(|e| e.to_string()))
                        .help("Hierarchy level to group by"),
                )
                .arg(config_arg())
                .arg(json_arg()),
        )
}

fn filters(args: &ArgMatches) -> FilterSelection {
    Level::ALL
        .into_iter()
        .fold(FilterSelection::new(), |sel, level| {
            let value = args
                .get_one::<String>(level_flag(level))
                .map(String::as_str);
            sel.with(level, Selection::from(value))
        })
}

fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("rollup", args)) => {
            let rollup_args = RollupArgs {
                rows: args.get_one::<PathBuf>("rows").cloned().unwrap_or_default(),
                updates: args.get_one::<PathBuf>("updates").cloned(),
                edits: args.get_one::<PathBuf>("edits").cloned(),
                config: args.get_one::<PathBuf>("config").cloned(),
                filters: filters(args),
                json: args.get_flag("json"),
            };
            let snapshot = run_rollup(&rollup_args)?;
            if rollup_args.json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print!("{}", render_rollup(&snapshot));
            }
        }
        Some(("norms", args)) => {
            let norms_args = NormsArgs {
                rows: args.get_one::<PathBuf>("rows").cloned().unwrap_or_default(),
                level: args.get_one::<Level>("level").copied().unwrap_or(Level::Sku),
                config: args.get_one::<PathBuf>("config").cloned(),
                json: args.get_flag("json"),
            };
            let norms = run_norms(&norms_args)?;
            if norms_args.json {
                println!("{}", serde_json::to_string_pretty(&norms)?);
            } else {
                print!("{}", render_norms(&norms));
            }
        }
        _ => {}
    }
    Ok(())
}

fn main() {
    init_tracing();
    let matches = cli().get_matches();

    if let Err(err) = run(&matches) {
        tracing::error!("{err:#}");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
