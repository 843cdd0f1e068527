// SPDX-FileCopyrightText: (C) 2024 Graylog SDK Contributors
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, error};

use graylog_sdk::config::Config;
use graylog_sdk::datetime::{self, DateTime};
use graylog_sdk::legacy::{LegacyGraylogSearch, LegacyScope, TermsOptions, TimeUnit};
use graylog_sdk::search::{
    GraylogSearch, Interval, IntervalTimeunit, SearchScope, SearchTypePivot, Series, SeriesType,
    SortConfig, SortConfigOrder, Timerange,
};
use graylog_sdk::{logger, version, ClientBuilder, Transport};

#[tokio::main]
async fn main() {
    logger::init_offset();
    if let Err(err) = _main().await {
        error!("{:#}", err);
        std::process::exit(1);
    }
}

fn command() -> Command {
    Command::new("graylog-search")
        .about("Search Graylog from the command line")
        .version(version::version())
        .long_version(version::long_version())
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count)
                .global(true)
                .help("Increase verbosity"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .action(ArgAction::Set)
                .value_name("FILE")
                .global(true)
                .help("Configuration filename"),
        )
        .arg(
            Arg::new("url")
                .long("url")
                .action(ArgAction::Set)
                .global(true)
                .help("Graylog API URL, e.g. https://graylog:9000/api"),
        )
        .arg(
            Arg::new("username")
                .long("username")
                .short('u')
                .action(ArgAction::Set)
                .global(true)
                .help("Graylog username"),
        )
        .arg(
            Arg::new("password")
                .long("password")
                .short('p')
                .action(ArgAction::Set)
                .global(true)
                .help("Graylog password"),
        )
        .arg(
            Arg::new("token")
                .long("token")
                .action(ArgAction::Set)
                .global(true)
                .help("Graylog access token"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .action(ArgAction::Set)
                .default_value("60s")
                .global(true)
                .help("Request timeout"),
        )
        .arg(
            Arg::new("no-check-certificate")
                .long("no-check-certificate")
                .short('k')
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Disable TLS certificate validation"),
        )
        .subcommand(Command::new("version").about("Display version"))
        .subcommand(legacy_command())
        .subcommand(views_command())
        .subcommand_required(true)
}

/// Arguments shared by every search command.
fn scope_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("query")
                .long("query")
                .short('q')
                .action(ArgAction::Set)
                .default_value("*")
                .help("Query string"),
        )
        .arg(
            Arg::new("stream-id")
                .long("stream-id")
                .short('s')
                .action(ArgAction::Set)
                .help("Stream to search"),
        )
        .arg(
            Arg::new("range")
                .long("range")
                .short('r')
                .action(ArgAction::Set)
                .default_value("5m")
                .help("Search the last DURATION"),
        )
        .arg(
            Arg::new("from")
                .long("from")
                .action(ArgAction::Set)
                .help("Start time, overrides --range"),
        )
        .arg(
            Arg::new("to")
                .long("to")
                .action(ArgAction::Set)
                .help("End time, defaults to now"),
        )
}

fn paging_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("size")
                .long("size")
                .action(ArgAction::Set)
                .value_parser(clap::value_parser!(u32))
                .default_value("10"),
        )
        .arg(
            Arg::new("page")
                .long("page")
                .action(ArgAction::Set)
                .value_parser(clap::value_parser!(u32))
                .default_value("1"),
        )
}

fn field_arg(required: bool) -> Arg {
    Arg::new("field")
        .long("field")
        .short('f')
        .action(ArgAction::Set)
        .required(required)
}

fn legacy_command() -> Command {
    let interval = Arg::new("interval")
        .long("interval")
        .short('i')
        .action(ArgAction::Set)
        .value_parser(["minute", "hour", "day", "week", "month", "quarter", "year"])
        .default_value("hour");
    Command::new("legacy")
        .about("Search the legacy universal search endpoints")
        .subcommand(paging_args(scope_args(Command::new("messages"))))
        .subcommand(scope_args(Command::new("stats")).arg(field_arg(true)))
        .subcommand(scope_args(Command::new("histogram")).arg(interval.clone()))
        .subcommand(
            scope_args(Command::new("fieldhistogram"))
                .arg(field_arg(true))
                .arg(interval),
        )
        .subcommand(
            scope_args(Command::new("terms"))
                .arg(field_arg(true))
                .arg(
                    Arg::new("stacked-field")
                        .long("stacked-field")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("size")
                        .long("size")
                        .action(ArgAction::Set)
                        .value_parser(clap::value_parser!(u32))
                        .default_value("10"),
                )
                .arg(Arg::new("reverse").long("reverse").action(ArgAction::SetTrue)),
        )
        .subcommand_required(true)
}

fn views_command() -> Command {
    let series = Arg::new("series")
        .long("series")
        .action(ArgAction::Append)
        .help("Series as TYPE[:FIELD[:PERCENTILE]], e.g. avg:process_time");
    let group = Arg::new("group")
        .long("group")
        .short('g')
        .action(ArgAction::Append)
        .help("Row group as FIELD[:LIMIT]");
    let column = Arg::new("column")
        .long("column")
        .action(ArgAction::Append)
        .help("Column group as FIELD[:LIMIT]");
    let interval = Arg::new("interval")
        .long("interval")
        .short('i')
        .action(ArgAction::Set)
        .default_value("1m")
        .help("Bucket size as COUNT followed by s, m, h, d, w or M; or auto");
    Command::new("views")
        .about("Search with the views search API")
        .subcommand(paging_args(scope_args(Command::new("messages"))))
        .subcommand(scope_args(Command::new("stats")).arg(series.clone()))
        .subcommand(
            scope_args(Command::new("terms"))
                .arg(series.clone())
                .arg(group.required(true))
                .arg(column.clone()),
        )
        .subcommand(
            scope_args(Command::new("histogram"))
                .arg(series)
                .arg(column)
                .arg(interval.clone()),
        )
        .subcommand(
            scope_args(Command::new("fieldhistogram"))
                .arg(field_arg(true))
                .arg(interval),
        )
        .subcommand_required(true)
}

async fn _main() -> Result<()> {
    let matches = command().get_matches();
    let verbosity = matches.get_count("verbose");
    logger::init_logger(logger::level_from_verbosity(verbosity));
    version::log_version();

    let config = Config::from_args(matches.clone(), Some("config"))?;

    match matches.subcommand() {
        Some(("version", _)) => {
            println!("graylog-search {}", version::long_version());
            Ok(())
        }
        Some(("legacy", args)) => legacy_main(&config, args).await,
        Some(("views", args)) => views_main(&config, args).await,
        _ => unreachable!(),
    }
}

fn transport(config: &Config) -> Result<Arc<dyn Transport>> {
    let client = ClientBuilder::from_config(config)?.build()?;
    debug!("Using Graylog at {}", client.url());
    Ok(Arc::new(client))
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn time_arg(args: &ArgMatches, name: &str) -> Result<Option<DateTime>> {
    match args.get_one::<String>(name) {
        Some(value) => Ok(Some(
            datetime::parse(value).with_context(|| format!("--{name}"))?,
        )),
        None => Ok(None),
    }
}

fn range_arg(args: &ArgMatches) -> Result<std::time::Duration> {
    let range = args.get_one::<String>("range").map(String::as_str).unwrap_or("5m");
    humantime::parse_duration(range).with_context(|| format!("--range {range}"))
}

fn stream_id(config: &Config, args: &ArgMatches) -> Result<Option<String>> {
    if let Some(stream_id) = args.get_one::<String>("stream-id") {
        return Ok(Some(stream_id.clone()));
    }
    Ok(config.get_string("stream-id")?)
}

fn query_arg(args: &ArgMatches) -> String {
    args.get_one::<String>("query").cloned().unwrap_or_default()
}

fn legacy_scope(config: &Config, args: &ArgMatches) -> Result<LegacyScope> {
    let to = time_arg(args, "to")?.unwrap_or_else(chrono::Utc::now);
    let from = match time_arg(args, "from")? {
        Some(from) => from,
        None => to - chrono::Duration::from_std(range_arg(args)?)?,
    };
    let mut scope = LegacyScope::new(from, to).with_query(query_arg(args));
    if let Some(stream_id) = stream_id(config, args)? {
        scope = scope.with_stream(&stream_id);
    }
    Ok(scope)
}

async fn legacy_main(config: &Config, args: &ArgMatches) -> Result<()> {
    let mut search = LegacyGraylogSearch::new(transport(config)?);
    if let Some(limit) = config.get_u64("legacy.limit")? {
        search = search.with_limit(u32::try_from(limit)?);
    }
    let (name, args) = args.subcommand().context("no legacy command")?;
    let scope = legacy_scope(config, args)?;
    let field = || args.get_one::<String>("field").cloned().unwrap_or_default();
    let interval = || -> Result<TimeUnit> {
        let interval = args.get_one::<String>("interval").map(String::as_str).unwrap_or("hour");
        interval.parse::<TimeUnit>().map_err(anyhow::Error::msg)
    };

    match name {
        "messages" => {
            let size = *args.get_one::<u32>("size").unwrap_or(&10);
            let page = *args.get_one::<u32>("page").unwrap_or(&1);
            let page = search
                .get_messages_page::<JsonValue>(&scope, size, page)
                .await?;
            print(&page)
        }
        "stats" => print(&search.get_statistics(&scope, &field()).await?),
        "histogram" => print(&search.get_histogram(&scope, interval()?).await?),
        "fieldhistogram" => print(&search.get_field_histogram(&scope, &field(), interval()?).await?),
        "terms" => {
            let mut options = TermsOptions::new(&field(), *args.get_one::<u32>("size").unwrap_or(&10))
                .reverse_order(args.get_flag("reverse"));
            if let Some(stacked) = args.get_many::<String>("stacked-field") {
                for field in stacked {
                    options = options.with_stacked_field(field);
                }
            }
            print(&search.get_terms(&scope, &options).await?)
        }
        _ => bail!("unknown legacy command: {name}"),
    }
}

fn views_scope(config: &Config, args: &ArgMatches) -> Result<SearchScope> {
    let timerange = match time_arg(args, "from")? {
        Some(from) => {
            let to = time_arg(args, "to")?.unwrap_or_else(chrono::Utc::now);
            Timerange::absolute(from, to)?
        }
        None => Timerange::relative(range_arg(args)?.as_secs()),
    };
    let mut scope = SearchScope::new(timerange).with_query(query_arg(args));
    if let Some(stream_id) = stream_id(config, args)? {
        scope = scope.with_stream(&stream_id);
    }
    Ok(scope)
}

/// Parse TYPE[:FIELD[:PERCENTILE]].
fn parse_series(value: &str) -> Result<Series> {
    let mut parts = value.splitn(3, ':');
    let kind = parts.next().unwrap_or_default();
    let kind: SeriesType = serde_json::from_value(JsonValue::String(kind.to_lowercase()))
        .with_context(|| format!("unknown series type: {kind}"))?;
    let mut builder = Series::builder().kind(kind);
    if let Some(field) = parts.next() {
        builder = builder.field(field);
    }
    if let Some(percentile) = parts.next() {
        builder = builder.percentile(percentile.parse().context("invalid percentile")?);
    }
    Ok(builder.build()?)
}

fn series_args(args: &ArgMatches) -> Result<Vec<Series>> {
    match args.get_many::<String>("series") {
        Some(values) => values.map(|v| parse_series(v)).collect(),
        None => Ok(vec![Series::count()]),
    }
}

/// Parse FIELD[:LIMIT] into a values pivot.
fn parse_group(value: &str) -> Result<SearchTypePivot> {
    let (field, limit) = match value.split_once(':') {
        Some((field, limit)) => (field, limit.parse().context("invalid group limit")?),
        None => (value, 10),
    };
    Ok(SearchTypePivot::values(field, limit)?)
}

fn group_args(args: &ArgMatches, name: &str) -> Result<Vec<SearchTypePivot>> {
    match args.get_many::<String>(name) {
        Some(values) => values.map(|v| parse_group(v)).collect(),
        None => Ok(vec![]),
    }
}

fn interval_arg(args: &ArgMatches) -> Result<Interval> {
    let value = args.get_one::<String>("interval").map(String::as_str).unwrap_or("1m");
    if value == "auto" {
        return Ok(Interval::auto());
    }
    let timeunit: IntervalTimeunit = value.parse()?;
    Ok(Interval::Timeunit { timeunit })
}

async fn views_main(config: &Config, args: &ArgMatches) -> Result<()> {
    let search = GraylogSearch::new(transport(config)?);
    let (name, args) = args.subcommand().context("no views command")?;
    let scope = views_scope(config, args)?;

    match name {
        "messages" => {
            let size = *args.get_one::<u32>("size").unwrap_or(&10);
            let page = *args.get_one::<u32>("page").unwrap_or(&1);
            let sort = SortConfig::message("timestamp", SortConfigOrder::Desc);
            let page = search
                .get_messages::<JsonValue>(&scope, size, page, Some(sort))
                .await?;
            print(&page)
        }
        "stats" => print(&search.get_statistics(&scope, series_args(args)?).await?),
        "terms" => {
            let terms = search
                .get_terms(
                    &scope,
                    series_args(args)?,
                    group_args(args, "group")?,
                    group_args(args, "column")?,
                    None,
                )
                .await?;
            print(&terms)
        }
        "histogram" => {
            let histogram = search
                .get_histogram(
                    &scope,
                    interval_arg(args)?,
                    series_args(args)?,
                    group_args(args, "column")?,
                )
                .await?;
            print(&histogram)
        }
        "fieldhistogram" => {
            let field = args.get_one::<String>("field").cloned().unwrap_or_default();
            print(&search.get_field_histogram(&scope, &field, interval_arg(args)?).await?)
        }
        _ => bail!("unknown views command: {name}"),
    }
}
