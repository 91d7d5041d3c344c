//! VibeOData - run OData query options against the sample catalog

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use serde::Serialize;
use std::sync::Arc;
use vibeodata::demo;
use vibeodata::executor::ProjectedRecord;
use vibeodata::validation::{validate, ValidationSettings};
use vibeodata::QueryOptions;

/// VibeOData - evaluate $filter, $orderby, $select, $expand and paging options
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Query string, e.g. "$filter=Price gt 400M&$orderby=Name"
    #[arg(default_value = "")]
    query: String,

    /// Entity set to query
    #[arg(short, long, default_value = "Products")]
    entity_set: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Print the response on a single line
    #[arg(short, long)]
    compact: bool,

    /// Largest $top a query may ask for
    #[arg(short = 'm', long)]
    max_top: Option<usize>,
}

/// The JSON body written to stdout
#[derive(Serialize)]
struct Response<'a> {
    #[serde(rename = "@odata.count", skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    value: &'a [ProjectedRecord],
    #[serde(rename = "@odata.nextLink", skip_serializing_if = "Option::is_none")]
    next_link: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let model = Arc::new(demo::model().context("Failed to build the sample model")?);
    log::info!(
        "Sample model ready with entity sets: {}",
        model
            .entity_sets()
            .iter()
            .map(|set| set.name())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let options = QueryOptions::parse(&args.query, &args.entity_set, model)
        .context("Failed to parse the query string")?;

    let mut settings = ValidationSettings::new();
    if let Some(max_top) = args.max_top {
        settings = settings.with_max_top(max_top);
    }
    validate(&options, &settings).context("The query was rejected")?;

    let result = demo::execute(&options).context("Failed to execute the query")?;

    let resource_path = format!("/{}", options.entity_set().name());
    let response = Response {
        count: result.count,
        value: &result.records,
        next_link: result
            .next_skip
            .map(|skip| options.next_link(&resource_path, skip)),
    };

    let output = if args.compact {
        serde_json::to_string(&response)
    } else {
        serde_json::to_string_pretty(&response)
    }
    .context("Failed to serialize the response")?;
    println!("{}", output);

    Ok(())
}
