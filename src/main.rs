//!
//! mesonet_ingest binary
//! ---------------------
//! Pull one reference table from the remote table API, normalize it, and print the rows
//! as JSON or as a table. Configuration comes from `~/.config/mesonet/config.json` and the
//! environment; command-line flags win over both.

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use mesonet_ingest::config::IngestConfig;
use mesonet_ingest::{ingest, HttpTransport, IngestRequest, NormalizeOptions, SchemaCatalog, TableProfile};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} --table <name> [--schema <at_schema.json>] [--config <config.json>] [--fields a,b] [--formula <F>]\n  {program}          [--required a,b] [--extra a,b] [--with-record] [--format json|table] [--out <file>] [--check-token]\n\nFlags:\n  -t, --table <name>     Logical table name, short name, or table id from the schema file\n  --schema <path>        Schema descriptor (default from config, else ~/.config/mesonet/at_schema.json)\n  --config <path>        Config file (default ~/.config/mesonet/config.json)\n  --fields a,b           Fields to request (default: all, or the built-in table's list)\n  --formula <F>          Server-side filter formula\n  --required a,b         Required output columns; disables the built-in table profile\n  --extra a,b            Fields kept in the extra bag (stations: additional fields to fetch)\n  --with-record          Add the remote record id as field 'record'\n  --format json|table    Output format (default json)\n  --out <path>           Write output to a file (default: <data_dir>/<table>.json|txt when\n                         data_dir is configured, else stdout)\n  --check-token          Verify the API token before fetching\n  -h, --help             Show this help\n\nBuilt-in tables: stations, elements, deployments, model_elements\nToken: MESONET_AIRTABLE_TOKEN or AIRTABLE_API_KEY"
    );
}

#[derive(Default)]
struct Args {
    table: Option<String>,
    schema: Option<PathBuf>,
    config: Option<PathBuf>,
    fields: Option<Vec<String>>,
    formula: Option<String>,
    required: Option<Vec<String>>,
    extra: Option<Vec<String>>,
    with_record: bool,
    table_format: bool,
    out: Option<PathBuf>,
    check_token: bool,
}

fn split_list(v: &str) -> Vec<String> {
    v.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()).map(|s| s.to_string()).collect()
}

fn parse_args(program: &str, mut args: Vec<String>) -> Result<Args> {
    let mut out = Args::default();
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].clone();
        let mut value = || -> Result<String> {
            if i + 1 >= args.len() { return Err(anyhow!("{} requires a value", flag)); }
            i += 1;
            Ok(std::mem::take(&mut args[i]))
        };
        match flag.as_str() {
            "-t" | "--table" => out.table = Some(value()?),
            "--schema" => out.schema = Some(PathBuf::from(value()?)),
            "--config" => out.config = Some(PathBuf::from(value()?)),
            "--fields" => out.fields = Some(split_list(&value()?)),
            "--formula" => out.formula = Some(value()?),
            "--required" => out.required = Some(split_list(&value()?)),
            "--extra" => out.extra = Some(split_list(&value()?)),
            "--with-record" => out.with_record = true,
            "--format" => {
                out.table_format = match value()?.as_str() {
                    "json" => false,
                    "table" => true,
                    other => return Err(anyhow!("unknown format '{}'", other)),
                }
            }
            "--out" | "-o" => out.out = Some(PathBuf::from(value()?)),
            "--check-token" => out.check_token = true,
            "-h" | "--help" => { print_usage(program); std::process::exit(0); }
            other => return Err(anyhow!("unknown argument '{}'", other)),
        }
        i += 1;
    }
    Ok(out)
}

const RECORD_FIELD: &str = "record";

fn build_request(args: &Args, catalog: &SchemaCatalog, table: &str) -> IngestRequest {
    let profile = match &args.required {
        Some(_) => None,
        // the caller may name the table by any synonym; profiles are keyed by logical name
        None => match catalog.alias(table) {
            Ok(alias) => TableProfile::for_alias(alias, args.extra.clone()),
            Err(_) => TableProfile::builtin(table, args.extra.clone()),
        },
    };
    let mut req = match profile {
        Some(p) => {
            let mut r = p.into_request(args.formula.clone());
            r.table = table.to_string();
            r
        }
        None => {
            let mut opts = NormalizeOptions::new(args.required.clone().unwrap_or_default());
            if let Some(extra) = &args.extra {
                opts = opts.with_extra_allow(extra.clone());
            }
            IngestRequest { table: table.to_string(), fields: None, formula: args.formula.clone(), normalize: opts }
        }
    };
    if let Some(f) = &args.fields {
        req.fields = Some(f.clone());
    }
    if args.with_record {
        req.normalize.record_id_field = Some(RECORD_FIELD.to_string());
        if let Some(allow) = req.normalize.extra_allow.as_mut() {
            if !allow.iter().any(|a| a == RECORD_FIELD) {
                allow.push(RECORD_FIELD.to_string());
            }
        }
    }
    req
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut argv: Vec<String> = env::args().collect();
    let program = argv.remove(0);
    let args = match parse_args(&program, argv) {
        Ok(a) => a,
        Err(e) => { eprintln!("{e}"); print_usage(&program); std::process::exit(2); }
    };
    let Some(table) = args.table.clone() else {
        eprintln!("--table is required");
        print_usage(&program);
        std::process::exit(2);
    };

    let cfg_path = args.config.clone().unwrap_or_else(IngestConfig::default_path);
    let mut cfg = IngestConfig::load_or_default(&cfg_path)?;
    cfg.apply_env()?;
    if let Some(s) = &args.schema {
        cfg.schema_file = s.clone();
    }
    let token = cfg.require_token()?.to_string();

    let catalog = SchemaCatalog::load(&cfg.schema_file)?;
    let transport = HttpTransport::new(cfg.timeout()).context("building HTTP client")?;

    if args.check_token && !transport.check_token(catalog.api_base_url(), &token).await? {
        return Err(anyhow!("API token was rejected; update {} and retry", mesonet_ingest::config::ENV_TOKEN));
    }

    let req = build_request(&args, &catalog, &table);
    info!(target: "mesonet_ingest", "ingesting table='{}' schema='{}'", table, cfg.schema_file.display());
    let rows = ingest(&catalog, &transport, &token, &req).await?;

    let rendered = if args.table_format {
        format!("{}", rows.to_dataframe().context("building table view")?)
    } else {
        serde_json::to_string_pretty(&rows)?
    };
    let ext = if args.table_format { "txt" } else { "json" };
    match args.out.clone().or_else(|| cfg.output_path(&table, ext)) {
        Some(p) => {
            if let Some(dir) = p.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
            }
            std::fs::write(&p, rendered).with_context(|| format!("writing {}", p.display()))?;
            info!(target: "mesonet_ingest", "wrote {} rows to '{}'", rows.len(), p.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
