//! Command-line front end for validating and inserting features.
//!
//! ```bash
//! # Check a record against the registry
//! wfst_ingest --config ingest.toml validate --layer 12 --input record.json
//!
//! # Print the transaction, or send it with --submit
//! GEOSERVER_URL=https://maps.example.com/geoserver wfst_ingest insert --layer 12 --input - --submit
//!
//! # Print the view SQL or the GeoServer featureType document
//! wfst_ingest view --layer 12 --format feature-type
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::PathBuf;
use wfst_ingest::{
    HttpTransmission, IngestConfig, IngestRequest, Ingestor, SchemaLookup, SqlDialect,
    SqliteSchemaLookup, WfsVersion, build_view_sql, master_feature_type_xml, validate,
    virtual_view_feature_type_xml,
};

#[derive(Parser)]
#[command(name = "wfst_ingest")]
#[command(about = "Validate features against a layer registry and insert them through WFS-T")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite layer registry (overrides the configuration)
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a request body against its layer schema
    Validate {
        #[arg(long)]
        layer: i64,

        /// Request body with `data` and `geom` members, `-` for stdin
        #[arg(long, default_value = "-")]
        input: String,
    },
    /// Build the insert transaction for a request body
    Insert {
        #[arg(long)]
        layer: i64,

        /// Request body with `data` and `geom` members, `-` for stdin
        #[arg(long, default_value = "-")]
        input: String,

        /// Send the transaction instead of printing it
        #[arg(long)]
        submit: bool,

        #[command(flatten)]
        wfs: WfsArgs,
    },
    /// Print the view projection of a layer
    View {
        #[arg(long)]
        layer: i64,

        #[arg(long, value_enum, default_value_t = ViewFormat::Sql)]
        format: ViewFormat,

        #[arg(long, value_enum, default_value_t = DialectArg::Postgres)]
        dialect: DialectArg,
    },
}

#[derive(clap::Args)]
struct WfsArgs {
    /// GeoServer base URL
    #[arg(long, env = "GEOSERVER_URL")]
    wfs_url: Option<String>,

    #[arg(long, env = "GEOSERVER_USER")]
    username: Option<String>,

    #[arg(long, env = "GEOSERVER_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[arg(long, value_enum)]
    wfs_version: Option<VersionArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum VersionArg {
    #[value(name = "1.0.0")]
    V1_0_0,
    #[value(name = "1.1.0")]
    V1_1_0,
}

#[derive(Clone, Copy, ValueEnum)]
enum ViewFormat {
    /// The SELECT backing the virtual view
    Sql,
    /// GeoServer featureType document of the virtual view
    FeatureType,
    /// GeoServer featureType document of the master layer
    Master,
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Postgres,
    Sqlite,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = run() {
        eprintln!("wfst_ingest failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => IngestConfig::from_path(path)?,
        None => IngestConfig::default(),
    };
    if let Some(registry) = cli.registry {
        config.registry.path = registry;
    }
    let lookup = SqliteSchemaLookup::open_read_only(&config.registry.path)?;

    match cli.command {
        Commands::Validate { layer, input } => {
            let request = IngestRequest::from_json_str(layer, &read_input(&input)?)?;
            let schema = lookup.get_layer_schema(layer)?;
            let result = validate(&schema, &request.attributes, &request.geometry);
            if result.is_valid() {
                println!("valid");
            } else {
                for err in &result {
                    println!("{}", err.message);
                }
                return Err(format!("{} validation error(s)", result.len()).into());
            }
        }
        Commands::Insert {
            layer,
            input,
            submit,
            wfs,
        } => {
            wfs.apply(&mut config);
            let request = IngestRequest::from_json_str(layer, &read_input(&input)?)?;
            let transmission = HttpTransmission::new(&config.wfs)?;
            let ingestor = Ingestor::new(lookup, transmission, config.wfs.url.clone())
                .with_version(config.wfs.version);

            if submit {
                let outcome = ingestor.ingest(&request)?;
                println!("{}", outcome.message);
                if !outcome.success {
                    return Err("insert was not confirmed".into());
                }
                if let Some(fid) = outcome.feature_id {
                    println!("feature id: {fid}");
                }
            } else {
                println!("{}", ingestor.prepare(&request)?);
            }
        }
        Commands::View {
            layer,
            format,
            dialect,
        } => {
            let schema = lookup.get_layer_schema(layer)?;
            let output = match format {
                ViewFormat::Sql => {
                    let dialect = match dialect {
                        DialectArg::Postgres => SqlDialect::Postgres,
                        DialectArg::Sqlite => SqlDialect::Sqlite,
                    };
                    build_view_sql(layer, schema.fields(), &config.view, dialect)?
                }
                ViewFormat::FeatureType => virtual_view_feature_type_xml(&schema, &config.view)?,
                ViewFormat::Master => master_feature_type_xml(&schema, &config.view)?,
            };
            println!("{output}");
        }
    }

    Ok(())
}

impl WfsArgs {
    fn apply(self, config: &mut IngestConfig) {
        if let Some(url) = self.wfs_url {
            config.wfs.url = url;
        }
        if self.username.is_some() {
            config.wfs.username = self.username;
        }
        if self.password.is_some() {
            config.wfs.password = self.password;
        }
        match self.wfs_version {
            Some(VersionArg::V1_0_0) => config.wfs.version = WfsVersion::V1_0_0,
            Some(VersionArg::V1_1_0) => config.wfs.version = WfsVersion::V1_1_0,
            None => {}
        }
    }
}

fn read_input(input: &str) -> std::io::Result<String> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        std::fs::read_to_string(input)
    }
}
