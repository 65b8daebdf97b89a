// Command-line driver: load a service definition (and optionally its docs
// model and a generator config), then regenerate client code for all or a
// subset of its operations.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Parser;

use service_codegen::{
    config::GeneratorConfig,
    definition::{JsonServiceDefinition, ServiceDefinition},
    files::FsFileWriter,
    Generator,
};

#[derive(Parser, Debug)]
#[clap(name = "codegen", version, about = "Generate a service client library from a service definition")]
struct Opt {
    /// service definition JSON file
    #[clap(short, long)]
    input: PathBuf,

    /// split documentation model JSON file
    #[clap(long)]
    docs: Option<PathBuf>,

    /// generator configuration TOML file
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// output directory, overriding the configured one
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// generate only the named operations (defaults to all)
    #[clap(long = "operation")]
    operations: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let opt = Opt::parse();

    let json = std::fs::read_to_string(&opt.input)
        .with_context(|| format!("reading service definition at {}", opt.input.display()))?;
    let mut def = JsonServiceDefinition::from_json(&json)?;
    if let Some(path) = &opt.docs {
        let docs = std::fs::read_to_string(path)
            .with_context(|| format!("reading docs model at {}", path.display()))?;
        def = def.with_docs(&docs)?;
    }

    let mut config = match &opt.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading config at {}", path.display()))?;
            GeneratorConfig::from_str(&content)?
        }
        None => GeneratorConfig::new(def.endpoint_prefix().unwrap_or("service")),
    };
    if let Some(output) = &opt.output {
        config.output_dir = output.clone();
    }

    let names: Vec<String> = if opt.operations.is_empty() {
        def.operations.keys().cloned().collect()
    } else {
        opt.operations.clone()
    };
    let names: Vec<&str> = names.iter().map(|s| s.as_str()).collect();

    let mut files = FsFileWriter::new(config.output_dir.clone());
    let generator = Generator::new(&def, config);
    generator.generate_operations(&names, &mut files)?;
    tracing::info!(operations = names.len(), "generation complete");
    Ok(())
}
