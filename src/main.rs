use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use docgen::{
    generate_document, import_clients_csv, seed_if_absent, AppConfig, DocumentPublisher,
    FsTemplateSource, GenerationRequest, RecordStore, SeedData,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docgen=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let config = AppConfig::load()?;

    match args.get(1).map(String::as_str) {
        Some("setup") => run_setup(&config),
        Some("seed") => run_seed(&config, args.get(2).map(Path::new)),
        Some("import-clients") => {
            let csv = args.get(2).context("usage: docgen import-clients <file.csv>")?;
            run_import(&config, Path::new(csv))
        }
        Some("show") => run_show(&config),
        Some("generate") => {
            if args.len() < 4 {
                bail!("usage: docgen generate <client> <business-type> [KEY=VALUE ...]");
            }
            run_generate(&config, &args[2], &args[3], &args[4..])
        }
        Some("history") => {
            let client = args.get(2).context("usage: docgen history <client>")?;
            run_history(&config, client)
        }
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    println!("docgen {} - client document generation", docgen::VERSION);
    println!();
    println!("USAGE:");
    println!("  docgen setup                                   create the database");
    println!("  docgen seed [seed.json]                        insert sample (or file) records if absent");
    println!("  docgen import-clients <file.csv>               upsert clients from CSV");
    println!("  docgen show                                    list clients, business types, templates");
    println!("  docgen generate <client> <business> [K=V ...]  render a document");
    println!("  docgen history <client>                        list generation events");
}

fn open_store(config: &AppConfig) -> Result<RecordStore> {
    RecordStore::open(&config.database_path)
        .with_context(|| format!("Failed to open database {:?}", config.database_path))
}

fn run_setup(config: &AppConfig) -> Result<()> {
    println!("🔧 Setting up database...");
    open_store(config)?;
    println!("✓ Database ready: {:?}", config.database_path);
    Ok(())
}

fn run_seed(config: &AppConfig, file: Option<&Path>) -> Result<()> {
    let data = match file {
        Some(path) => {
            println!("📂 Loading seed file {:?}...", path);
            SeedData::from_file(path)?
        }
        None => SeedData::sample(),
    };

    let mut store = open_store(config)?;
    let report = seed_if_absent(&mut store, &data).context("Seeding failed; nothing was written")?;

    println!("✓ Added: {} records", report.added);
    println!("👉 Already present (skipped): {} records", report.skipped);
    Ok(())
}

fn run_import(config: &AppConfig, csv: &Path) -> Result<()> {
    println!("📂 Importing clients from {:?}...", csv);
    let mut store = open_store(config)?;
    let count = import_clients_csv(&mut store, csv)?;
    println!("✓ Upserted {} clients", count);
    Ok(())
}

fn run_show(config: &AppConfig) -> Result<()> {
    let store = open_store(config)?;

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🏢 Clients");
    for client in store.list_clients()? {
        println!(
            "  {} ({}) - {} - rep: {}",
            client.name, client.unified_number, client.current_address, client.legal_rep
        );
    }

    println!("\n📋 Business types");
    for req in store.list_business_requirements()? {
        println!("  {}: {}", req.business_name, req.required_docs.join(", "));
        if !req.notes.is_empty() {
            println!("    note: {}", req.notes);
        }
    }

    println!("\n🔖 Templates");
    for template_id in store.list_template_ids()? {
        let catalog = store.find_placeholder_catalog(&template_id)?;
        println!("  {} ({} placeholders)", template_id, catalog.len());
        for entry in catalog.entries() {
            println!("    -> {:<20} from {}", entry.placeholder(), entry.source());
        }
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    Ok(())
}

fn parse_inputs(pairs: &[String]) -> Result<HashMap<String, String>> {
    pairs
        .iter()
        .map(|pair| -> Result<(String, String)> {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("input must look like KEY=VALUE, got {:?}", pair))?;
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}

fn run_generate(config: &AppConfig, client: &str, business: &str, pairs: &[String]) -> Result<()> {
    println!("📝 Generating {} document for {}...", business, client);

    let store = open_store(config)?;
    let templates = FsTemplateSource::new(&config.templates_dir);
    let publisher = DocumentPublisher::new(&config.clients_dir);

    let mut request = GenerationRequest::new(client, business);
    request.user_input = parse_inputs(pairs)?;

    let result = match generate_document(&store, &templates, &publisher, &request) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("❌ Document generation failed: {}", e);
            std::process::exit(1);
        }
    };

    for key in &result.missing_inputs {
        println!("⚠️  Missing input {} - marked in the document for review", key);
    }
    for token in &result.unmatched_placeholders {
        println!("⚠️  Placeholder {} does not appear in template {}", token, result.template_id);
    }
    if !result.required_documents.is_empty() {
        println!("📋 Also required for {}: {}", business, result.required_documents.join(", "));
    }
    println!("✅ Document saved to: {}", result.output_path.display());

    Ok(())
}

fn run_history(config: &AppConfig, client: &str) -> Result<()> {
    let store = open_store(config)?;
    let events = store.events_for("client", client)?;

    if events.is_empty() {
        println!("No events for {}", client);
    }
    for event in events {
        println!(
            "{}  {}  {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.event_type,
            event.data
        );
    }

    Ok(())
}
