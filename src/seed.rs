// 🌱 Seed Data - sample records, JSON seed files, CSV client import
//
// Seeding only inserts what is absent (matching on each record's natural
// key) so operator edits survive a re-seed. The whole batch is one
// transaction.

use crate::db::{
    find_business_requirement, find_client_by_unified_number, get_placeholder_mappings,
    insert_event, upsert_record, Event, Record, RecordStore,
};
use crate::entities::{BusinessRequirement, Client, PlaceholderMapping};
use crate::error::StoreError;
use crate::template::DEFAULT_TEMPLATE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

const SEED_ACTOR: &str = "seeder";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub clients: Vec<Client>,

    #[serde(default)]
    pub business_requirements: Vec<BusinessRequirement>,

    #[serde(default)]
    pub placeholder_mappings: Vec<PlaceholderMapping>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub added: usize,
    pub skipped: usize,
}

impl SeedData {
    /// The address-change example: one client, one business type and the
    /// four placeholders of the change registration form.
    pub fn sample() -> Self {
        SeedData {
            clients: vec![Client::new("A Tech Co", "12345678", "100 Main Rd", "Wang")],
            business_requirements: vec![BusinessRequirement::new("Address Change")
                .with_doc("Change Registration Form")
                .with_doc("Shareholder Meeting Minutes / Board Minutes")
                .with_doc("Power of Attorney")
                .with_notes("Fill in both the old and the new address; confirm the meeting date.")],
            placeholder_mappings: vec![
                PlaceholderMapping::new(DEFAULT_TEMPLATE, "<<COMPANY_NAME>>", "ClientField.name"),
                PlaceholderMapping::new(DEFAULT_TEMPLATE, "<<OLD_ADDRESS>>", "ClientField.current_address"),
                PlaceholderMapping::new(DEFAULT_TEMPLATE, "<<NEW_ADDRESS>>", "UserInput.new_address"),
                PlaceholderMapping::new(DEFAULT_TEMPLATE, "<<LEGAL_REP>>", "ClientField.legal_rep"),
            ],
        }
    }

    /// Load seed data from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read seed file: {:?}", path.as_ref()))?;

        let data: SeedData =
            serde_json::from_str(&content).context("Failed to parse seed JSON")?;

        Ok(data)
    }

    pub fn records(&self) -> Vec<Record> {
        self.clients
            .iter()
            .cloned()
            .map(Record::Client)
            .chain(self.business_requirements.iter().cloned().map(Record::BusinessRequirement))
            .chain(self.placeholder_mappings.iter().cloned().map(Record::PlaceholderMapping))
            .collect()
    }
}

fn exists(conn: &rusqlite::Connection, record: &Record) -> Result<bool, StoreError> {
    Ok(match record {
        Record::Client(c) => find_client_by_unified_number(conn, &c.unified_number)?.is_some(),
        Record::BusinessRequirement(r) => find_business_requirement(conn, &r.business_name)?.is_some(),
        Record::PlaceholderMapping(m) => get_placeholder_mappings(conn, &m.template_id)?
            .iter()
            .any(|existing| existing.placeholder == m.placeholder),
    })
}

/// Insert every record whose natural key is not yet present
pub fn seed_if_absent(store: &mut RecordStore, data: &SeedData) -> Result<SeedReport, StoreError> {
    let records = data.records();

    store.in_transaction(|conn| {
        let mut report = SeedReport::default();

        for record in &records {
            if exists(conn, record)? {
                debug!(?record, "seed record already present");
                report.skipped += 1;
            } else {
                upsert_record(conn, record)?;
                report.added += 1;
            }
        }

        if report.added > 0 {
            insert_event(
                conn,
                &Event::new(
                    "records_seeded",
                    "store",
                    "seed",
                    serde_json::json!({ "added": report.added, "skipped": report.skipped }),
                    SEED_ACTOR,
                ),
            )?;
        }

        Ok(report)
    })
}

// ============================================================================
// CSV IMPORT
// ============================================================================

/// Read clients from a CSV file with headers
/// `name,unified_number,current_address,legal_rep`
pub fn load_clients_csv(csv_path: &Path) -> Result<Vec<Client>> {
    let mut rdr = csv::Reader::from_path(csv_path).context("Failed to open CSV file")?;

    let mut clients = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let client: Client =
            result.with_context(|| format!("Failed to deserialize client on row {}", line + 1))?;
        clients.push(client);
    }

    Ok(clients)
}

/// Upsert all clients of a CSV file in one transaction
pub fn import_clients_csv(store: &mut RecordStore, csv_path: &Path) -> Result<usize> {
    let clients = load_clients_csv(csv_path)?;
    let records: Vec<Record> = clients.into_iter().map(Record::Client).collect();

    let written = store
        .upsert_all(&records)
        .with_context(|| format!("Failed to import clients from {:?}", csv_path))?;

    store.record_event(&Event::new(
        "clients_imported",
        "store",
        &csv_path.display().to_string(),
        serde_json::json!({ "count": written }),
        SEED_ACTOR,
    ))?;

    Ok(written)
}
