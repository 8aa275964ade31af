// 🗄️ Record Store - SQLite-backed lookup and upsert of the three record kinds
//
// Free functions take a `&Connection` so they work both on the store's own
// connection and inside a transaction. `RecordStore` is the handle callers
// pass around; there is no global session.

use crate::entities::{BusinessRequirement, Client, PlaceholderCatalog, PlaceholderMapping};
use crate::error::{CatalogError, StoreError};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

// ============================================================================
// RECORDS
// ============================================================================

/// Any record the store can upsert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Client(Client),
    BusinessRequirement(BusinessRequirement),
    PlaceholderMapping(PlaceholderMapping),
}

/// Event for audit trail (every seed, import and generation leaves one)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS client_index (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL,
            unified_number TEXT UNIQUE NOT NULL,
            current_address TEXT NOT NULL,
            legal_rep TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS doc_type_requirements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            business_name TEXT UNIQUE NOT NULL,
            required_docs_json TEXT NOT NULL DEFAULT '[]',
            notes TEXT NOT NULL DEFAULT ''
        );

        -- One row per placeholder token of a template
        CREATE TABLE IF NOT EXISTS template_variables (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            template_filename TEXT NOT NULL,
            placeholder_key TEXT NOT NULL,
            variable_source TEXT NOT NULL,
            UNIQUE (template_filename, placeholder_key)
        );

        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_template_variables_template
            ON template_variables(template_filename);
        CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id);
        CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);",
    )?;

    Ok(())
}

// ============================================================================
// QUERIES
// ============================================================================

fn client_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Client> {
    Ok(Client {
        name: row.get(0)?,
        unified_number: row.get(1)?,
        current_address: row.get(2)?,
        legal_rep: row.get(3)?,
    })
}

fn requirement_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BusinessRequirement> {
    let docs_json: String = row.get(1)?;
    let required_docs = serde_json::from_str(&docs_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

    Ok(BusinessRequirement {
        business_name: row.get(0)?,
        required_docs,
        notes: row.get(2)?,
    })
}

pub fn find_client_by_name(conn: &Connection, name: &str) -> Result<Option<Client>, StoreError> {
    let client = conn
        .query_row(
            "SELECT name, unified_number, current_address, legal_rep
             FROM client_index WHERE name = ?1",
            [name],
            client_from_row,
        )
        .optional()?;

    Ok(client)
}

pub fn find_client_by_unified_number(
    conn: &Connection,
    unified_number: &str,
) -> Result<Option<Client>, StoreError> {
    let client = conn
        .query_row(
            "SELECT name, unified_number, current_address, legal_rep
             FROM client_index WHERE unified_number = ?1",
            [unified_number],
            client_from_row,
        )
        .optional()?;

    Ok(client)
}

pub fn find_business_requirement(
    conn: &Connection,
    business_name: &str,
) -> Result<Option<BusinessRequirement>, StoreError> {
    let requirement = conn
        .query_row(
            "SELECT business_name, required_docs_json, notes
             FROM doc_type_requirements WHERE business_name = ?1",
            [business_name],
            requirement_from_row,
        )
        .optional()?;

    Ok(requirement)
}

/// Raw mapping rows of a template, in insertion order
pub fn get_placeholder_mappings(
    conn: &Connection,
    template_id: &str,
) -> Result<Vec<PlaceholderMapping>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT template_filename, placeholder_key, variable_source
         FROM template_variables
         WHERE template_filename = ?1
         ORDER BY id",
    )?;

    let mappings = stmt
        .query_map([template_id], |row| {
            Ok(PlaceholderMapping {
                template_id: row.get(0)?,
                placeholder: row.get(1)?,
                source: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(mappings)
}

pub fn find_placeholder_catalog(
    conn: &Connection,
    template_id: &str,
) -> Result<PlaceholderCatalog, StoreError> {
    let mappings = get_placeholder_mappings(conn, template_id)?;
    debug!(template = template_id, count = mappings.len(), "loaded placeholder mappings");
    Ok(PlaceholderCatalog::build(template_id, mappings)?)
}

pub fn list_clients(conn: &Connection) -> Result<Vec<Client>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name, unified_number, current_address, legal_rep
         FROM client_index ORDER BY name",
    )?;

    let clients = stmt
        .query_map([], client_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(clients)
}

pub fn list_business_requirements(
    conn: &Connection,
) -> Result<Vec<BusinessRequirement>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT business_name, required_docs_json, notes
         FROM doc_type_requirements ORDER BY business_name",
    )?;

    let requirements = stmt
        .query_map([], requirement_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(requirements)
}

pub fn list_template_ids(conn: &Connection) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT template_filename FROM template_variables ORDER BY template_filename",
    )?;

    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;

    Ok(ids)
}

// ============================================================================
// UPSERTS
// ============================================================================

fn constraint_error(err: rusqlite::Error, what: String) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(e, msg) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            StoreError::ConstraintViolation(format!(
                "{}: {}",
                what,
                msg.unwrap_or_else(|| e.to_string())
            ))
        }
        other => other.into(),
    }
}

/// Upsert a client keyed by unified number. Renaming a client to a name
/// another client already holds is a constraint violation.
pub fn upsert_client(conn: &Connection, client: &Client) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO client_index (name, unified_number, current_address, legal_rep)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(unified_number) DO UPDATE SET
            name = excluded.name,
            current_address = excluded.current_address,
            legal_rep = excluded.legal_rep",
        params![
            client.name,
            client.unified_number,
            client.current_address,
            client.legal_rep,
        ],
    )
    .map_err(|e| constraint_error(e, format!("client '{}'", client.name)))?;

    Ok(())
}

pub fn upsert_business_requirement(
    conn: &Connection,
    requirement: &BusinessRequirement,
) -> Result<(), StoreError> {
    let docs_json = serde_json::to_string(&requirement.required_docs)?;

    conn.execute(
        "INSERT INTO doc_type_requirements (business_name, required_docs_json, notes)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(business_name) DO UPDATE SET
            required_docs_json = excluded.required_docs_json,
            notes = excluded.notes",
        params![requirement.business_name, docs_json, requirement.notes],
    )
    .map_err(|e| constraint_error(e, format!("business type '{}'", requirement.business_name)))?;

    Ok(())
}

/// Upsert a mapping keyed by (template, placeholder). The source descriptor
/// must parse; a malformed descriptor never reaches the table.
pub fn upsert_placeholder_mapping(
    conn: &Connection,
    mapping: &PlaceholderMapping,
) -> Result<(), StoreError> {
    // a blank token would match everywhere in the template text
    if mapping.placeholder.trim().is_empty() {
        return Err(CatalogError::EmptyPlaceholder {
            template_id: mapping.template_id.clone(),
        }
        .into());
    }
    mapping.parse_source()?;

    conn.execute(
        "INSERT INTO template_variables (template_filename, placeholder_key, variable_source)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(template_filename, placeholder_key) DO UPDATE SET
            variable_source = excluded.variable_source",
        params![mapping.template_id, mapping.placeholder, mapping.source],
    )
    .map_err(|e| {
        constraint_error(
            e,
            format!("placeholder {} of {}", mapping.placeholder, mapping.template_id),
        )
    })?;

    Ok(())
}

pub fn upsert_record(conn: &Connection, record: &Record) -> Result<(), StoreError> {
    match record {
        Record::Client(client) => upsert_client(conn, client),
        Record::BusinessRequirement(req) => upsert_business_requirement(conn, req),
        Record::PlaceholderMapping(mapping) => upsert_placeholder_mapping(conn, mapping),
    }
}

// ============================================================================
// EVENTS
// ============================================================================

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<(), StoreError> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity, newest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp DESC, id DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?
                    .with_timezone(&Utc),
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json)
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

// ============================================================================
// STORE HANDLE
// ============================================================================

pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Open (or create) a file-backed store in WAL mode
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(path = %path.display(), journal_mode = %mode, "opened record store");

        setup_database(&conn)?;
        Ok(RecordStore { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(RecordStore { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside one transaction. Any error rolls everything back, so
    /// readers never see a partial batch.
    pub fn in_transaction<T, F>(&mut self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let tx = self.conn.transaction()?;
        let value = f(&*tx)?;
        tx.commit()?;
        Ok(value)
    }

    pub fn find_client_by_name(&self, name: &str) -> Result<Option<Client>, StoreError> {
        find_client_by_name(&self.conn, name)
    }

    pub fn find_client_by_unified_number(&self, id: &str) -> Result<Option<Client>, StoreError> {
        find_client_by_unified_number(&self.conn, id)
    }

    pub fn find_business_requirement(
        &self,
        name: &str,
    ) -> Result<Option<BusinessRequirement>, StoreError> {
        find_business_requirement(&self.conn, name)
    }

    pub fn find_placeholder_catalog(
        &self,
        template_id: &str,
    ) -> Result<PlaceholderCatalog, StoreError> {
        find_placeholder_catalog(&self.conn, template_id)
    }

    pub fn list_clients(&self) -> Result<Vec<Client>, StoreError> {
        list_clients(&self.conn)
    }

    pub fn list_business_requirements(&self) -> Result<Vec<BusinessRequirement>, StoreError> {
        list_business_requirements(&self.conn)
    }

    pub fn list_template_ids(&self) -> Result<Vec<String>, StoreError> {
        list_template_ids(&self.conn)
    }

    pub fn upsert(&mut self, record: &Record) -> Result<(), StoreError> {
        self.in_transaction(|conn| upsert_record(conn, record))
    }

    /// Upsert a batch atomically; returns the number of records written
    pub fn upsert_all(&mut self, records: &[Record]) -> Result<usize, StoreError> {
        self.in_transaction(|conn| {
            for record in records {
                upsert_record(conn, record)?;
            }
            Ok(records.len())
        })
    }

    pub fn record_event(&self, event: &Event) -> Result<(), StoreError> {
        insert_event(&self.conn, event)
    }

    pub fn events_for(&self, entity_type: &str, entity_id: &str) -> Result<Vec<Event>, StoreError> {
        get_events_for_entity(&self.conn, entity_type, entity_id)
    }
}

// ============================================================================
// TESTS
// ============================================================================
