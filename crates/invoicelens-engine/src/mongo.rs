use anyhow::{Context, Result};
use invoicelens_contracts::config::AppConfig;
use invoicelens_contracts::error::ConfigError;
use invoicelens_contracts::interaction::InteractionRecord;
use mongodb::bson::Bson;
use mongodb::sync::{Client, Collection};
use tracing::info;

use crate::{RecordStore, StoredRecord};

/// Appends interaction records to one MongoDB collection.
///
/// The client is created once at startup. `mongodb+srv` URIs are resolved
/// while connecting, so DNS problems surface as configuration errors.
pub struct MongoRecordStore {
    collection: Collection<InteractionRecord>,
    namespace: String,
}

impl MongoRecordStore {
    pub fn connect(config: &AppConfig) -> Result<Self, ConfigError> {
        let client = Client::with_uri_str(&config.mongo_uri)
            .map_err(|err| ConfigError::Database(err.to_string()))?;
        let collection = client
            .database(&config.database)
            .collection::<InteractionRecord>(&config.collection);
        let namespace = namespace(&config.database, &config.collection);
        info!(namespace = %namespace, "record store ready");
        Ok(Self {
            collection,
            namespace,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl RecordStore for MongoRecordStore {
    fn name(&self) -> &str {
        "mongodb"
    }

    fn insert(&self, record: &InteractionRecord) -> Result<StoredRecord> {
        let result = self
            .collection
            .insert_one(record)
            .run()
            .with_context(|| format!("MongoDB insert into {} failed", self.namespace))?;
        Ok(StoredRecord {
            id: inserted_id_text(&result.inserted_id),
        })
    }
}

fn namespace(database: &str, collection: &str) -> String {
    format!("{database}.{collection}")
}

fn inserted_id_text(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(value) => value.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use invoicelens_contracts::config::AppConfig;
    use invoicelens_contracts::error::ConfigError;
    use mongodb::bson::oid::ObjectId;
    use mongodb::bson::Bson;

    use super::{inserted_id_text, namespace, MongoRecordStore};

    #[test]
    fn object_ids_render_as_hex() {
        let oid = ObjectId::new();
        assert_eq!(inserted_id_text(&Bson::ObjectId(oid)), oid.to_hex());
        assert_eq!(inserted_id_text(&Bson::String("rec-1".to_string())), "rec-1");
        assert_eq!(inserted_id_text(&Bson::Int32(7)), "7");
    }

    #[test]
    fn namespace_keeps_collection_spaces() {
        assert_eq!(namespace("invoice", "invoice details"), "invoice.invoice details");
    }

    #[test]
    fn malformed_uri_is_a_configuration_error() {
        let config = AppConfig {
            google_api_key: "key".to_string(),
            mongo_uri: "http://not-a-mongo-uri".to_string(),
            gemini_api_base: "https://gemini.test/v1beta".to_string(),
            gemini_model: "gemini-1.5-flash".to_string(),
            database: "invoice".to_string(),
            collection: "invoice details".to_string(),
        };
        match MongoRecordStore::connect(&config) {
            Err(ConfigError::Database(detail)) => assert!(!detail.is_empty()),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("malformed URI was accepted"),
        }
    }
}
