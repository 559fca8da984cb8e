// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (admin flag lookup)
//! - Subscription pricing (singleton config document, merge-written)

use crate::db::memory::MemoryStore;
use crate::db::{collections, PRICING_CONFIG_DOC_ID};
use crate::error::AppError;
use crate::models::{PricingConfig, PricingUpdateRequest, UserRecord};
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use firestore::FirestoreTransformServerValue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Field mask for pricing writes. Fields outside the mask are left untouched.
const PRICING_MERGE_FIELDS: [&str; 3] = ["monthlyPrice", "yearlyPrice", "currency"];

/// Set by Firestore to the commit time of each pricing write.
const LAST_UPDATED_FIELD: &str = "lastUpdated";

/// Masked fields of a pricing write. `lastUpdated` is a server transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PricingConfigWrite {
    monthly_price: f64,
    yearly_price: f64,
    currency: String,
}

impl From<&PricingUpdateRequest> for PricingConfigWrite {
    fn from(update: &PricingUpdateRequest) -> Self {
        Self {
            monthly_price: update.monthly_price,
            yearly_price: update.yearly_price,
            currency: update.currency.clone(),
        }
    }
}

#[derive(Clone)]
enum Backend {
    Firestore(firestore::FirestoreDb),
    Memory(Arc<MemoryStore>),
    Offline,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    backend: Backend,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a store backed by process memory (local development and tests).
    pub fn new_in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::new())),
        }
    }

    /// Create a client with no backend (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_offline() -> Self {
        Self {
            backend: Backend::Offline,
        }
    }

    fn offline() -> AppError {
        AppError::Database("Database not connected (offline mode)".to_string())
    }

    /// The underlying Firestore client, when this store is backed by one.
    pub fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        match &self.backend {
            Backend::Firestore(client) => Ok(client),
            Backend::Memory(_) => Err(AppError::Database(
                "In-memory store has no Firestore client".to_string(),
            )),
            Backend::Offline => Err(Self::offline()),
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user record by Firebase uid.
    pub async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collections::USERS)
                .obj()
                .one(uid)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => store
                .get(collections::USERS, uid)
                .map(|doc| serde_json::from_value(Value::Object(doc)))
                .transpose()
                .map_err(|e| AppError::Database(format!("Malformed user record: {}", e))),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Set the admin flag on a user record, leaving other profile fields alone.
    pub async fn upsert_user(&self, uid: &str, user: &UserRecord) -> Result<(), AppError> {
        let mut fields = Map::new();
        fields.insert("isAdmin".to_string(), Value::Bool(user.is_admin));
        self.merge_document(collections::USERS, uid, fields).await
    }

    // ─── Subscription Pricing Operations ─────────────────────────

    /// Merge-write validated prices into the singleton pricing document.
    ///
    /// On Firestore, `lastUpdated` is the server's request time, applied as
    /// a field transform in the same commit. The in-memory store stamps the
    /// local clock. Returns the time recorded.
    pub async fn merge_pricing_config(
        &self,
        update: &PricingUpdateRequest,
    ) -> Result<DateTime<Utc>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let doc = PricingConfigWrite::from(update);

                // Object updates only carry transforms through a batch or
                // transaction, so commit the single write as a transaction.
                let mut transaction = client.begin_transaction().await.map_err(|e| {
                    AppError::Database(format!("Failed to begin transaction: {}", e))
                })?;

                client
                    .fluent()
                    .update()
                    .fields(PRICING_MERGE_FIELDS)
                    .in_col(collections::SUBSCRIPTION_PRICING)
                    .document_id(PRICING_CONFIG_DOC_ID)
                    .object(&doc)
                    .transforms(|t| {
                        t.fields([t
                            .field(LAST_UPDATED_FIELD)
                            .server_value(FirestoreTransformServerValue::RequestTime)])
                    })
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!("Failed to add pricing write: {}", e))
                    })?;

                let response = transaction
                    .commit()
                    .await
                    .map_err(|e| AppError::Database(format!("Pricing commit failed: {}", e)))?;

                Ok(response.commit_time.unwrap_or_else(Utc::now))
            }
            Backend::Memory(store) => {
                let now = Utc::now();
                let mut fields = update.to_fields();
                fields.insert(
                    LAST_UPDATED_FIELD.to_string(),
                    Value::String(format_utc_rfc3339(now)),
                );
                store.merge(
                    collections::SUBSCRIPTION_PRICING,
                    PRICING_CONFIG_DOC_ID,
                    fields,
                );
                Ok(now)
            }
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Read the singleton pricing document.
    pub async fn get_pricing_config(&self) -> Result<Option<PricingConfig>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collections::SUBSCRIPTION_PRICING)
                .obj()
                .one(PRICING_CONFIG_DOC_ID)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => store
                .get(collections::SUBSCRIPTION_PRICING, PRICING_CONFIG_DOC_ID)
                .map(|doc| serde_json::from_value(Value::Object(doc)))
                .transpose()
                .map_err(|e| AppError::Database(format!("Malformed pricing config: {}", e))),
            Backend::Offline => Err(Self::offline()),
        }
    }

    // ─── Raw Document Helpers ────────────────────────────────────

    /// Read any document as untyped JSON.
    pub async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Value>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collection)
                .obj::<Value>()
                .one(id)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => Ok(store.get(collection, id).map(Value::Object)),
            Backend::Offline => Err(Self::offline()),
        }
    }

    /// Merge arbitrary fields into a document, creating it if needed.
    pub async fn merge_document(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let mask: Vec<String> = fields.keys().cloned().collect();
                let _: () = client
                    .fluent()
                    .update()
                    .fields(mask)
                    .in_col(collection)
                    .document_id(id)
                    .object(&Value::Object(fields))
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
            Backend::Memory(store) => {
                store.merge(collection, id, fields);
                Ok(())
            }
            Backend::Offline => Err(Self::offline()),
        }
    }
}
