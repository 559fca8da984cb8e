//! Database layer (Firestore).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

/// Collection names as constants.
pub mod collections {
    /// User profiles, keyed by Firebase uid
    pub const USERS: &str = "users";
    pub const SUBSCRIPTION_PRICING: &str = "subscription_pricing";
}

/// Document ID of the singleton pricing record.
pub const PRICING_CONFIG_DOC_ID: &str = "config";
