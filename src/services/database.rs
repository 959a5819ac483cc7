//! Persistence layer.
//!
//! The flow talks to three narrow store traits so it can run against an
//! in-memory implementation in tests; the production implementation is a
//! thin wrapper over the platform's MongoDB document store.

use async_trait::async_trait;
use mongodb::{
    bson::doc,
    options::{ClientOptions, IndexOptions, ReplaceOptions},
    Client, Collection, Database, IndexModel,
};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::AppError;
use crate::models::{Grant, Identity, Tenant};

#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<Tenant>, AppError>;
    async fn save_tenant(&self, tenant: &Tenant) -> Result<(), AppError>;
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, AppError>;
    /// Insert or overwrite by id.
    async fn save_identity(&self, identity: &Identity) -> Result<(), AppError>;
}

#[async_trait]
pub trait GrantStore: Send + Sync {
    async fn find_grant(
        &self,
        tenant_id: &str,
        identity_id: &str,
    ) -> Result<Option<Grant>, AppError>;
    /// Insert or overwrite by composite id (last write wins by design).
    async fn save_grant(&self, grant: &Grant) -> Result<(), AppError>;
}

/// MongoDB wrapper with typed collection accessors.
#[derive(Clone)]
pub struct MongoDb {
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;
        Ok(Self { db: client.database(database) })
    }

    pub fn identities(&self) -> Collection<Identity> {
        self.db.collection("identities")
    }

    pub fn tenants(&self) -> Collection<Tenant> {
        self.db.collection("tenants")
    }

    pub fn grants(&self) -> Collection<Grant> {
        self.db.collection("grants")
    }

    /// Create the unique indexes the flow relies on.
    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        let unique = |keys| {
            IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build()
        };
        self.identities()
            .create_index(unique(doc! { "username": 1 }), None)
            .await?;
        self.tenants()
            .create_index(unique(doc! { "name": 1 }), None)
            .await?;
        self.grants()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "tenant_id": 1, "identity_id": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }
}

#[async_trait]
impl TenantStore for MongoDb {
    async fn find_by_name(&self, name: &str) -> Result<Option<Tenant>, AppError> {
        Ok(self.tenants().find_one(doc! { "name": name }, None).await?)
    }

    async fn save_tenant(&self, tenant: &Tenant) -> Result<(), AppError> {
        self.tenants()
            .replace_one(
                doc! { "_id": &tenant.id },
                tenant,
                ReplaceOptions::builder().upsert(true).build(),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for MongoDb {
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, AppError> {
        Ok(self
            .identities()
            .find_one(doc! { "username": username }, None)
            .await?)
    }

    async fn save_identity(&self, identity: &Identity) -> Result<(), AppError> {
        self.identities()
            .replace_one(
                doc! { "_id": &identity.id },
                identity,
                ReplaceOptions::builder().upsert(true).build(),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl GrantStore for MongoDb {
    async fn find_grant(
        &self,
        tenant_id: &str,
        identity_id: &str,
    ) -> Result<Option<Grant>, AppError> {
        Ok(self
            .grants()
            .find_one(
                doc! { "tenant_id": tenant_id, "identity_id": identity_id },
                None,
            )
            .await?)
    }

    async fn save_grant(&self, grant: &Grant) -> Result<(), AppError> {
        self.grants()
            .replace_one(
                doc! { "_id": &grant.id },
                grant,
                ReplaceOptions::builder().upsert(true).build(),
            )
            .await?;
        Ok(())
    }
}

/// In-memory store for tests and local experimentation.
#[derive(Default)]
pub struct MemoryStore {
    tenants: Mutex<HashMap<String, Tenant>>,
    identities: Mutex<HashMap<String, Identity>>,
    grants: Mutex<HashMap<String, Grant>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<Tenant>, AppError> {
        Ok(self
            .tenants
            .lock()
            .unwrap()
            .values()
            .find(|t| t.name == name)
            .cloned())
    }

    async fn save_tenant(&self, tenant: &Tenant) -> Result<(), AppError> {
        self.tenants
            .lock()
            .unwrap()
            .insert(tenant.id.clone(), tenant.clone());
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, AppError> {
        Ok(self
            .identities
            .lock()
            .unwrap()
            .values()
            .find(|i| i.username == username)
            .cloned())
    }

    async fn save_identity(&self, identity: &Identity) -> Result<(), AppError> {
        self.identities
            .lock()
            .unwrap()
            .insert(identity.id.clone(), identity.clone());
        Ok(())
    }
}

#[async_trait]
impl GrantStore for MemoryStore {
    async fn find_grant(
        &self,
        tenant_id: &str,
        identity_id: &str,
    ) -> Result<Option<Grant>, AppError> {
        Ok(self
            .grants
            .lock()
            .unwrap()
            .get(&Grant::composite_id(tenant_id, identity_id))
            .cloned())
    }

    async fn save_grant(&self, grant: &Grant) -> Result<(), AppError> {
        self.grants
            .lock()
            .unwrap()
            .insert(grant.id.clone(), grant.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_grant_overwrites_by_composite_id() {
        let store = MemoryStore::new();
        store
            .save_grant(&Grant::new("t", "i", "resource.read".to_string()))
            .await
            .unwrap();
        store
            .save_grant(&Grant::new("t", "i", "resource.write".to_string()))
            .await
            .unwrap();

        let grant = store.find_grant("t", "i").await.unwrap().unwrap();
        assert_eq!(grant.approved_scopes, "resource.write");
        assert_eq!(store.grants.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn memory_store_identity_lookup_is_case_sensitive() {
        let store = MemoryStore::new();
        let identity = Identity::new_pending(
            &crate::models::NewIdentity {
                username: "John".to_string(),
                password: "p".to_string(),
                email: "j@example.com".to_string(),
                phone: "1".to_string(),
                birth_date: chrono::NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            },
            "hash".to_string(),
            "123456".to_string(),
            chrono::Utc::now(),
        );
        store.save_identity(&identity).await.unwrap();

        assert!(store.find_by_username("John").await.unwrap().is_some());
        assert!(store.find_by_username("john").await.unwrap().is_none());
    }
}
