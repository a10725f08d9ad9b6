use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::PermissionCatalog;
use crate::database::models::Authority;
use crate::database::repository::StoreError;
use crate::database::store::GraphStore;

#[derive(Debug, Error)]
pub enum RegistrarError {
    #[error("authority registration did not finish within {0:?}")]
    Timeout(Duration),
    #[error("authority registration failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrarReport {
    pub discovered: usize,
    pub inserted: usize,
}

/// Seeds one Authority row per registrable catalog entry. Runs once before
/// the listener binds; callers treat any error as fatal.
pub struct AuthorityRegistrar {
    store: Arc<dyn GraphStore>,
    catalog: Arc<PermissionCatalog>,
    service_name: String,
    timeout: Duration,
}

impl AuthorityRegistrar {
    pub fn new(
        store: Arc<dyn GraphStore>,
        catalog: Arc<PermissionCatalog>,
        service_name: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            catalog,
            service_name: service_name.into(),
            timeout,
        }
    }

    pub async fn run(&self) -> Result<RegistrarReport, RegistrarError> {
        tokio::time::timeout(self.timeout, self.register())
            .await
            .map_err(|_| RegistrarError::Timeout(self.timeout))?
    }

    async fn register(&self) -> Result<RegistrarReport, RegistrarError> {
        let existing = self.store.authority_keys().await?;

        let missing: Vec<Authority> = self
            .catalog
            .registrable()
            .iter()
            .filter(|required| !existing.contains(&(required.resource.clone(), required.action.clone())))
            .map(|required| {
                debug!("Registering authority {} {}", required.name, required.method_label);
                Authority::from_requirement(required, &self.service_name)
            })
            .collect();

        let inserted = if missing.is_empty() {
            0
        } else {
            self.store.insert_authorities(missing).await?
        };

        let report = RegistrarReport {
            discovered: self.catalog.registrable().len(),
            inserted,
        };
        info!(
            "Authority registration complete: {} discovered, {} inserted",
            report.discovered, report.inserted
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::faulty::{Fault, FaultyStore};
    use crate::database::MemoryStore;

    fn registrar(store: Arc<dyn GraphStore>, timeout: Duration) -> AuthorityRegistrar {
        let catalog = crate::api::catalog(&AppConfig::development());
        AuthorityRegistrar::new(store, Arc::new(catalog), "auth", timeout)
    }

    #[tokio::test]
    async fn second_run_inserts_nothing() {
        let store: Arc<dyn GraphStore> = Arc::new(MemoryStore::new());
        let registrar = registrar(store.clone(), Duration::from_secs(5));

        let first = registrar.run().await.unwrap();
        assert!(first.discovered > 0);
        assert_eq!(first.inserted, first.discovered);

        let second = registrar.run().await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(store.authority_keys().await.unwrap().len(), first.discovered);
    }

    #[tokio::test]
    async fn exempt_routes_are_not_registered() {
        let store: Arc<dyn GraphStore> = Arc::new(MemoryStore::new());
        registrar(store.clone(), Duration::from_secs(5)).run().await.unwrap();

        let keys = store.authority_keys().await.unwrap();
        assert!(keys.contains(&("Role".to_string(), "assignAuthorities".to_string())));
        assert!(!keys.contains(&("Authority".to_string(), "getAuthorities".to_string())));
        assert!(!keys.iter().any(|(_, action)| action == "userInfo"));
    }

    #[tokio::test]
    async fn hung_scan_fails_with_timeout() {
        let store: Arc<dyn GraphStore> = Arc::new(FaultyStore::new(Fault::Hang));
        let err = registrar(store, Duration::from_millis(50)).run().await.unwrap_err();
        assert!(matches!(err, RegistrarError::Timeout(d) if d == Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn store_failure_is_reported() {
        let store: Arc<dyn GraphStore> = Arc::new(FaultyStore::new(Fault::FailInsert));
        let err = registrar(store.clone(), Duration::from_secs(5)).run().await.unwrap_err();
        assert!(matches!(err, RegistrarError::Store(StoreError::Unexpected(_))));
        assert!(store.authority_keys().await.unwrap().is_empty());
    }
}
