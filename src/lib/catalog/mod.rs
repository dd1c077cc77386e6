use crate::config::ExportConfig;
use anyhow::Result;
use log::debug;
use std::future::Future;
use std::pin::Pin;

pub mod mysql;

// Catalog is the read-only view of the server that decides what gets exported
pub trait Catalog {
    // raw value of the event_scheduler server variable, if the server reports one
    fn event_scheduler(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, anyhow::Error>> + '_>>;

    // number of information_schema views named LIBRARIES
    fn library_views(&mut self) -> Pin<Box<dyn Future<Output = Result<i64, anyhow::Error>> + '_>>;

    // non-system schema names, ordered ascending
    fn list_databases(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, anyhow::Error>> + '_>>;
}

// Opens the catalog connection described by the config
pub async fn new(config: &ExportConfig) -> Result<Box<dyn Catalog>> {
    let catalog = mysql::MySQLCatalog::new(config).await?;
    Ok(Box::new(catalog))
}

/// Optional dump features the server is known to handle.
///
/// Both flags start out `false`. A probe that errors leaves its flag `false`,
/// so the matching dump option is omitted rather than risking a run the
/// server rejects.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityFlags {
    pub event_scheduler_enabled: bool,
    pub supports_routine_library_catalog: bool,
}

pub async fn detect_capabilities(catalog: &mut dyn Catalog) -> CapabilityFlags {
    let event_scheduler_enabled = or_disabled(
        "event_scheduler",
        catalog
            .event_scheduler()
            .await
            .map(|value| value.is_some_and(|v| v.eq_ignore_ascii_case("on"))),
    );

    let supports_routine_library_catalog = or_disabled(
        "information_schema.LIBRARIES",
        catalog.library_views().await.map(|count| count > 0),
    );

    CapabilityFlags {
        event_scheduler_enabled,
        supports_routine_library_catalog,
    }
}

fn or_disabled(probe: &str, result: Result<bool>) -> bool {
    match result {
        Ok(enabled) => enabled,
        Err(err) => {
            debug!("Capability probe {} failed, treating as off: {:?}", probe, err);
            false
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::bail;

    #[derive(Default)]
    pub(crate) struct StubCatalog {
        pub event_scheduler: Option<Result<Option<String>, String>>,
        pub library_views: Option<Result<i64, String>>,
        pub databases: Vec<String>,
    }

    impl StubCatalog {
        pub(crate) fn with_databases(databases: &[&str]) -> StubCatalog {
            StubCatalog {
                databases: databases.iter().map(|d| d.to_string()).collect(),
                ..StubCatalog::default()
            }
        }

        pub(crate) fn capable(mut self) -> StubCatalog {
            self.event_scheduler = Some(Ok(Some("ON".to_string())));
            self.library_views = Some(Ok(1));
            self
        }
    }

    impl Catalog for StubCatalog {
        fn event_scheduler(
            &mut self,
        ) -> Pin<Box<dyn Future<Output = Result<Option<String>, anyhow::Error>> + '_>> {
            let fut = async move {
                match self.event_scheduler.clone() {
                    Some(Ok(v)) => Ok(v),
                    Some(Err(e)) => bail!(e),
                    None => bail!("event_scheduler not stubbed"),
                }
            };

            Box::pin(fut)
        }

        fn library_views(
            &mut self,
        ) -> Pin<Box<dyn Future<Output = Result<i64, anyhow::Error>> + '_>> {
            let fut = async move {
                match self.library_views.clone() {
                    Some(Ok(v)) => Ok(v),
                    Some(Err(e)) => bail!(e),
                    None => bail!("library_views not stubbed"),
                }
            };

            Box::pin(fut)
        }

        fn list_databases(
            &mut self,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, anyhow::Error>> + '_>> {
            let fut = async move { Ok(self.databases.clone()) };

            Box::pin(fut)
        }
    }

    #[tokio::test]
    async fn test_detect_capabilities_all_on() {
        let mut catalog = StubCatalog::default().capable();
        let flags = detect_capabilities(&mut catalog).await;

        assert!(flags.event_scheduler_enabled);
        assert!(flags.supports_routine_library_catalog);
    }

    #[tokio::test]
    async fn test_event_scheduler_is_case_insensitive() {
        for value in ["on", "On", "ON"] {
            let mut catalog = StubCatalog {
                event_scheduler: Some(Ok(Some(value.to_string()))),
                ..StubCatalog::default()
            };

            assert!(detect_capabilities(&mut catalog).await.event_scheduler_enabled);
        }
    }

    #[tokio::test]
    async fn test_event_scheduler_other_values_are_off() {
        for value in [Some("OFF"), Some("DISABLED"), Some(""), None] {
            let mut catalog = StubCatalog {
                event_scheduler: Some(Ok(value.map(str::to_string))),
                library_views: Some(Ok(1)),
                ..StubCatalog::default()
            };

            let flags = detect_capabilities(&mut catalog).await;
            assert!(!flags.event_scheduler_enabled);
            assert!(flags.supports_routine_library_catalog);
        }
    }

    #[tokio::test]
    async fn test_failed_probes_fall_back_to_off() {
        let mut catalog = StubCatalog {
            event_scheduler: Some(Err("access denied".to_string())),
            library_views: Some(Err("unknown table".to_string())),
            ..StubCatalog::default()
        };

        let flags = detect_capabilities(&mut catalog).await;
        assert_eq!(flags, CapabilityFlags::default());
    }

    #[tokio::test]
    async fn test_zero_library_views_is_off() {
        let mut catalog = StubCatalog {
            event_scheduler: Some(Ok(Some("ON".to_string()))),
            library_views: Some(Ok(0)),
            ..StubCatalog::default()
        };

        let flags = detect_capabilities(&mut catalog).await;
        assert!(flags.event_scheduler_enabled);
        assert!(!flags.supports_routine_library_catalog);
    }
}
