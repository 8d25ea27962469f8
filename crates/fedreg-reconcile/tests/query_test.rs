//! Integration tests for reads and single-node upserts using in-memory
//! SurrealDB.

use fedreg_core::error::FedRegError;
use fedreg_core::models::location::LocationAttrs;
use fedreg_core::repository::{Filter, Pagination};
use fedreg_db::SurrealGraphStore;
use fedreg_reconcile::{ReconcileConfig, Reconciler};
use serde_json::json;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Reconciler<SurrealGraphStore<Db>> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    fedreg_db::run_migrations(&db).await.unwrap();
    Reconciler::new(SurrealGraphStore::new(db), ReconcileConfig::default())
}

fn location(site: &str, country: &str, latitude: f64) -> LocationAttrs {
    LocationAttrs {
        site: site.into(),
        country: country.into(),
        latitude: Some(latitude),
        ..Default::default()
    }
}

#[tokio::test]
async fn get_missing_node_is_not_found() {
    let rec = setup().await;
    let err = rec.get::<LocationAttrs>(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, FedRegError::NotFound { .. }));
}

#[tokio::test]
async fn get_multi_filters_sorts_and_paginates() {
    let rec = setup().await;
    for (site, country, latitude) in [
        ("bologna", "Italy", 44.5),
        ("catania", "Italy", 37.5),
        ("padova", "Italy", 45.4),
        ("lyon", "France", 45.8),
    ] {
        rec.create(&location(site, country, latitude)).await.unwrap();
    }

    let page = rec
        .get_multi::<LocationAttrs>(
            &Filter::eq("country", "Italy"),
            Some("-latitude"),
            Pagination {
                offset: 0,
                limit: 2,
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    let sites: Vec<_> = page.items.iter().map(|l| l.attrs.site.as_str()).collect();
    assert_eq!(sites, vec!["padova", "bologna"]);

    let page = rec
        .get_multi::<LocationAttrs>(
            &Filter::new(),
            Some("site"),
            Pagination {
                offset: 1,
                limit: 10,
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 4);
    let sites: Vec<_> = page.items.iter().map(|l| l.attrs.site.as_str()).collect();
    assert_eq!(sites, vec!["catania", "lyon", "padova"]);
}

#[tokio::test]
async fn get_multi_rejects_unknown_sort_attribute() {
    let rec = setup().await;
    rec.create(&location("bologna", "Italy", 44.5)).await.unwrap();

    let err = rec
        .get_multi::<LocationAttrs>(&Filter::new(), Some("altitude"), Pagination::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FedRegError::Validation { .. }));
}

#[tokio::test]
async fn update_without_force_keeps_current_values() {
    let rec = setup().await;
    let stored = rec.create(&location("bologna", "Italy", 44.5)).await.unwrap();

    let desired = LocationAttrs {
        site: "bologna".into(),
        country: "Italy".into(),
        ..Default::default()
    };
    assert!(rec.update(&stored, &desired, false).await.unwrap().is_none());

    let forced = rec.update(&stored, &desired, true).await.unwrap().unwrap();
    assert_eq!(forced.attrs.latitude, None);
    assert!(rec.update(&forced, &desired, true).await.unwrap().is_none());
}

#[tokio::test]
async fn patch_sets_and_clears_attributes() {
    let rec = setup().await;
    let stored = rec.create(&location("bologna", "Italy", 44.5)).await.unwrap();

    let fields = json!({"description": "main site", "latitude": null});
    let patched = rec
        .patch(&stored, fields.as_object().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(patched.attrs.description, "main site");
    assert_eq!(patched.attrs.latitude, None);

    let again = rec.patch(&patched, fields.as_object().unwrap()).await.unwrap();
    assert!(again.is_none());

    let err = rec
        .patch(&patched, json!({"site": null}).as_object().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, FedRegError::Validation { .. }));
}
