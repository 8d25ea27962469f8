//! Integration tests for whole provider aggregates using in-memory
//! SurrealDB.

use fedreg_core::error::FedRegError;
use fedreg_core::graph::Relation;
use fedreg_core::models::flavor::FlavorAttrs;
use fedreg_core::models::identity_provider::{AuthMethod, IdentityProviderAttrs};
use fedreg_core::models::location::LocationAttrs;
use fedreg_core::models::project::ProjectAttrs;
use fedreg_core::models::provider::{CreateProvider, ProviderKind, ProviderStatus};
use fedreg_core::models::quota::QuotaAttrs;
use fedreg_core::models::region::RegionAttrs;
use fedreg_core::models::service::ServiceAttrs;
use fedreg_core::models::sla::SlaAttrs;
use fedreg_core::models::user_group::UserGroupAttrs;
use fedreg_core::repository::{Filter, GraphStore};
use fedreg_db::SurrealGraphStore;
use fedreg_reconcile::{ApplyOutcome, ReconcileConfig, Reconciler};
use serde_json::{Value, json};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn setup() -> Reconciler<SurrealGraphStore<Db>> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    fedreg_db::run_migrations(&db).await.unwrap();
    Reconciler::new(SurrealGraphStore::new(db), ReconcileConfig::default())
}

fn document(name: &str) -> Value {
    json!({
        "name": name,
        "type": "openstack",
        "support_emails": [format!("ops@{name}.example.org")],
        "projects": [
            {"name": "project-a", "uuid": "a"},
            {"name": "project-b", "uuid": "b"}
        ],
        "identity_providers": [{
            "endpoint": "https://idp.example.org",
            "group_claim": "groups",
            "relationship": {"idp_name": "egi", "protocol": "openid"},
            "user_groups": [{
                "name": format!("{name}-group"),
                "sla": {
                    "doc_uuid": format!("{name}-sla"),
                    "start_date": "2024-01-01",
                    "end_date": "2026-01-01",
                    "project": "a"
                }
            }]
        }],
        "regions": [{
            "name": "RegionOne",
            "location": {"site": format!("{name}-site"), "country": "Italy"},
            "compute_services": [{
                "endpoint": format!("https://nova.{name}.example.org"),
                "type": "compute",
                "name": "nova",
                "quotas": [{"type": "compute", "project": "a", "cores": 10, "ram": 4096}],
                "flavors": [
                    {"name": "small", "uuid": "f-small", "vcpus": 1, "ram": 2048},
                    {"name": "gpu", "uuid": "f-gpu", "vcpus": 8, "gpus": 1,
                     "is_shared": false, "projects": ["a"]}
                ]
            }],
            "network_services": [{
                "endpoint": format!("https://neutron.{name}.example.org"),
                "type": "network",
                "name": "neutron",
                "networks": [{"name": "public", "uuid": "n-public"}]
            }]
        }]
    })
}

fn provider_doc(doc: Value) -> CreateProvider {
    serde_json::from_value(doc).unwrap()
}

#[tokio::test]
async fn create_provider_persists_aggregate() {
    let rec = setup().await;
    let provider = rec.create_provider(&provider_doc(document("p1"))).await.unwrap();
    let store = rec.store();

    assert_eq!(provider.attrs.name, "p1");
    assert_eq!(provider.attrs.kind, ProviderKind::Openstack);
    assert_eq!(provider.attrs.status, ProviderStatus::Active);

    let projects = rec.provider_projects(provider.id).await.unwrap();
    let mut uuids: Vec<_> = projects.iter().map(|p| p.attrs.uuid.as_str()).collect();
    uuids.sort();
    assert_eq!(uuids, vec!["a", "b"]);

    let regions = store
        .targets::<RegionAttrs>(Relation::ProviderRegion, provider.id)
        .await
        .unwrap();
    assert_eq!(regions.len(), 1);
    let location = store
        .single_target::<LocationAttrs>(Relation::RegionLocation, regions[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(location.attrs.site, "p1-site");

    let services = store
        .targets::<ServiceAttrs>(Relation::RegionService, regions[0].id)
        .await
        .unwrap();
    assert_eq!(services.len(), 2);
    let nova = services
        .iter()
        .find(|s| s.attrs.name == "nova")
        .unwrap();
    let flavors = store
        .targets::<FlavorAttrs>(Relation::ServiceFlavor, nova.id)
        .await
        .unwrap();
    assert_eq!(flavors.len(), 2);
    let quotas = store
        .sources::<QuotaAttrs>(Relation::QuotaService, nova.id)
        .await
        .unwrap();
    assert_eq!(quotas.len(), 1);

    let idp = store
        .find_one::<IdentityProviderAttrs>(&Filter::eq("endpoint", "https://idp.example.org"))
        .await
        .unwrap()
        .unwrap();
    let method: AuthMethod = serde_json::from_value(
        store
            .edge_props(Relation::ProviderIdentityProvider, provider.id, idp.id)
            .await
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(method.idp_name, "egi");
    assert_eq!(method.protocol, "openid");

    let sla = store
        .find_one::<SlaAttrs>(&Filter::eq("doc_uuid", "p1-sla"))
        .await
        .unwrap()
        .unwrap();
    let project = store
        .single_target::<ProjectAttrs>(Relation::SlaProject, sla.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(project.attrs.uuid, "a");
}

#[tokio::test]
async fn duplicate_provider_is_a_conflict() {
    let rec = setup().await;
    rec.create_provider(&provider_doc(document("p1"))).await.unwrap();

    let err = rec
        .create_provider(&provider_doc(document("p1")))
        .await
        .unwrap_err();
    assert!(matches!(err, FedRegError::Conflict { .. }));
    assert!(err.to_string().contains("name p1 and type openstack"));
}

#[tokio::test]
async fn identical_update_is_a_noop() {
    let rec = setup().await;
    let desired = provider_doc(document("p1"));
    let provider = rec.create_provider(&desired).await.unwrap();

    assert!(rec.update_provider(&provider, &desired).await.unwrap().is_none());
    assert!(rec.update_provider(&provider, &desired).await.unwrap().is_none());
}

#[tokio::test]
async fn changed_auth_method_is_written_to_the_link() {
    let rec = setup().await;
    let provider = rec.create_provider(&provider_doc(document("p1"))).await.unwrap();

    let mut doc = document("p1");
    doc["identity_providers"][0]["relationship"] =
        json!({"idp_name": "egi-checkin", "protocol": "oidc"});
    let desired = provider_doc(doc);
    assert!(rec.update_provider(&provider, &desired).await.unwrap().is_some());
    assert!(rec.update_provider(&provider, &desired).await.unwrap().is_none());

    let store = rec.store();
    let idp = store
        .find_one::<IdentityProviderAttrs>(&Filter::eq("endpoint", "https://idp.example.org"))
        .await
        .unwrap()
        .unwrap();
    let method: AuthMethod = serde_json::from_value(
        store
            .edge_props(Relation::ProviderIdentityProvider, provider.id, idp.id)
            .await
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(method.idp_name, "egi-checkin");
    assert_eq!(method.protocol, "oidc");
}

#[tokio::test]
async fn region_moves_to_another_site() {
    let rec = setup().await;
    let provider = rec.create_provider(&provider_doc(document("p1"))).await.unwrap();

    let mut doc = document("p1");
    doc["regions"][0]["location"] = json!({"site": "p1-new-site", "country": "Spain"});
    let desired = provider_doc(doc);
    assert!(rec.update_provider(&provider, &desired).await.unwrap().is_some());
    assert!(rec.update_provider(&provider, &desired).await.unwrap().is_none());

    let store = rec.store();
    let regions = store
        .targets::<RegionAttrs>(Relation::ProviderRegion, provider.id)
        .await
        .unwrap();
    let location = store
        .single_target::<LocationAttrs>(Relation::RegionLocation, regions[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(location.attrs.site, "p1-new-site");
    assert_eq!(location.attrs.country, "Spain");

    let old = store
        .find_one::<LocationAttrs>(&Filter::eq("site", "p1-site"))
        .await
        .unwrap();
    assert!(old.is_none());
}

#[tokio::test]
async fn apply_creates_then_updates() {
    let rec = setup().await;
    let mut doc = document("p1");

    let outcome = rec.apply(&provider_doc(doc.clone())).await.unwrap();
    assert!(matches!(outcome, ApplyOutcome::Created(_)));
    let outcome = rec.apply(&provider_doc(doc.clone())).await.unwrap();
    assert!(matches!(outcome, ApplyOutcome::Unchanged(_)));

    doc["status"] = json!("maintenance");
    let outcome = rec.apply(&provider_doc(doc)).await.unwrap();
    assert_eq!(outcome.as_str(), "updated");
    assert_eq!(outcome.provider().attrs.status, ProviderStatus::Maintenance);
}

#[tokio::test]
async fn update_removes_dropped_children() {
    let rec = setup().await;
    let mut doc = document("p1");
    let provider = rec.create_provider(&provider_doc(doc.clone())).await.unwrap();

    doc["projects"] = json!([{"name": "project-a", "uuid": "a"}]);
    doc["regions"][0]["location"] = Value::Null;
    doc["regions"][0]["network_services"] = json!([]);
    let updated = rec
        .update_provider(&provider, &provider_doc(doc))
        .await
        .unwrap();
    assert!(updated.is_some());

    let store = rec.store();
    let projects = rec.provider_projects(provider.id).await.unwrap();
    assert_eq!(projects.len(), 1);
    assert!(
        store
            .find_nodes::<LocationAttrs>(&Filter::eq("site", "p1-site"))
            .await
            .unwrap()
            .is_empty()
    );
    let services = store
        .find_nodes::<ServiceAttrs>(&Filter::new())
        .await
        .unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].attrs.name, "nova");
}

#[tokio::test]
async fn region_name_is_unique_per_provider() {
    let rec = setup().await;
    let p1 = rec.create_provider(&provider_doc(document("p1"))).await.unwrap();
    let p2 = rec.create_provider(&provider_doc(document("p2"))).await.unwrap();
    let region = serde_json::from_value(json!({"name": "RegionTwo"})).unwrap();

    rec.create_region(&region, &p1, &[]).await.unwrap();
    let err = rec.create_region(&region, &p1, &[]).await.unwrap_err();
    assert!(matches!(err, FedRegError::Conflict { .. }));

    rec.create_region(&region, &p2, &[]).await.unwrap();
}

#[tokio::test]
async fn identity_provider_is_shared_between_providers() {
    let rec = setup().await;
    let store = rec.store();
    let mut second = document("p2");
    second["identity_providers"][0]["relationship"]["idp_name"] = json!("egi-p2");

    let p1 = rec.create_provider(&provider_doc(document("p1"))).await.unwrap();
    let p2 = rec.create_provider(&provider_doc(second)).await.unwrap();

    let idps = store
        .find_nodes::<IdentityProviderAttrs>(&Filter::new())
        .await
        .unwrap();
    assert_eq!(idps.len(), 1);
    let idp = &idps[0];
    assert_eq!(
        store
            .count_sources(Relation::ProviderIdentityProvider, idp.id)
            .await
            .unwrap(),
        2
    );
    let method: AuthMethod = serde_json::from_value(
        store
            .edge_props(Relation::ProviderIdentityProvider, p2.id, idp.id)
            .await
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(method.idp_name, "egi-p2");

    rec.remove_provider(&p1).await.unwrap();
    let groups = store
        .targets::<UserGroupAttrs>(Relation::IdentityProviderUserGroup, idp.id)
        .await
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].attrs.name, "p2-group");
    assert!(
        store
            .find_one::<SlaAttrs>(&Filter::eq("doc_uuid", "p1-sla"))
            .await
            .unwrap()
            .is_none()
    );

    rec.remove_provider(&p2).await.unwrap();
    assert!(
        store
            .find_nodes::<IdentityProviderAttrs>(&Filter::new())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn remove_provider_cascades() {
    let rec = setup().await;
    let store = rec.store();
    let provider = rec.create_provider(&provider_doc(document("p1"))).await.unwrap();

    rec.remove_provider(&provider).await.unwrap();

    assert!(
        rec.find_provider("p1", ProviderKind::Openstack)
            .await
            .unwrap()
            .is_none()
    );
    let empty = Filter::new();
    assert!(store.find_nodes::<ProjectAttrs>(&empty).await.unwrap().is_empty());
    assert!(store.find_nodes::<RegionAttrs>(&empty).await.unwrap().is_empty());
    assert!(store.find_nodes::<LocationAttrs>(&empty).await.unwrap().is_empty());
    assert!(store.find_nodes::<ServiceAttrs>(&empty).await.unwrap().is_empty());
    assert!(store.find_nodes::<QuotaAttrs>(&empty).await.unwrap().is_empty());
    assert!(store.find_nodes::<FlavorAttrs>(&empty).await.unwrap().is_empty());
    assert!(store.find_nodes::<SlaAttrs>(&empty).await.unwrap().is_empty());
    assert!(store.find_nodes::<UserGroupAttrs>(&empty).await.unwrap().is_empty());
    assert!(
        store
            .find_nodes::<IdentityProviderAttrs>(&empty)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn shared_location_survives_one_region_removal() {
    let rec = setup().await;
    let mut second = document("p2");
    second["regions"][0]["location"]["site"] = json!("p1-site");

    let p1 = rec.create_provider(&provider_doc(document("p1"))).await.unwrap();
    rec.create_provider(&provider_doc(second)).await.unwrap();

    rec.remove_provider(&p1).await.unwrap();
    let location = rec
        .store()
        .find_one::<LocationAttrs>(&Filter::eq("site", "p1-site"))
        .await
        .unwrap();
    assert!(location.is_some());
}
