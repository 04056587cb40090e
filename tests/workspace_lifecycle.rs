// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use zonemap::live::{MessageDispatcher, SessionRegistry};
use zonemap::model::{Message, MessageType, ProjectDescription};
use zonemap::store::{ProjectRepository, RebuildSummariser, SqliteKeyStore, WriteDurability};

const SHOP_OTM: &str = r#"
otmVersion: 0.2.0
project:
  name: Shop
  id: shop
trustZones:
  - id: internet
    name: Internet
  - id: dmz
    name: DMZ
    parent:
      trustZone: internet
components:
  - id: browser
    name: Browser
    parent:
      trustZone: internet
  - id: api
    name: API
    parent:
      trustZone: dmz
dataFlows:
  - id: f1
    name: HTTPS
    source: browser
    destination: api
    bidirectional: true
"#;

fn open(dir: &std::path::Path) -> ProjectRepository {
    let store = SqliteKeyStore::open(dir)
        .unwrap()
        .with_durability(WriteDurability::Durable)
        .unwrap();
    ProjectRepository::new(store).unwrap()
}

#[test]
fn projects_models_and_workspaces_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let (shop, blog) = {
        let repository = open(dir.path());
        let shop = repository
            .create_project(ProjectDescription::new("Shop", "Retail"))
            .unwrap();
        let blog = repository
            .create_project(ProjectDescription::new("Blog", "Retail"))
            .unwrap();

        let mut update = Message::new(MessageType::UpdateModel, shop.id.as_str());
        update.threat_model = SHOP_OTM.to_owned();
        repository.update_model(&shop.id, &update).unwrap();

        repository
            .update_project(
                blog.id.as_str(),
                ProjectDescription::new("Blog", "Media"),
                RebuildSummariser,
            )
            .unwrap();
        repository.flush_index_writes();
        (shop, blog)
    };

    let repository = open(dir.path());
    let names = repository
        .list_projects()
        .unwrap()
        .into_iter()
        .map(|project| project.description.name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Blog", "Shop"]);

    let index = repository.get_workspaces().unwrap();
    assert!(index.contains("Retail", &shop.id));
    assert!(!index.contains("Retail", &blog.id));
    assert!(index.contains("Media", &blog.id));

    let model = repository.get_model(&shop.id).unwrap();
    assert!(model.threat_is_updated);
    assert!(!model.visual_is_updated);
    assert_eq!(model.threat_model, SHOP_OTM);
}

#[test]
fn stored_model_renders_through_the_dispatcher() {
    let dir = tempfile::tempdir().unwrap();
    let repository = Arc::new(open(dir.path()));
    let shop = repository
        .create_project(ProjectDescription::new("Shop", "Retail"))
        .unwrap();
    let dispatcher = MessageDispatcher::new(repository.clone(), Arc::new(SessionRegistry::new()));

    let mut update = Message::new(MessageType::UpdateModel, shop.id.as_str());
    update.threat_model = SHOP_OTM.to_owned();
    let reply = dispatcher.dispatch(&update).unwrap();
    assert!(!reply.has_error);

    let current = dispatcher
        .dispatch(&Message::new(MessageType::GetModel, shop.id.as_str()))
        .unwrap();
    assert_eq!(current.kind, MessageType::UpdateUi);

    let mut process = Message::new(MessageType::ProcessModel, shop.id.as_str());
    process.threat_model = current.threat_model;
    let rendered = dispatcher.dispatch(&process).unwrap();

    assert_eq!(rendered.kind, MessageType::Graphviz);
    assert!(!rendered.has_error, "{}", rendered.error);
    let dot = rendered.visual_model;
    assert!(dot.starts_with("digraph G {\n"));
    assert!(dot.ends_with("}\n"));
    assert!(dot.contains("subgraph cluster_internet {"));
    assert!(dot.contains("subgraph cluster_dmz {"));
    assert!(dot.contains("browser -> api[label=\"HTTPS\"]"));
    assert!(dot.contains("api -> browser[label=\"HTTPS\"]"));

    let internet = dot.find("cluster_internet").unwrap();
    let dmz = dot.find("cluster_dmz").unwrap();
    assert!(internet < dmz, "dmz nests inside internet");
}

#[test]
fn deleting_keeps_the_model_and_rebuild_repairs_drift() {
    let dir = tempfile::tempdir().unwrap();
    let repository = open(dir.path());
    let shop = repository
        .create_project(ProjectDescription::new("Shop", "Retail"))
        .unwrap();
    let blog = repository
        .create_project(ProjectDescription::new("Blog", "Retail"))
        .unwrap();

    repository.delete_project(&shop.id).unwrap();
    assert!(repository.get_model(&shop.id).is_ok());
    assert!(repository.get_project(&shop.id).unwrap_err().is_not_found());

    let mut drifted = repository.get_workspaces().unwrap();
    drifted.set_members("Ghost", vec![blog.clone()]);
    repository.save_workspaces(&drifted).unwrap();

    let rebuilt = repository.rebuild_workspaces().unwrap();
    assert!(rebuilt.members("Ghost").is_empty());
    assert_eq!(rebuilt.members("Retail"), std::slice::from_ref(&blog));
}
