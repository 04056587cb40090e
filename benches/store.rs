// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use zonemap::model::{Message, MessageType, ProjectDescription};
use zonemap::store::{ProjectRepository, SqliteKeyStore};

mod fixtures;

use fixtures::Case;

fn seeded(store: SqliteKeyStore, projects: usize) -> ProjectRepository {
    let repository = ProjectRepository::new(store).expect("repository");
    for index in 0..projects {
        repository
            .create_project(ProjectDescription::new(
                format!("project {index:04}"),
                format!("workspace {}", index % 8),
            ))
            .expect("create_project");
    }
    repository
}

// Group and case ids stay stable so results remain comparable across refactors.
fn benches_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("store.repository");

    group.bench_function("create_in_memory", |b| {
        b.iter_batched_ref(
            || seeded(SqliteKeyStore::in_memory().expect("open store"), 100),
            |repository| {
                let project = repository
                    .create_project(ProjectDescription::new("bench", "workspace 0"))
                    .expect("create_project");
                black_box(project.id)
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("create_on_disk", |b| {
        b.iter_batched_ref(
            || {
                let dir = tempfile::tempdir().expect("tempdir");
                let store = SqliteKeyStore::open(dir.path()).expect("open store");
                (dir, seeded(store, 100))
            },
            |(_dir, repository)| {
                let project = repository
                    .create_project(ProjectDescription::new("bench", "workspace 0"))
                    .expect("create_project");
                black_box(project.id)
            },
            BatchSize::SmallInput,
        )
    });

    let listed = seeded(SqliteKeyStore::in_memory().expect("open store"), 500);
    group.bench_function("list_projects_500", move |b| {
        b.iter(|| black_box(listed.list_projects().expect("list_projects").len()))
    });

    let rebuilt = seeded(SqliteKeyStore::in_memory().expect("open store"), 500);
    group.bench_function("rebuild_workspaces_500", move |b| {
        b.iter(|| black_box(rebuilt.rebuild_workspaces().expect("rebuild").details.len()))
    });

    let repository = seeded(SqliteKeyStore::in_memory().expect("open store"), 100);
    let project = repository
        .create_project(ProjectDescription::new("model", "workspace 0"))
        .expect("create_project");
    let mut update = Message::new(MessageType::UpdateModel, project.id.as_str());
    update.threat_model = fixtures::threat_model_yaml(Case::Medium);
    group.bench_function("update_model_medium", move |b| {
        b.iter(|| {
            let reply = repository
                .update_model(black_box(&project.id), black_box(&update))
                .expect("update_model");
            black_box(reply.threat_model.len())
        })
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = fixtures::criterion();
    targets = benches_store
}
criterion_main!(benches);
