// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use zonemap::otm::{OtmYamlParser, ThreatModelParser};
use zonemap::render::{render_graphviz, resolve_model_containment};

mod fixtures;

use fixtures::Case;

const CASES: [Case; 3] = [Case::Small, Case::Medium, Case::DeepChain];

// Group and case ids stay stable so results remain comparable across refactors.
fn benches_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render.containment");
    for case in CASES {
        let model = fixtures::threat_model(case);
        group.bench_function(case.id(), move |b| {
            b.iter(|| {
                let roots = resolve_model_containment(black_box(&model)).expect("resolve");
                black_box(roots.len())
            })
        });
    }
    group.finish();

    let mut group = c.benchmark_group("render.graphviz");
    for case in CASES {
        let model = fixtures::threat_model(case);
        group.bench_function(case.id(), move |b| {
            b.iter(|| black_box(render_graphviz(black_box(&model)).expect("render").len()))
        });
    }
    group.finish();

    let mut group = c.benchmark_group("render.parse_and_render");
    for case in CASES {
        let text = fixtures::threat_model_yaml(case);
        group.bench_function(case.id(), move |b| {
            b.iter(|| {
                let model = OtmYamlParser.parse(black_box(&text)).expect("parse");
                black_box(render_graphviz(&model).expect("render").len())
            })
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = fixtures::criterion();
    targets = benches_render
}
criterion_main!(benches);
