// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

use std::time::Duration;

use criterion::Criterion;
use zonemap::otm::{Component, DataFlow, OpenThreatModel, OtmProject, ParentRef, TrustZone};

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name).ok().and_then(|raw| raw.trim().parse::<usize>().ok()).unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name).ok().and_then(|raw| raw.trim().parse::<u64>().ok()).unwrap_or(default)
}

pub fn criterion() -> Criterion {
    let sample_size = env_usize("BENCH_SAMPLE_SIZE", 60).clamp(10, 200);
    let warmup_secs = env_u64("BENCH_WARMUP_SECS", 3).clamp(1, 60);
    let measurement_secs = env_u64("BENCH_MEASUREMENT_SECS", 5).clamp(1, 120);

    Criterion::default()
        .sample_size(sample_size)
        .warm_up_time(Duration::from_secs(warmup_secs))
        .measurement_time(Duration::from_secs(measurement_secs))
}

#[derive(Debug, Clone, Copy)]
pub enum Case {
    /// 4 root zones, 5 components each, a flow ring.
    Small,
    /// 10 root zones with 4 nested zones each, 10 components per nested zone.
    Medium,
    /// One chain of 500 nested zones with a component at the bottom.
    DeepChain,
}

impl Case {
    pub fn id(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::DeepChain => "deep_chain",
        }
    }
}

fn zone(id: String, parent: Option<&str>) -> TrustZone {
    TrustZone {
        name: format!("Zone {id}"),
        parent: parent.map(ParentRef::trust_zone),
        id,
        ..TrustZone::default()
    }
}

fn component(id: String, zone: &str) -> Component {
    Component {
        name: format!("Component {id}"),
        parent: Some(ParentRef::trust_zone(zone)),
        id,
        ..Component::default()
    }
}

fn ring_flows(components: &[Component]) -> Vec<DataFlow> {
    let len = components.len();
    components
        .iter()
        .enumerate()
        .map(|(index, source)| DataFlow {
            id: format!("flow_{index}"),
            name: format!("call {index}"),
            source: source.id.clone(),
            destination: components[(index + 1) % len].id.clone(),
            bidirectional: index % 3 == 0,
        })
        .collect()
}

pub fn threat_model(case: Case) -> OpenThreatModel {
    let mut zones = Vec::new();
    let mut components = Vec::new();

    match case {
        Case::Small => {
            for z in 0..4 {
                let zone_id = format!("z{z}");
                for c in 0..5 {
                    components.push(component(format!("c{z}_{c}"), &zone_id));
                }
                zones.push(zone(zone_id, None));
            }
        }
        Case::Medium => {
            for z in 0..10 {
                let root_id = format!("z{z}");
                for n in 0..4 {
                    let nested_id = format!("z{z}_{n}");
                    for c in 0..10 {
                        components.push(component(format!("c{z}_{n}_{c}"), &nested_id));
                    }
                    zones.push(zone(nested_id, Some(&root_id)));
                }
                zones.push(zone(root_id, None));
            }
        }
        Case::DeepChain => {
            zones.push(zone("z0".to_owned(), None));
            for depth in 1..500 {
                let parent = format!("z{}", depth - 1);
                zones.push(zone(format!("z{depth}"), Some(&parent)));
            }
            components.push(component("bottom".to_owned(), "z499"));
            components.push(component("top".to_owned(), "z0"));
        }
    }

    let data_flows = ring_flows(&components);
    OpenThreatModel {
        otm_version: "0.2.0".to_owned(),
        project: OtmProject {
            name: format!("bench {}", case.id()),
            id: case.id().to_owned(),
            ..OtmProject::default()
        },
        trust_zones: zones,
        components,
        data_flows,
    }
}

pub fn threat_model_yaml(case: Case) -> String {
    serde_yaml::to_string(&threat_model(case)).expect("serialize threat model")
}
