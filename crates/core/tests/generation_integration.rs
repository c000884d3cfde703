// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Integration tests for instance generation over JSON storage
//!
//! Generates, reopens the store as a restarted process would, and refills.

use cadence_core::{
    FakeEventSink, HeapItem, Horizon, InstanceEvent, InstanceGenerator, InstanceStatus,
    JsonRepository, PriorityHeap, RecurrenceRule, Repository, SequentialIdGen, Template,
    TemplateId, TimeConfig, Timestamp, DAY_MS,
};
use chrono::Weekday;
use std::collections::HashSet;

// 2024-01-01T00:00:00Z, a Monday
const MONDAY: Timestamp = 1_704_067_200_000;
const NINE_AM: Timestamp = 9 * 3_600_000;

fn generator() -> InstanceGenerator<SequentialIdGen> {
    InstanceGenerator::new(Horizon::new(6, 30), 0.5, SequentialIdGen::new("inst"))
}

fn standup() -> Template {
    Template::new(
        "standup",
        "Standup",
        RecurrenceRule::weekly(1, vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]),
        TimeConfig::starting_at(MONDAY + NINE_AM),
    )
}

fn scheduled(repo: &JsonRepository, id: &TemplateId) -> Vec<Timestamp> {
    let mut times: Vec<Timestamp> = repo
        .find_by_template(id)
        .unwrap()
        .into_iter()
        .map(|i| i.scheduled_at)
        .collect();
    times.sort_unstable();
    times
}

#[test]
fn generation_survives_restart_and_refills_after_watermark() {
    let dir = tempfile::tempdir().unwrap();
    let sink = FakeEventSink::new();
    let id = TemplateId::new("standup");
    let generator = generator();

    let repo = JsonRepository::open(dir.path()).unwrap();
    let mut template = standup();
    assert_eq!(
        generator
            .ensure_instances(&mut template, &repo, &sink, MONDAY)
            .unwrap(),
        6
    );
    assert_eq!(
        scheduled(&repo, &id),
        vec![
            MONDAY + NINE_AM,
            MONDAY + 2 * DAY_MS + NINE_AM,
            MONDAY + 4 * DAY_MS + NINE_AM,
            MONDAY + 7 * DAY_MS + NINE_AM,
            MONDAY + 9 * DAY_MS + NINE_AM,
            MONDAY + 11 * DAY_MS + NINE_AM,
        ]
    );

    // A restarted process reads the watermark back and has nothing to do
    let reopened = JsonRepository::open(dir.path()).unwrap();
    let mut stored = reopened.find_template(&id).unwrap().unwrap();
    assert_eq!(stored.watermark, Some(MONDAY + 11 * DAY_MS + NINE_AM));
    assert_eq!(
        generator
            .ensure_instances(&mut stored, &reopened, &sink, MONDAY)
            .unwrap(),
        0
    );

    // Retire four; two open is below the threshold of three
    let mut instances = reopened.find_by_template(&id).unwrap();
    instances.sort_by_key(|i| i.scheduled_at);
    for instance in &instances[..4] {
        reopened
            .save_instance(&instance.transition(InstanceEvent::Expire, MONDAY))
            .unwrap();
    }
    assert_eq!(
        generator
            .ensure_instances(&mut stored, &reopened, &sink, MONDAY)
            .unwrap(),
        4
    );

    let times = scheduled(&reopened, &id);
    assert_eq!(times.len(), 10);
    assert_eq!(times.iter().collect::<HashSet<_>>().len(), 10);
    assert_eq!(times.last(), Some(&(MONDAY + 21 * DAY_MS + NINE_AM)));
    assert_eq!(
        reopened.count_future_instances(&id, MONDAY).unwrap(),
        6
    );
    assert_eq!(
        sink.names()
            .into_iter()
            .filter(|n| *n == "instances.generated")
            .count(),
        2
    );
}

#[test]
fn earliest_pending_instances_drive_the_heap() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonRepository::open(dir.path()).unwrap();
    let sink = FakeEventSink::new();
    let generator = generator();

    let mut standup = standup();
    let mut nightly = Template::new(
        "nightly",
        "Nightly",
        RecurrenceRule::daily(1),
        TimeConfig::starting_at(MONDAY + 2 * 3_600_000),
    );
    generator
        .ensure_instances(&mut standup, &repo, &sink, MONDAY)
        .unwrap();
    generator
        .ensure_instances(&mut nightly, &repo, &sink, MONDAY)
        .unwrap();

    let mut heap = PriorityHeap::from_items(repo.list_templates().unwrap().iter().filter_map(|t| {
        repo.find_by_template(&t.id)
            .unwrap()
            .into_iter()
            .filter(|i| i.status == InstanceStatus::Pending)
            .map(|i| i.scheduled_at)
            .min()
            .map(|at| HeapItem::new(t.id.clone(), at))
    }));

    let due = heap.drain_due(MONDAY + NINE_AM);
    let order: Vec<&str> = due.iter().map(|item| item.task_id.as_str()).collect();
    assert_eq!(order, vec!["nightly", "standup"]);
    assert!(heap.is_empty());
}
