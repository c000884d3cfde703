// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::events::FakeEventSink;
use crate::id::SequentialIdGen;
use crate::instance::InstanceEvent;
use crate::storage::MemoryRepository;
use crate::template::{RecurrenceRule, TemplateStatus, TimeConfig};
use crate::time::DAY_MS;
use yare::parameterized;

const MONDAY: Timestamp = 1_704_067_200_000;

fn generator(max_instances: usize) -> InstanceGenerator<SequentialIdGen> {
    InstanceGenerator::new(
        Horizon::new(max_instances, 365),
        0.2,
        SequentialIdGen::new("inst"),
    )
}

fn daily() -> Template {
    Template::new(
        "standup",
        "Daily standup",
        RecurrenceRule::daily(1),
        TimeConfig::starting_at(MONDAY + 9 * 3_600_000),
    )
}

#[test]
fn threshold_is_fraction_of_max_instances_rounded_up() {
    assert_eq!(generator(10).refill_threshold_count(), 2);
    assert_eq!(generator(30).refill_threshold_count(), 6);
    assert_eq!(generator(3).refill_threshold_count(), 1);
}

#[parameterized(
    below = { 1, true },
    at = { 2, false },
    above = { 3, false },
    empty = { 0, true },
)]
fn refill_triggers_strictly_below_threshold(future_count: usize, expected: bool) {
    assert_eq!(generator(10).should_refill(future_count), expected);
}

#[test]
fn initial_plan_fills_to_max_instances() {
    let gen = generator(10);
    let batch = gen.plan(&daily(), 0, MONDAY).unwrap();

    assert_eq!(batch.strategy, GenerationStrategy::Initial);
    assert_eq!(batch.instances.len(), 10);
    assert!(batch.instances.iter().all(Instance::is_pending));
    assert_eq!(batch.watermark, Some(batch.instances[9].scheduled_at));
    assert_eq!(batch.instances[0].id.0, "inst-1");
}

#[test]
fn refill_plan_only_tops_up_to_budget_after_watermark() {
    let gen = generator(10);
    let mut template = daily();
    let first = gen.plan(&template, 0, MONDAY).unwrap();
    template.watermark = first.watermark;

    let refill = gen.plan(&template, 8, MONDAY).unwrap();
    assert_eq!(refill.strategy, GenerationStrategy::Refill);
    assert_eq!(refill.instances.len(), 2);
    assert_eq!(
        refill.instances[0].scheduled_at,
        first.instances[9].scheduled_at + DAY_MS
    );
}

#[test]
fn plan_never_generates_in_the_past() {
    let gen = generator(5);
    let now = MONDAY + 3 * DAY_MS + 12 * 3_600_000;
    let batch = gen.plan(&daily(), 0, now).unwrap();

    assert!(batch.instances.iter().all(|i| i.scheduled_at >= now));
    assert_eq!(
        batch.instances[0].scheduled_at,
        MONDAY + 4 * DAY_MS + 9 * 3_600_000
    );
}

#[parameterized(
    paused = { TemplateStatus::Paused },
    archived = { TemplateStatus::Archived },
)]
fn inactive_templates_plan_nothing(status: TemplateStatus) {
    let batch = generator(10)
        .plan(&daily().with_status(status), 0, MONDAY)
        .unwrap();
    assert!(batch.is_empty());
}

#[test]
fn full_backlog_plans_nothing() {
    let mut template = daily();
    template.watermark = Some(MONDAY);
    assert!(generator(10).plan(&template, 10, MONDAY).unwrap().is_empty());
}

#[test]
fn invalid_rule_is_rejected_before_generation() {
    let template = Template::new(
        "bad",
        "bad",
        RecurrenceRule::daily(0),
        TimeConfig::starting_at(MONDAY),
    );
    assert_eq!(
        generator(10).plan(&template, 0, MONDAY),
        Err(ValidationError::NonPositiveInterval(0))
    );
}

#[test]
fn ensure_instances_persists_batch_and_watermark() {
    let gen = generator(10);
    let repo = MemoryRepository::new();
    let sink = FakeEventSink::new();
    let mut template = daily();
    repo.save_template(&template).unwrap();

    let created = gen
        .ensure_instances(&mut template, &repo, &sink, MONDAY)
        .unwrap();

    assert_eq!(created, 10);
    assert_eq!(repo.find_by_template(&template.id).unwrap().len(), 10);
    let stored = repo.find_template(&template.id).unwrap().unwrap();
    assert_eq!(stored.watermark, template.watermark);
    assert!(stored.watermark.is_some());
    assert_eq!(
        sink.events(),
        vec![Event::InstancesGenerated {
            template_id: template.id.clone(),
            count: 10,
            strategy: GenerationStrategy::Initial,
        }]
    );
}

#[test]
fn ensure_instances_waits_until_backlog_drops_below_threshold() {
    let gen = generator(10);
    let repo = MemoryRepository::new();
    let sink = FakeEventSink::new();
    let mut template = daily();
    gen.ensure_instances(&mut template, &repo, &sink, MONDAY)
        .unwrap();

    // Close all but two; two is exactly the threshold
    let mut instances = repo.find_by_template(&template.id).unwrap();
    for inst in instances.drain(..8) {
        repo.save_instance(&inst.transition(InstanceEvent::Expire, MONDAY))
            .unwrap();
    }
    assert_eq!(
        gen.ensure_instances(&mut template, &repo, &sink, MONDAY)
            .unwrap(),
        0
    );

    let ninth = instances.remove(0);
    repo.save_instance(&ninth.transition(InstanceEvent::Expire, MONDAY))
        .unwrap();
    assert_eq!(
        gen.ensure_instances(&mut template, &repo, &sink, MONDAY)
            .unwrap(),
        9
    );
    assert_eq!(
        sink.names(),
        vec!["instances.generated", "instances.generated"]
    );
    assert_eq!(repo.count_future_instances(&template.id, MONDAY).unwrap(), 10);
}

#[test]
fn ensure_instances_surfaces_validation_errors_without_writing() {
    let gen = generator(10);
    let repo = MemoryRepository::new();
    let sink = FakeEventSink::new();
    let mut template = Template::new(
        "bad",
        "bad",
        RecurrenceRule::Weekly {
            interval: 1,
            week_days: vec![],
        },
        TimeConfig::starting_at(MONDAY),
    );

    let err = gen
        .ensure_instances(&mut template, &repo, &sink, MONDAY)
        .unwrap_err();
    assert!(matches!(
        err,
        GenerateError::Validation(ValidationError::EmptyWeekDays)
    ));
    assert!(repo.find_by_template(&template.id).unwrap().is_empty());
    assert!(sink.events().is_empty());
}

#[test]
fn custom_dates_are_exhausted_without_error() {
    let gen = generator(10);
    let repo = MemoryRepository::new();
    let sink = FakeEventSink::new();
    let mut template = Template::new(
        "once",
        "once",
        RecurrenceRule::custom(vec![MONDAY + DAY_MS]),
        TimeConfig::starting_at(MONDAY),
    );

    assert_eq!(
        gen.ensure_instances(&mut template, &repo, &sink, MONDAY)
            .unwrap(),
        1
    );
    assert_eq!(
        gen.ensure_instances(&mut template, &repo, &sink, MONDAY)
            .unwrap(),
        0
    );
}
