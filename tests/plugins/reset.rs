use coursewright::core::error::Step;
use coursewright::plugins::memory::MemoryHost;
use coursewright::plugins::provision::{ProvisionEngine, ProvisionOptions, ProvisionOutcome};
use coursewright::plugins::reset::{ResetEngine, ResetOutcome};
use coursewright::plugins::template::{THESIS_DEFENSE, THESIS_PREPARATION, Template};

const NOW: u64 = 1_760_000_000;

fn provisioned_course(template: &Template) -> (MemoryHost, i64) {
    let host = MemoryHost::new();
    let course = host.add_course("Thesis", "thesis");
    host.add_section(course, 0, "");
    host.add_section(course, 1, "Lectures");
    host.add_role("editingteacher");
    host.add_role("student");
    let engine = ProvisionEngine::new(template, &host, &host, ProvisionOptions::default());
    assert!(matches!(
        engine.provision_at(course, NOW).unwrap(),
        ProvisionOutcome::Provisioned(_)
    ));
    (host, course)
}

fn shape(host: &MemoryHost, course: i64) -> (Vec<(u32, String)>, Vec<String>) {
    let sections = host
        .sections(course)
        .into_iter()
        .map(|s| (s.position, s.name))
        .collect();
    let items = host
        .items(course)
        .into_iter()
        .map(|i| i.display_name)
        .collect();
    (sections, items)
}

#[test]
fn reset_removes_template_sections_and_their_items_only() {
    let template = Template::thesis().unwrap();
    let (host, course) = provisioned_course(&template);
    // Template-named sections on other courses are out of reach.
    let other = host.add_course("Other", "other");
    host.add_section(other, 0, THESIS_PREPARATION);

    let outcome = ResetEngine::new(&template, &host).reset(course).unwrap();
    assert_eq!(
        outcome,
        ResetOutcome {
            sections_removed: 2,
            items_removed: 3,
        }
    );

    let names: Vec<String> = host.sections(course).into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["".to_string(), "Lectures".to_string()]);
    assert!(host.items(course).is_empty());
    assert_eq!(host.sections(other).len(), 1);
    // Lockdown verdicts of deleted items go with them.
    assert_eq!(host.verdict_count(), 0);
}

#[test]
fn items_are_deleted_before_their_section() {
    let template = Template::thesis().unwrap();
    let (host, course) = provisioned_course(&template);
    ResetEngine::new(&template, &host).reset(course).unwrap();

    let calls = host.calls();
    let last_item_delete = calls.iter().rposition(|c| c == "item.delete").unwrap();
    let last_section_delete = calls.iter().rposition(|c| c == "section.delete").unwrap();
    assert!(last_item_delete < last_section_delete);
    assert_eq!(calls.last().map(String::as_str), Some("course.rebuild_cache"));
}

#[test]
fn reset_on_untouched_course_removes_nothing_but_still_rebuilds_cache() {
    let template = Template::thesis().unwrap();
    let host = MemoryHost::new();
    let course = host.add_course("Plain", "plain");
    host.add_section(course, 0, "");

    let outcome = ResetEngine::new(&template, &host).reset(course).unwrap();
    assert_eq!(outcome, ResetOutcome::default());
    assert_eq!(host.sections(course).len(), 1);
    assert_eq!(host.cache_rebuilds(course), 1);
}

#[test]
fn renamed_section_escapes_reset() {
    let template = Template::thesis().unwrap();
    let (host, course) = provisioned_course(&template);
    let defense = host
        .sections(course)
        .into_iter()
        .find(|s| s.position == 4)
        .unwrap();
    assert_eq!(defense.name, THESIS_DEFENSE);
    host.rename_section(defense.id, "Defense (moved)");

    let outcome = ResetEngine::new(&template, &host).reset(course).unwrap();
    assert_eq!(outcome.sections_removed, 1);
    assert_eq!(outcome.items_removed, 0);
    assert_eq!(host.items(course).len(), 3);
}

#[test]
fn provision_reset_provision_matches_a_single_provision() {
    let template = Template::thesis().unwrap();
    let (host, course) = provisioned_course(&template);
    let first_shape = shape(&host, course);
    let first_ids: Vec<i64> = host.items(course).iter().map(|i| i.id).collect();

    ResetEngine::new(&template, &host).reset(course).unwrap();
    let engine = ProvisionEngine::new(&template, &host, &host, ProvisionOptions::default());
    assert!(matches!(
        engine.provision_at(course, NOW).unwrap(),
        ProvisionOutcome::Provisioned(_)
    ));

    assert_eq!(shape(&host, course), first_shape);
    let second_ids: Vec<i64> = host.items(course).iter().map(|i| i.id).collect();
    assert_ne!(first_ids, second_ids);
}

#[test]
fn reset_failures_name_their_step() {
    let template = Template::thesis().unwrap();
    let (host, course) = provisioned_course(&template);

    host.fail_on("section.list", 0);
    let err = ResetEngine::new(&template, &host).reset(course).unwrap_err();
    assert_eq!(err.step(), Some(Step::ResetScan));

    host.fail_on("item.delete", 1);
    let err = ResetEngine::new(&template, &host).reset(course).unwrap_err();
    assert_eq!(err.step(), Some(Step::ResetItems));
    // One item went before the failure; nothing is restored.
    assert_eq!(host.items(course).len(), 2);

    host.fail_on("section.delete", 0);
    let err = ResetEngine::new(&template, &host).reset(course).unwrap_err();
    assert_eq!(err.step(), Some(Step::ResetSections));
}

#[test]
fn later_sections_close_up_so_reprovisioning_does_not_collide() {
    let template = Template::thesis().unwrap();
    let (host, course) = provisioned_course(&template);
    host.add_section(course, 5, "Extra");

    ResetEngine::new(&template, &host).reset(course).unwrap();
    let engine = ProvisionEngine::new(&template, &host, &host, ProvisionOptions::default());
    assert!(matches!(
        engine.provision_at(course, NOW).unwrap(),
        ProvisionOutcome::Provisioned(_)
    ));

    let (sections, _) = shape(&host, course);
    assert_eq!(
        sections,
        vec![
            (0, "".to_string()),
            (1, "Lectures".to_string()),
            (3, "Extra".to_string()),
            (4, THESIS_PREPARATION.to_string()),
            (5, THESIS_DEFENSE.to_string()),
        ]
    );
}
