use coursewright::core::broker::read_audit_log;
use coursewright::core::error::{ErrorKind, Step};
use coursewright::core::gateway::{CapabilityGateway, NewSection, ResourceGateway, Scope, Verdict};
use coursewright::core::schemas::STANDARD_ROLES;
use coursewright::core::store::Store;
use coursewright::plugins::host::SqliteHost;
use coursewright::plugins::lockdown::LOCKED_CAPABILITIES;
use coursewright::plugins::provision::{
    ProvisionEngine, ProvisionOptions, ProvisionOutcome, Readiness,
};
use coursewright::plugins::rename::{DEFAULT_SHORTNAME, RenameOutcome, RenameTarget};
use coursewright::plugins::reset::ResetEngine;
use coursewright::plugins::template::{THESIS_DEFENSE, THESIS_PREPARATION, Template};
use tempfile::tempdir;

fn open_host(store: &Store) -> SqliteHost {
    let host = SqliteHost::open(store, "test").unwrap();
    host.seed_standard_roles().unwrap();
    host
}

#[test]
fn provision_and_reset_round_trip_on_sqlite() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let host = open_host(&store);
    let course = host.add_course("Thesis defense", "thesis").unwrap();
    let template = Template::thesis().unwrap();
    let engine = ProvisionEngine::new(&template, &host, &host, ProvisionOptions::default());

    assert_eq!(
        engine.needs_provisioning(course).unwrap(),
        Readiness::Untouched { section_count: 1 }
    );

    let report = match engine.provision_at(course, 1_000).unwrap() {
        ProvisionOutcome::Provisioned(report) => report,
        other => panic!("unexpected outcome: {other:?}"),
    };
    // One existing section, so the template lands at positions 2 and 3.
    assert_eq!(report.item_section, 3);

    let sections = host.list_sections(course).unwrap();
    let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["", THESIS_PREPARATION, THESIS_DEFENSE]);
    let items = host.list_items(course, sections[2].id).unwrap();
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|i| i.due_at == 1_000 + 30 * 86_400));
    assert_eq!(host.cache_revision(course).unwrap(), 1);

    assert!(matches!(
        engine.provision_at(course, 2_000).unwrap(),
        ProvisionOutcome::AlreadyProvisioned
    ));

    let outcome = ResetEngine::new(&template, &host).reset(course).unwrap();
    assert_eq!(outcome.sections_removed, 2);
    assert_eq!(outcome.items_removed, 3);
    assert_eq!(host.list_sections(course).unwrap().len(), 1);
    assert_eq!(host.cache_revision(course).unwrap(), 2);
    assert!(engine.needs_provisioning(course).unwrap().needs_provisioning());
}

#[test]
fn lockdown_verdicts_are_stored_per_item_scope() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let host = open_host(&store);
    let course = host.add_course("Thesis defense", "thesis").unwrap();
    let template = Template::thesis().unwrap();
    let engine = ProvisionEngine::new(&template, &host, &host, ProvisionOptions::default());

    let report = match engine.provision_at(course, 1_000).unwrap() {
        ProvisionOutcome::Provisioned(report) => report,
        other => panic!("unexpected outcome: {other:?}"),
    };
    let roles = host.list_roles().unwrap();
    assert_eq!(roles.len(), STANDARD_ROLES.len());
    assert_eq!(
        report.verdicts_written,
        report.items.len() * roles.len() * LOCKED_CAPABILITIES.len()
    );

    for item in &report.items {
        for role in &roles {
            for capability in LOCKED_CAPABILITIES {
                assert_eq!(
                    host.verdict(role.id, Scope::Item(item.id), capability).unwrap(),
                    Some(Verdict::Prohibit)
                );
            }
        }
    }
    // Nothing leaks to the course scope.
    assert_eq!(
        host.verdict(roles[0].id, Scope::Course(course), LOCKED_CAPABILITIES[0])
            .unwrap(),
        None
    );
}

#[test]
fn verdicts_are_upserted() {
    let tmp = tempdir().unwrap();
    let host = open_host(&Store::new(tmp.path()));
    let role = host.add_role("auditor", "Auditor").unwrap();
    let scope = Scope::Item(17);

    host.set_capability_verdict(role, scope, "mod/assign:grade", Verdict::Allow)
        .unwrap();
    host.set_capability_verdict(role, scope, "mod/assign:grade", Verdict::Prohibit)
        .unwrap();
    assert_eq!(
        host.verdict(role, scope, "mod/assign:grade").unwrap(),
        Some(Verdict::Prohibit)
    );
}

#[test]
fn rename_counts_cyrillic_prefix_collisions() {
    let tmp = tempdir().unwrap();
    let host = open_host(&Store::new(tmp.path()));
    host.add_course("Earlier", DEFAULT_SHORTNAME).unwrap();
    let course = host.add_course("Fresh", "fresh").unwrap();
    let template = Template::thesis().unwrap();
    let options = ProvisionOptions {
        rename: Some(RenameTarget::default()),
        ..ProvisionOptions::default()
    };
    let engine = ProvisionEngine::new(&template, &host, &host, options);

    let report = match engine.provision_at(course, 1_000).unwrap() {
        ProvisionOutcome::Provisioned(report) => report,
        other => panic!("unexpected outcome: {other:?}"),
    };
    let expected = format!("{} 2", DEFAULT_SHORTNAME);
    assert_eq!(
        report.rename,
        Some(RenameOutcome::Renamed {
            shortname: expected.clone(),
            collisions: 1,
        })
    );
    assert_eq!(host.get_course(course).unwrap().shortname, expected);
}

#[test]
fn prefix_search_is_case_sensitive() {
    let tmp = tempdir().unwrap();
    let host = open_host(&Store::new(tmp.path()));
    let a = host.add_course("A", "SEC 2025").unwrap();
    host.add_course("B", "sec 2025").unwrap();
    let c = host.add_course("C", "SEC 2025 2").unwrap();
    host.add_course("D", "SEC 2024").unwrap();

    assert_eq!(
        host.find_courses_by_shortname_prefix("SEC 2025", a).unwrap(),
        vec![c]
    );
}

#[test]
fn missing_rows_are_not_found() {
    let tmp = tempdir().unwrap();
    let host = open_host(&Store::new(tmp.path()));

    assert_eq!(host.get_course(99).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(host.delete_section(99).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(host.delete_item(99).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(
        host.rebuild_course_cache(99).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn state_survives_reopen_and_every_call_is_audited() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let course = {
        let host = open_host(&store);
        host.add_course("Persisted", "persisted").unwrap()
    };

    let host = SqliteHost::open(&store, "second").unwrap();
    assert_eq!(host.get_course(course).unwrap().shortname, "persisted");
    // Seeding twice adds nothing.
    assert_eq!(host.seed_standard_roles().unwrap(), 0);

    let events = read_audit_log(&store.root).unwrap();
    assert!(events.iter().any(|e| e.op == "host.init"));
    assert!(events.iter().any(|e| e.op == "course.add" && e.actor == "test"));
    assert!(events.iter().any(|e| e.op == "course.get" && e.actor == "second"));
    assert!(events.iter().all(|e| e.status == "success"));
    assert!(events.iter().all(|e| e.db_id == "host.db"));
}

#[test]
fn unknown_course_stops_at_the_idempotency_check() {
    let tmp = tempdir().unwrap();
    let host = open_host(&Store::new(tmp.path()));
    let template = Template::thesis().unwrap();
    let engine = ProvisionEngine::new(&template, &host, &host, ProvisionOptions::default());

    assert_eq!(host.list_sections(999).unwrap_err().kind(), ErrorKind::NotFound);
    let err = engine.provision_at(999, 1_000).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.step(), Some(Step::IdempotencyCheck));
    assert!(host.list_courses().unwrap().is_empty());
}

#[test]
fn reset_renumbers_sections_added_after_the_template() {
    let tmp = tempdir().unwrap();
    let host = open_host(&Store::new(tmp.path()));
    let course = host.add_course("Thesis defense", "thesis").unwrap();
    let template = Template::thesis().unwrap();
    let engine = ProvisionEngine::new(&template, &host, &host, ProvisionOptions::default());

    engine.provision_at(course, 1_000).unwrap();
    host.insert_section(&NewSection {
        course,
        position: 4,
        name: "Extra".to_string(),
        summary: String::new(),
        visible: true,
        availability: None,
    })
    .unwrap();
    ResetEngine::new(&template, &host).reset(course).unwrap();
    engine.provision_at(course, 2_000).unwrap();

    let positions: Vec<(u32, String)> = host
        .list_sections(course)
        .unwrap()
        .into_iter()
        .map(|s| (s.position, s.name))
        .collect();
    assert_eq!(
        positions,
        vec![
            (0, "".to_string()),
            (2, "Extra".to_string()),
            (3, THESIS_PREPARATION.to_string()),
            (4, THESIS_DEFENSE.to_string()),
        ]
    );
}
