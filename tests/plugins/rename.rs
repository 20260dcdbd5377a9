use coursewright::core::error::ErrorKind;
use coursewright::plugins::memory::MemoryHost;
use coursewright::plugins::rename::{RenameOutcome, RenameTarget, disambiguate, rename_course};

fn target() -> RenameTarget {
    RenameTarget {
        fullname: "State exam commission 09.03.02".to_string(),
        shortname: "SEC 09.03.02 2025".to_string(),
    }
}

#[test]
fn no_collisions_gives_exact_target() {
    let host = MemoryHost::new();
    let course = host.add_course("Draft", "draft");

    let outcome = rename_course(&host, course, &target()).unwrap();
    assert_eq!(
        outcome,
        RenameOutcome::Renamed {
            shortname: "SEC 09.03.02 2025".to_string(),
            collisions: 0,
        }
    );
    let renamed = host.course(course).unwrap();
    assert_eq!(renamed.shortname, "SEC 09.03.02 2025");
    assert_eq!(renamed.fullname, "State exam commission 09.03.02");
}

#[test]
fn collisions_append_count_plus_one() {
    let host = MemoryHost::new();
    host.add_course("A", "SEC 09.03.02 2025");
    host.add_course("B", "SEC 09.03.02 2025 2");
    host.add_course("C", "unrelated");
    let course = host.add_course("Draft", "draft");

    let outcome = rename_course(&host, course, &target()).unwrap();
    assert_eq!(
        outcome,
        RenameOutcome::Renamed {
            shortname: "SEC 09.03.02 2025 3".to_string(),
            collisions: 2,
        }
    );
}

#[test]
fn matching_shortname_is_left_alone() {
    let host = MemoryHost::new();
    host.add_course("A", "SEC 09.03.02 2025 2");
    let course = host.add_course("Already", "SEC 09.03.02 2025");

    assert_eq!(
        rename_course(&host, course, &target()).unwrap(),
        RenameOutcome::Unchanged
    );
    assert!(!host.calls().iter().any(|c| c == "course.update"));
}

#[test]
fn disambiguation_is_a_pure_function_of_target_and_count() {
    for n in 0..5 {
        let expected = if n == 0 {
            "T".to_string()
        } else {
            format!("T {}", n + 1)
        };
        assert_eq!(disambiguate("T", n), expected);
    }
}

#[test]
fn missing_course_is_not_found() {
    let host = MemoryHost::new();
    let err = rename_course(&host, 404, &target()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
