//! Integration tests for the resolution engine.
//!
//! These exercise the directory cache, identity resolver, and task locator
//! together over fake collaborators and a manual clock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use asana_tasks::api::AsanaApi;
use asana_tasks::clock::Clock;
use asana_tasks::domain::{dates, DirectoryCache, IdentityResolver, TaskLocator};
use asana_tasks::entities::{
    CreateTaskRequest, MemberRef, ProjectSummary, TaskDetails, TaskMatch, TaskSummary,
    UpdateTaskRequest, WorkspaceMember,
};
use asana_tasks::errors::{ApiError, LocateError};

/// Fake Asana collaborator backed by in-memory members and tasks. Either side
/// can be switched to failing to exercise degraded paths.
struct FakeAsana {
    members: Mutex<Result<Vec<WorkspaceMember>, ()>>,
    tasks: Mutex<Result<Vec<TaskSummary>, ()>>,
    member_fetches: AtomicUsize,
}

impl FakeAsana {
    fn new(members: Vec<WorkspaceMember>, tasks: Vec<TaskSummary>) -> Self {
        Self {
            members: Mutex::new(Ok(members)),
            tasks: Mutex::new(Ok(tasks)),
            member_fetches: AtomicUsize::new(0),
        }
    }

    fn fail_members(&self) {
        *self.members.lock().unwrap() = Err(());
    }

    fn fail_search(&self) {
        *self.tasks.lock().unwrap() = Err(());
    }

    fn member_fetches(&self) -> usize {
        self.member_fetches.load(Ordering::SeqCst)
    }
}

fn unavailable() -> ApiError {
    ApiError::Api {
        status: 503,
        message: "service unavailable".to_string(),
    }
}

#[async_trait]
impl AsanaApi for FakeAsana {
    async fn workspace_members(&self) -> Result<Vec<WorkspaceMember>, ApiError> {
        self.member_fetches.fetch_add(1, Ordering::SeqCst);
        self.members
            .lock()
            .unwrap()
            .clone()
            .map_err(|()| unavailable())
    }

    async fn search_tasks(
        &self,
        _project_gid: Option<&str>,
        text: &str,
        completed: bool,
    ) -> Result<Vec<TaskSummary>, ApiError> {
        // Loose full-text behavior: the upstream search returns a superset,
        // tokens matching anywhere; the locator does the strict filtering.
        let needle = text.to_lowercase();
        let first_token = needle.split_whitespace().next().unwrap_or("").to_string();
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .clone()
            .map_err(|()| unavailable())?
            .into_iter()
            .filter(|t| t.completed == completed)
            .filter(|t| t.name.to_lowercase().contains(&first_token))
            .collect())
    }

    async fn create_task(&self, _req: &CreateTaskRequest) -> Result<TaskDetails, ApiError> {
        Err(unavailable())
    }

    async fn update_task(
        &self,
        _task_gid: &str,
        _req: &UpdateTaskRequest,
    ) -> Result<TaskDetails, ApiError> {
        Err(unavailable())
    }

    async fn get_task(&self, _task_gid: &str) -> Result<TaskDetails, ApiError> {
        Err(unavailable())
    }

    async fn list_projects(&self) -> Result<Vec<ProjectSummary>, ApiError> {
        Ok(vec![])
    }
}

struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap()),
        }
    }

    fn advance_secs(&self, secs: i64) {
        *self.now.lock().unwrap() += Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

fn member(gid: &str, name: &str, email: &str) -> WorkspaceMember {
    WorkspaceMember {
        gid: gid.to_string(),
        name: name.to_string(),
        email: email.to_string(),
    }
}

fn task(gid: &str, name: &str) -> TaskSummary {
    TaskSummary {
        gid: gid.to_string(),
        name: name.to_string(),
        completed: false,
    }
}

fn resolver_over(api: Arc<FakeAsana>, clock: Arc<ManualClock>) -> IdentityResolver {
    let directory = Arc::new(DirectoryCache::new(
        api as Arc<dyn AsanaApi>,
        clock as Arc<dyn Clock>,
    ));
    IdentityResolver::new(directory)
}

/// Identity resolution against a populated directory
mod identity_tests {
    use super::*;

    fn jane_only() -> Arc<FakeAsana> {
        Arc::new(FakeAsana::new(
            vec![member("111", "Jane Doe", "jane@x.com")],
            vec![],
        ))
    }

    #[tokio::test]
    async fn exact_alias_matches_deterministically() {
        let resolver = resolver_over(jane_only(), Arc::new(ManualClock::new()));
        for reference in ["jane", "Jane", "JANE DOE", "jane@x.com"] {
            assert_eq!(
                resolver.resolve(reference).await,
                MemberRef::Resolved("111".to_string()),
                "failed for: {reference}"
            );
        }
    }

    #[tokio::test]
    async fn partial_name_resolves_by_containment() {
        let resolver = resolver_over(jane_only(), Arc::new(ManualClock::new()));
        assert_eq!(
            resolver.resolve("Jane D").await,
            MemberRef::Resolved("111".to_string())
        );
    }

    #[tokio::test]
    async fn canonical_gid_passes_through_without_a_fetch() {
        let api = jane_only();
        let resolver = resolver_over(Arc::clone(&api), Arc::new(ManualClock::new()));
        assert_eq!(
            resolver.resolve("120011223344").await,
            MemberRef::Resolved("120011223344".to_string())
        );
        assert_eq!(api.member_fetches(), 0);
    }

    #[tokio::test]
    async fn short_numeric_input_resolves_via_gid_self_alias() {
        // "111" is only 3 digits, so it goes through the cache, where the
        // member's own gid is an exact alias.
        let resolver = resolver_over(jane_only(), Arc::new(ManualClock::new()));
        assert_eq!(
            resolver.resolve("111").await,
            MemberRef::Resolved("111".to_string())
        );
    }

    #[tokio::test]
    async fn unmatched_input_comes_back_unmodified() {
        let resolver = resolver_over(jane_only(), Arc::new(ManualClock::new()));
        assert_eq!(
            resolver.resolve("Zebulon Q. Featherstonehaugh").await,
            MemberRef::Unresolved("Zebulon Q. Featherstonehaugh".to_string())
        );
    }

    #[tokio::test]
    async fn low_scoring_containment_is_rejected() {
        // "j" is contained in "jane doe" but 1/8 is below the threshold.
        let resolver = resolver_over(jane_only(), Arc::new(ManualClock::new()));
        assert_eq!(
            resolver.resolve("j").await,
            MemberRef::Unresolved("j".to_string())
        );
    }

    #[tokio::test]
    async fn shared_alias_goes_to_the_later_member() {
        let api = Arc::new(FakeAsana::new(
            vec![
                member("1", "John Smith", "smith@x.com"),
                member("2", "John Jones", "jones@x.com"),
            ],
            vec![],
        ));
        let resolver = resolver_over(api, Arc::new(ManualClock::new()));
        // Both members derive the alias "john"; last write wins.
        assert_eq!(
            resolver.resolve("john").await,
            MemberRef::Resolved("2".to_string())
        );
        // Full names stay unambiguous.
        assert_eq!(
            resolver.resolve("John Smith").await,
            MemberRef::Resolved("1".to_string())
        );
    }

    #[tokio::test]
    async fn score_ties_break_on_lexicographically_smallest_alias() {
        // "ann" is contained in both "anna" and "annb" with the same score;
        // ascending alias order makes "anna" the winner regardless of the
        // order members arrive in.
        let members = vec![
            member("9", "Annb Late", "annb@x.com"),
            member("8", "Anna Early", "anna@x.com"),
        ];
        let api = Arc::new(FakeAsana::new(members, vec![]));
        let resolver = resolver_over(api, Arc::new(ManualClock::new()));
        assert_eq!(
            resolver.resolve("ann").await,
            MemberRef::Resolved("8".to_string())
        );
    }

    #[tokio::test]
    async fn directory_failure_after_good_fetch_still_resolves() {
        let api = jane_only();
        let clock = Arc::new(ManualClock::new());
        let resolver = resolver_over(Arc::clone(&api), Arc::clone(&clock));

        assert_eq!(
            resolver.resolve("jane").await,
            MemberRef::Resolved("111".to_string())
        );

        api.fail_members();
        clock.advance_secs(7200); // past the default TTL
        assert_eq!(
            resolver.resolve("jane").await,
            MemberRef::Resolved("111".to_string())
        );
    }

    #[tokio::test]
    async fn directory_failure_with_no_snapshot_passes_input_through() {
        let api = Arc::new(FakeAsana::new(vec![], vec![]));
        api.fail_members();
        let resolver = resolver_over(api, Arc::new(ManualClock::new()));
        assert_eq!(
            resolver.resolve("jane").await,
            MemberRef::Unresolved("jane".to_string())
        );
    }

    #[tokio::test]
    async fn fresh_cache_is_reused_across_resolutions() {
        let api = jane_only();
        let resolver = resolver_over(Arc::clone(&api), Arc::new(ManualClock::new()));

        resolver.resolve("jane").await;
        resolver.resolve("jane doe").await;
        resolver.resolve("nobody at all").await;
        assert_eq!(api.member_fetches(), 1);
    }
}

/// Cache invalidation through the directory service
mod invalidation_tests {
    use super::*;

    #[tokio::test]
    async fn invalidation_forces_exactly_one_refetch() {
        let api = Arc::new(FakeAsana::new(
            vec![member("111", "Jane Doe", "jane@x.com")],
            vec![],
        ));
        let clock = Arc::new(ManualClock::new());
        let directory = Arc::new(DirectoryCache::new(
            Arc::clone(&api) as Arc<dyn AsanaApi>,
            clock as Arc<dyn Clock>,
        ));
        let resolver = IdentityResolver::new(Arc::clone(&directory));

        resolver.resolve("jane").await;
        directory.invalidate().await;
        resolver.resolve("jane").await;
        resolver.resolve("jane").await;
        assert_eq!(api.member_fetches(), 2);
    }
}

/// Task location within a project scope
mod locate_tests {
    use super::*;

    fn report_tasks() -> Arc<FakeAsana> {
        Arc::new(FakeAsana::new(
            vec![],
            vec![
                task("9001", "Write report"),
                task("9002", "Write summary"),
            ],
        ))
    }

    #[tokio::test]
    async fn exact_title_is_found() {
        let locator = TaskLocator::new(report_tasks());
        assert_eq!(
            locator.locate("Write report", "777").await.unwrap(),
            TaskMatch::Found("9001".to_string())
        );
    }

    #[tokio::test]
    async fn shared_prefix_is_ambiguous_with_both_candidates() {
        let locator = TaskLocator::new(report_tasks());
        match locator.locate("write", "777").await.unwrap() {
            TaskMatch::Ambiguous(candidates) => {
                let gids: Vec<_> = candidates.iter().map(|c| c.gid.as_str()).collect();
                assert_eq!(gids, vec!["9001", "9002"]);
            }
            other => panic!("expected Ambiguous, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn ambiguous_list_is_capped_at_five() {
        let tasks: Vec<_> = (0..8)
            .map(|i| task(&format!("90{i:02}"), &format!("Write chapter {i}")))
            .collect();
        let locator = TaskLocator::new(Arc::new(FakeAsana::new(vec![], tasks)));
        match locator.locate("write", "777").await.unwrap() {
            TaskMatch::Ambiguous(candidates) => assert_eq!(candidates.len(), 5),
            other => panic!("expected Ambiguous, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_match_in_empty_scope_is_not_found() {
        let locator = TaskLocator::new(Arc::new(FakeAsana::new(vec![], vec![])));
        assert_eq!(
            locator.locate("nonexistent", "777").await.unwrap(),
            TaskMatch::NotFound
        );
    }

    #[tokio::test]
    async fn canonical_gid_is_found_without_a_search() {
        let api = Arc::new(FakeAsana::new(vec![], vec![]));
        api.fail_search(); // would error if consulted
        let locator = TaskLocator::new(api);
        assert_eq!(
            locator.locate("120011223344", "777").await.unwrap(),
            TaskMatch::Found("120011223344".to_string())
        );
    }

    #[tokio::test]
    async fn completed_tasks_are_excluded() {
        let mut done = task("9003", "Write report");
        done.completed = true;
        let locator = TaskLocator::new(Arc::new(FakeAsana::new(vec![], vec![done])));
        assert_eq!(
            locator.locate("Write report", "777").await.unwrap(),
            TaskMatch::NotFound
        );
    }

    #[tokio::test]
    async fn search_failure_surfaces_as_provider_unavailable() {
        let api = report_tasks();
        api.fail_search();
        let locator = TaskLocator::new(api);
        let err = locator.locate("write", "777").await.unwrap_err();
        assert!(matches!(err, LocateError::ProviderUnavailable(_)));
    }
}

/// Date normalization properties
mod date_tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn relative_expressions_track_the_given_date() {
        assert_eq!(dates::normalize("today", today()), "2024-03-15");
        assert_eq!(dates::normalize("3 days", today()), "2024-03-18");
    }

    #[test]
    fn ambiguous_dates_prefer_month_first() {
        assert_eq!(dates::normalize("02/13/2024", today()), "2024-02-13");
        assert_eq!(dates::normalize("13/02/2024", today()), "2024-02-13");
    }
}
