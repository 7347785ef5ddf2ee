use crate::filter;
use crate::input::Action;
use crate::model::{
    ClusterSelector, DeploymentResource, FilterCriteria, PodResource, Snapshot, Workload,
};
use crate::poll::PollEvent;
use chrono::{DateTime, Local};

// Connection indicator thresholds, in consecutive poll failures.
const STALE_AFTER_FAILURES: u32 = 3;
const DISCONNECTED_AFTER_FAILURES: u32 = 10;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputMode {
    Normal,
    Search,
    Command,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ConnectionHealth {
    Waiting,
    Live,
    Stale,
    Disconnected,
}

/// Side effect requested from the main loop by a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    None,
    PersistFilters,
}

/// One selectable card in the rendered list: a workload plus the cluster it
/// came from, ordered deployments first, then pods.
#[derive(Debug, Clone, Copy)]
pub enum CardRef<'a> {
    Deployment {
        cluster: &'a str,
        deployment: &'a DeploymentResource,
    },
    Pod {
        cluster: &'a str,
        pod: &'a PodResource,
    },
}

pub struct App {
    running: bool,
    mode: InputMode,
    endpoint: String,
    snapshot: Snapshot,
    visible: Snapshot,
    criteria: FilterCriteria,
    input: String,
    prior_search: String,
    status: String,
    show_help: bool,
    selected: usize,
    page_size: usize,
    last_updated: Option<DateTime<Local>>,
    consecutive_failures: u32,
    last_error: Option<String>,
}

impl App {
    pub fn new(endpoint: String, criteria: FilterCriteria) -> Self {
        Self {
            running: true,
            mode: InputMode::Normal,
            endpoint,
            snapshot: Snapshot::default(),
            visible: Snapshot::default(),
            criteria,
            input: String::new(),
            prior_search: String::new(),
            status: "Waiting for first snapshot…".to_string(),
            show_help: false,
            selected: 0,
            page_size: 5,
            last_updated: None,
            consecutive_failures: 0,
            last_error: None,
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn last_updated(&self) -> Option<DateTime<Local>> {
        self.last_updated
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn set_page_size(&mut self, rows: usize) {
        self.page_size = rows.max(1);
    }

    pub fn connection(&self) -> ConnectionHealth {
        if self.last_updated.is_none() && self.consecutive_failures < STALE_AFTER_FAILURES {
            ConnectionHealth::Waiting
        } else if self.consecutive_failures >= DISCONNECTED_AFTER_FAILURES {
            ConnectionHealth::Disconnected
        } else if self.consecutive_failures >= STALE_AFTER_FAILURES {
            ConnectionHealth::Stale
        } else {
            ConnectionHealth::Live
        }
    }

    pub fn visible_cards(&self) -> Vec<CardRef<'_>> {
        let deployments = self
            .visible
            .deployments
            .iter()
            .flat_map(|(cluster, bucket)| {
                bucket.items.iter().flatten().map(move |deployment| {
                    CardRef::Deployment {
                        cluster: cluster.as_str(),
                        deployment,
                    }
                })
            });
        let pods = self.visible.pods.iter().flat_map(|(cluster, bucket)| {
            bucket.items.iter().flatten().map(move |pod| CardRef::Pod {
                cluster: cluster.as_str(),
                pod,
            })
        });
        deployments.chain(pods).collect()
    }

    pub fn visible_counts(&self) -> (usize, usize, usize) {
        let cards = self.visible_cards();
        let deployments = cards
            .iter()
            .filter(|card| matches!(card, CardRef::Deployment { .. }))
            .count();
        let failing = cards
            .iter()
            .filter(|card| match card {
                CardRef::Deployment { deployment, .. } => !deployment.is_healthy(),
                CardRef::Pod { pod, .. } => !pod.is_healthy(),
            })
            .count();
        (deployments, cards.len() - deployments, failing)
    }

    /// Selector choices: the wildcard plus every cluster with items.
    pub fn cluster_choices(&self) -> Vec<ClusterSelector> {
        let mut choices = vec![ClusterSelector::All];
        choices.extend(
            filter::cluster_choices(&self.snapshot)
                .into_iter()
                .map(ClusterSelector::Named),
        );
        choices
    }

    pub fn apply_poll_event(&mut self, event: PollEvent) {
        match event {
            PollEvent::Snapshot(snapshot) => {
                let recovered = self.last_error.take().is_some();
                let first = self.last_updated.is_none();
                self.snapshot = snapshot;
                self.last_updated = Some(Local::now());
                self.consecutive_failures = 0;
                self.reproject();
                if recovered {
                    self.status = "Reconnected".to_string();
                } else if first {
                    self.status = "Ready".to_string();
                }
            }
            PollEvent::Failed {
                error,
                consecutive_failures,
            } => {
                // Last-known-good snapshot stays on screen; only the
                // connection indicator and status line change.
                self.consecutive_failures = consecutive_failures;
                self.status = format!("Poll failed ({consecutive_failures}x): {error}");
                self.last_error = Some(error);
            }
        }
    }

    pub fn apply_action(&mut self, action: Action) -> AppCommand {
        match self.mode {
            InputMode::Normal => self.apply_normal_action(action),
            InputMode::Search => self.apply_search_action(action),
            InputMode::Command => self.apply_command_action(action),
        }
    }

    fn apply_normal_action(&mut self, action: Action) -> AppCommand {
        match action {
            Action::Quit => {
                self.running = false;
            }
            Action::Down => self.move_selection(1),
            Action::Up => self.move_selection(-1),
            Action::PageDown => self.move_selection(self.page_size as i64),
            Action::PageUp => self.move_selection(-(self.page_size as i64)),
            Action::Top => {
                self.selected = 0;
            }
            Action::Bottom => {
                self.selected = self.card_count().saturating_sub(1);
            }
            Action::NextCluster => self.cycle_cluster(1),
            Action::PrevCluster => self.cycle_cluster(-1),
            Action::ToggleFailedOnly => {
                self.criteria.failed_only = !self.criteria.failed_only;
                self.reproject();
                self.status = if self.criteria.failed_only {
                    "Showing failed workloads only".to_string()
                } else {
                    "Showing all workloads".to_string()
                };
                return AppCommand::PersistFilters;
            }
            Action::ToggleHelp => {
                self.show_help = !self.show_help;
            }
            Action::StartSearch => {
                self.mode = InputMode::Search;
                self.prior_search = self.criteria.search.clone();
                self.input = self.criteria.search.clone();
            }
            Action::StartCommand => {
                self.mode = InputMode::Command;
                self.input.clear();
            }
            Action::ClearSearch => {
                if self.show_help {
                    self.show_help = false;
                } else if !self.criteria.search.is_empty() {
                    self.criteria.search.clear();
                    self.reproject();
                    self.status = "Search cleared".to_string();
                    return AppCommand::PersistFilters;
                }
            }
            _ => {}
        }
        AppCommand::None
    }

    // Search edits re-project immediately, mirroring the selector's
    // change-driven filtering; every edit is also persisted.
    fn apply_search_action(&mut self, action: Action) -> AppCommand {
        match action {
            Action::InputChar(c) => {
                self.input.push(c);
                self.criteria.search = self.input.clone();
                self.reproject();
                AppCommand::PersistFilters
            }
            Action::Backspace => {
                self.input.pop();
                self.criteria.search = self.input.clone();
                self.reproject();
                AppCommand::PersistFilters
            }
            Action::SubmitInput => {
                self.mode = InputMode::Normal;
                self.status = if self.criteria.search.is_empty() {
                    "Search cleared".to_string()
                } else {
                    format!("Search: {}", self.criteria.search)
                };
                AppCommand::None
            }
            Action::CancelInput => {
                let changed = self.criteria.search != self.prior_search;
                self.criteria.search = self.prior_search.clone();
                self.input.clear();
                self.mode = InputMode::Normal;
                if changed {
                    self.reproject();
                    return AppCommand::PersistFilters;
                }
                AppCommand::None
            }
            _ => AppCommand::None,
        }
    }

    fn apply_command_action(&mut self, action: Action) -> AppCommand {
        match action {
            Action::InputChar(c) => {
                self.input.push(c);
            }
            Action::Backspace => {
                self.input.pop();
            }
            Action::SubmitInput => {
                let command = self.input.trim().to_string();
                self.input.clear();
                self.mode = InputMode::Normal;
                self.run_command(&command);
            }
            Action::CancelInput => {
                self.input.clear();
                self.mode = InputMode::Normal;
            }
            _ => {}
        }
        AppCommand::None
    }

    fn run_command(&mut self, command: &str) {
        let mut tokens = command.split_whitespace();
        match tokens.next() {
            Some("cluster") => {
                let selector = ClusterSelector::from_token(tokens.next().unwrap_or("*"));
                self.status = format!("Cluster: {selector}");
                self.criteria.cluster = selector;
                self.reproject();
            }
            Some(other) => {
                self.status = format!("Unknown command: {other}");
            }
            None => {}
        }
    }

    fn cycle_cluster(&mut self, step: i64) {
        let choices = self.cluster_choices();
        if choices.len() < 2 {
            return;
        }

        let current = choices
            .iter()
            .position(|choice| *choice == self.criteria.cluster)
            .unwrap_or(0);
        let next = (current as i64 + step).rem_euclid(choices.len() as i64) as usize;
        self.criteria.cluster = choices[next].clone();
        self.status = format!("Cluster: {}", self.criteria.cluster);
        self.reproject();
    }

    fn card_count(&self) -> usize {
        self.visible
            .deployments
            .values()
            .map(|bucket| bucket.len())
            .sum::<usize>()
            + self
                .visible
                .pods
                .values()
                .map(|bucket| bucket.len())
                .sum::<usize>()
    }

    fn move_selection(&mut self, delta: i64) {
        let count = self.card_count();
        if count == 0 {
            self.selected = 0;
            return;
        }
        let target = (self.selected as i64 + delta).clamp(0, count as i64 - 1);
        self.selected = target as usize;
    }

    fn reproject(&mut self) {
        self.visible = filter::project(&self.snapshot, &self.criteria);
        self.selected = self.selected.min(self.card_count().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::{App, AppCommand, ConnectionHealth, InputMode};
    use crate::input::Action;
    use crate::model::{ClusterSelector, FilterCriteria, Snapshot};
    use crate::poll::PollEvent;
    use serde_json::json;

    fn snapshot() -> Snapshot {
        serde_json::from_value(json!({
            "deployments": {
                "east": {"items": [
                    {
                        "metadata": {"name": "api", "namespace": "prod"},
                        "status": {"replicas": 3, "readyReplicas": 3}
                    },
                    {
                        "metadata": {"name": "worker", "namespace": "batch"},
                        "status": {"replicas": 2, "readyReplicas": 0}
                    }
                ]},
                "west": {"items": [
                    {"metadata": {"name": "cache", "namespace": "prod"},
                     "status": {"replicas": 1, "readyReplicas": 1}}
                ]}
            },
            "pods": {
                "east": {"items": [
                    {"metadata": {"name": "api-abc12", "namespace": "prod",
                                  "ownerReferences": [{"kind": "ReplicaSet", "name": "api"}]},
                     "status": {"containerStatuses": [{"state": {"running": {}}}]}}
                ]}
            }
        }))
        .unwrap()
    }

    fn app_with_snapshot() -> App {
        let mut app = App::new("http://example/api".to_string(), FilterCriteria::default());
        app.apply_poll_event(PollEvent::Snapshot(snapshot()));
        app
    }

    #[test]
    fn snapshot_event_replaces_view_and_reapplies_criteria() {
        let mut app = App::new(
            "http://example/api".to_string(),
            FilterCriteria {
                cluster: ClusterSelector::All,
                search: String::new(),
                failed_only: true,
            },
        );
        app.apply_poll_event(PollEvent::Snapshot(snapshot()));

        // Only the degraded deployment survives the active failed-only filter.
        let (deployments, pods, failing) = app.visible_counts();
        assert_eq!(deployments, 1);
        assert_eq!(pods, 0);
        assert_eq!(failing, 1);
        assert_eq!(app.connection(), ConnectionHealth::Live);
    }

    #[test]
    fn failed_poll_keeps_last_snapshot_and_marks_staleness() {
        let mut app = app_with_snapshot();
        let before = app.visible_counts();

        for n in 1..=3 {
            app.apply_poll_event(PollEvent::Failed {
                error: "connection refused".to_string(),
                consecutive_failures: n,
            });
        }

        assert_eq!(app.visible_counts(), before);
        assert_eq!(app.connection(), ConnectionHealth::Stale);
        assert!(app.status().contains("connection refused"));

        app.apply_poll_event(PollEvent::Failed {
            error: "connection refused".to_string(),
            consecutive_failures: 10,
        });
        assert_eq!(app.connection(), ConnectionHealth::Disconnected);

        app.apply_poll_event(PollEvent::Snapshot(snapshot()));
        assert_eq!(app.connection(), ConnectionHealth::Live);
        assert_eq!(app.status(), "Reconnected");
    }

    #[test]
    fn toggle_failed_only_narrows_and_persists() {
        let mut app = app_with_snapshot();
        let (_, _, failing) = app.visible_counts();
        assert_eq!(failing, 1);

        let cmd = app.apply_action(Action::ToggleFailedOnly);
        assert_eq!(cmd, AppCommand::PersistFilters);
        let (deployments, pods, _) = app.visible_counts();
        assert_eq!(deployments + pods, 1);
    }

    #[test]
    fn search_edits_reproject_live() {
        let mut app = app_with_snapshot();
        app.apply_action(Action::StartSearch);
        assert_eq!(app.mode(), InputMode::Search);

        for c in "worker".chars() {
            let cmd = app.apply_action(Action::InputChar(c));
            assert_eq!(cmd, AppCommand::PersistFilters);
        }
        let (deployments, pods, _) = app.visible_counts();
        assert_eq!((deployments, pods), (1, 0));

        app.apply_action(Action::SubmitInput);
        assert_eq!(app.mode(), InputMode::Normal);
        assert_eq!(app.criteria().search, "worker");
    }

    #[test]
    fn cancelled_search_restores_prior_term() {
        let mut app = app_with_snapshot();
        app.apply_action(Action::StartSearch);
        for c in "api".chars() {
            app.apply_action(Action::InputChar(c));
        }
        let cmd = app.apply_action(Action::CancelInput);
        assert_eq!(cmd, AppCommand::PersistFilters);
        assert_eq!(app.criteria().search, "");
        let (deployments, pods, _) = app.visible_counts();
        assert_eq!((deployments, pods), (3, 1));
    }

    #[test]
    fn cluster_command_restricts_view() {
        let mut app = app_with_snapshot();
        app.apply_action(Action::StartCommand);
        for c in "cluster west".chars() {
            app.apply_action(Action::InputChar(c));
        }
        app.apply_action(Action::SubmitInput);

        assert_eq!(
            app.criteria().cluster,
            ClusterSelector::Named("west".to_string())
        );
        let (deployments, pods, _) = app.visible_counts();
        assert_eq!((deployments, pods), (1, 0));
    }

    #[test]
    fn cluster_command_with_absent_key_yields_empty_view() {
        let mut app = app_with_snapshot();
        app.apply_action(Action::StartCommand);
        for c in "cluster gone".chars() {
            app.apply_action(Action::InputChar(c));
        }
        app.apply_action(Action::SubmitInput);

        let (deployments, pods, _) = app.visible_counts();
        assert_eq!((deployments, pods), (0, 0));
        assert!(app.running());
    }

    #[test]
    fn cluster_cycling_wraps_through_wildcard_and_keys() {
        let mut app = app_with_snapshot();
        assert_eq!(app.criteria().cluster, ClusterSelector::All);

        app.apply_action(Action::NextCluster);
        assert_eq!(
            app.criteria().cluster,
            ClusterSelector::Named("east".to_string())
        );
        app.apply_action(Action::NextCluster);
        assert_eq!(
            app.criteria().cluster,
            ClusterSelector::Named("west".to_string())
        );
        app.apply_action(Action::NextCluster);
        assert_eq!(app.criteria().cluster, ClusterSelector::All);
        app.apply_action(Action::PrevCluster);
        assert_eq!(
            app.criteria().cluster,
            ClusterSelector::Named("west".to_string())
        );
    }

    #[test]
    fn selection_clamps_when_subset_shrinks() {
        let mut app = app_with_snapshot();
        app.apply_action(Action::Bottom);
        assert_eq!(app.selected(), 3);

        app.apply_action(Action::ToggleFailedOnly);
        assert_eq!(app.selected(), 0);
    }

    #[test]
    fn quit_stops_the_loop() {
        let mut app = app_with_snapshot();
        app.apply_action(Action::Quit);
        assert!(!app.running());
    }
}
