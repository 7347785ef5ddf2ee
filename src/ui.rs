use crate::app::{App, CardRef, ConnectionHealth, InputMode};
use crate::model::{ContainerPort, ContainerSpec, DeploymentResource, PodResource, Workload};
use chrono::{DateTime, Local};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

const BG: Color = Color::Rgb(10, 14, 23);
const PANEL: Color = Color::Rgb(17, 24, 39);
const ACCENT: Color = Color::Rgb(74, 222, 128);
const MUTED: Color = Color::Rgb(148, 163, 184);
const WARN: Color = Color::Rgb(250, 204, 21);
const ERROR: Color = Color::Rgb(248, 113, 113);

pub fn render(frame: &mut Frame, app: &mut App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(4),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, root[0], app);
    render_filter_bar(frame, root[1], app);
    render_cards(frame, root[2], app);
    render_footer(frame, root[3], app);

    if app.show_help() {
        render_help_modal(frame);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let left = Line::from(vec![
        Span::styled(
            " armada ",
            Style::default()
                .fg(Color::Black)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  {}", app.endpoint()), Style::default().fg(MUTED)),
    ]);

    let (health_label, health_color) = connection_badge(app.connection());
    let right = Line::from(vec![
        Span::styled(
            format!("updated {}  ", human_since(app.last_updated())),
            Style::default().fg(MUTED),
        ),
        Span::styled(
            format!(" {health_label} "),
            Style::default()
                .fg(Color::Black)
                .bg(health_color)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
    ]);

    let right_width = right.width() as u16;
    if right_width >= area.width {
        frame.render_widget(Paragraph::new(left).style(Style::default().bg(BG)), area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(Paragraph::new(left).style(Style::default().bg(BG)), chunks[0]);
    frame.render_widget(
        Paragraph::new(right)
            .style(Style::default().bg(BG))
            .alignment(Alignment::Right),
        chunks[1],
    );
}

fn render_filter_bar(frame: &mut Frame, area: Rect, app: &App) {
    let criteria = app.criteria();
    let search = if criteria.search.is_empty() {
        "-".to_string()
    } else {
        criteria.search.clone()
    };
    let failed_style = if criteria.failed_only {
        Style::default().fg(WARN).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(MUTED)
    };

    let line = Line::from(vec![
        Span::styled(" cluster ", Style::default().fg(MUTED)),
        Span::styled(
            criteria.cluster.label(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::styled("   search ", Style::default().fg(MUTED)),
        Span::styled(search, Style::default().fg(Color::White)),
        Span::styled("   failed-only ", Style::default().fg(MUTED)),
        Span::styled(if criteria.failed_only { "on" } else { "off" }, failed_style),
    ]);
    frame.render_widget(Paragraph::new(line).style(Style::default().bg(PANEL)), area);
}

fn render_cards(frame: &mut Frame, area: Rect, app: &mut App) {
    // Rough cards-per-page estimate used by PageUp/PageDown.
    app.set_page_size((area.height / 4).max(1) as usize);

    let cards = app.visible_cards();
    if cards.is_empty() {
        let message = match app.last_updated() {
            None => "Waiting for the first snapshot…",
            Some(_) => "No workloads match the active filters",
        };
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                message,
                Style::default().fg(MUTED),
            )))
            .style(Style::default().bg(BG))
            .alignment(Alignment::Center),
            area,
        );
        return;
    }

    let mut lines = Vec::new();
    let mut selected_start = 0usize;
    let mut selected_end = 0usize;
    for (index, card) in cards.iter().enumerate() {
        let selected = index == app.selected();
        if selected {
            selected_start = lines.len();
        }
        push_card_lines(&mut lines, card, selected);
        if selected {
            selected_end = lines.len();
        }
        lines.push(Line::default());
    }

    let scroll = scroll_offset(selected_start, selected_end, lines.len(), area.height as usize);
    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .style(Style::default().bg(BG))
            .scroll((scroll as u16, 0)),
        area,
    );
}

fn push_card_lines(lines: &mut Vec<Line<'static>>, card: &CardRef<'_>, selected: bool) {
    let (healthy, kind, cluster, namespace, name, containers, summary) = match card {
        CardRef::Deployment {
            cluster,
            deployment,
        } => (
            deployment.is_healthy(),
            "Deployment",
            *cluster,
            deployment.namespace(),
            deployment.name(),
            deployment.containers(),
            deployment_summary(deployment),
        ),
        CardRef::Pod { cluster, pod } => (
            pod.is_healthy(),
            "Pod",
            *cluster,
            pod.namespace(),
            pod.name(),
            pod.containers(),
            pod_summary(pod),
        ),
    };

    let state_color = if healthy { ACCENT } else { ERROR };
    let mut title_style = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
    if selected {
        title_style = title_style.add_modifier(Modifier::REVERSED);
    }

    lines.push(Line::from(vec![
        Span::styled(" ● ", Style::default().fg(state_color)),
        Span::styled(format!("{kind} {namespace}/{name}"), title_style),
        Span::styled(format!("  cluster: {cluster}"), Style::default().fg(MUTED)),
    ]));

    for container in containers {
        lines.push(Line::from(Span::styled(
            format!("   {}", container_summary(container)),
            Style::default().fg(MUTED),
        )));
    }

    lines.push(Line::from(Span::styled(
        format!("   {summary}"),
        Style::default().fg(state_color),
    )));
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    match app.mode() {
        InputMode::Search => {
            frame.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled(
                        " search ",
                        Style::default().fg(Color::Black).bg(WARN),
                    ),
                    Span::styled(
                        format!(" /{}", app.input()),
                        Style::default().fg(Color::White),
                    ),
                ]))
                .style(Style::default().bg(BG)),
                area,
            );
        }
        InputMode::Command => {
            frame.render_widget(
                Paragraph::new(Line::from(vec![
                    Span::styled(
                        " command ",
                        Style::default().fg(Color::Black).bg(ACCENT),
                    ),
                    Span::styled(
                        format!(" :{}", app.input()),
                        Style::default().fg(Color::White),
                    ),
                ]))
                .style(Style::default().bg(BG)),
                area,
            );
        }
        InputMode::Normal => {
            let (deployments, pods, failing) = app.visible_counts();
            let counts = format!("{deployments} deployments · {pods} pods · {failing} failing ");
            let counts_style = if failing > 0 {
                Style::default().fg(WARN)
            } else {
                Style::default().fg(MUTED)
            };

            let right_width = (counts.chars().count() as u16).min(area.width.saturating_sub(12));
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Min(1), Constraint::Length(right_width)])
                .split(area);

            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    format!(" {}", app.status()),
                    Style::default().fg(Color::White),
                )))
                .style(Style::default().bg(BG)),
                chunks[0],
            );
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(counts, counts_style)))
                    .style(Style::default().bg(BG))
                    .alignment(Alignment::Right),
                chunks[1],
            );
        }
    }
}

fn render_help_modal(frame: &mut Frame) {
    let area = centered_rect(frame.area(), 52, 14);
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        help_line("j / k, ↓ / ↑", "select workload"),
        help_line("← / →, [ / ]", "cycle cluster selector"),
        help_line("f", "toggle failed-only"),
        help_line("/", "edit search term"),
        help_line(":", "command prompt (cluster <key>)"),
        help_line("Esc", "clear search / close help"),
        help_line("g / G", "jump to top / bottom"),
        help_line("?", "toggle this help"),
        help_line("q", "quit"),
    ];

    frame.render_widget(
        Paragraph::new(Text::from(lines)).style(Style::default().bg(PANEL)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .title(" Help "),
        ),
        area,
    );
}

fn help_line(keys: &str, description: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {keys:<16}"), Style::default().fg(ACCENT)),
        Span::styled(description.to_string(), Style::default().fg(Color::White)),
    ])
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}

fn connection_badge(health: ConnectionHealth) -> (&'static str, Color) {
    match health {
        ConnectionHealth::Waiting => ("WAITING", WARN),
        ConnectionHealth::Live => ("LIVE", ACCENT),
        ConnectionHealth::Stale => ("STALE", WARN),
        ConnectionHealth::Disconnected => ("DISCONNECTED", ERROR),
    }
}

fn human_since(updated: Option<DateTime<Local>>) -> String {
    let Some(updated) = updated else {
        return "never".to_string();
    };
    let seconds = (Local::now() - updated).num_seconds().max(0);
    if seconds < 60 {
        format!("{seconds}s ago")
    } else if seconds < 3_600 {
        format!("{}m ago", seconds / 60)
    } else {
        format!("{}h ago", seconds / 3_600)
    }
}

/// First visible line so the selected card stays fully on screen.
fn scroll_offset(card_start: usize, card_end: usize, total: usize, height: usize) -> usize {
    if total <= height || height == 0 {
        return 0;
    }
    let max_scroll = total - height;
    card_end.saturating_sub(height).min(card_start).min(max_scroll)
}

fn deployment_summary(deployment: &DeploymentResource) -> String {
    let replicas = deployment.status.replicas;
    let ready = deployment.status.ready_replicas;
    let mut summary = format!("{replicas} replica{}", plural(replicas));
    if !deployment.is_healthy() {
        let failing = replicas - ready;
        summary.push_str(&format!(" ({failing} failing replica{})", plural(failing)));
    }
    summary
}

fn pod_summary(pod: &PodResource) -> String {
    let mut summary = format!("phase: {}", pod.phase());
    if pod.is_orphaned() {
        summary.push_str(" · Orphaned pod");
    } else if let Some(owner) = pod.owner() {
        summary.push_str(&format!(" · {}/{}", owner.kind, owner.name));
    }
    summary
}

fn container_summary(container: &ContainerSpec) -> String {
    let image = if container.image.is_empty() {
        "-"
    } else {
        container.image.as_str()
    };
    let resources = &container.resources;
    let mut summary = format!(
        "{image}  cpu {}/{}  mem {}/{}",
        resources.requests.cpu(),
        resources.limits.cpu(),
        resources.requests.memory(),
        resources.limits.memory(),
    );
    if !container.ports.is_empty() {
        let ports = container
            .ports
            .iter()
            .map(port_label)
            .collect::<Vec<_>>()
            .join(", ");
        summary.push_str(&format!("  [{ports}]"));
    }
    summary
}

fn port_label(port: &ContainerPort) -> String {
    let name = if port.name.is_empty() {
        "port"
    } else {
        port.name.as_str()
    };
    format!(
        "{name} ({}/{})",
        port.container_port,
        port.protocol.to_ascii_lowercase()
    )
}

fn plural(count: i32) -> &'static str {
    if count == 1 { "" } else { "s" }
}

#[cfg(test)]
mod tests {
    use super::{container_summary, deployment_summary, pod_summary, port_label, scroll_offset};
    use crate::model::{ContainerPort, ContainerSpec, DeploymentResource, PodResource};
    use serde_json::json;

    #[test]
    fn healthy_deployment_summary_omits_failures() {
        let deployment: DeploymentResource = serde_json::from_value(json!({
            "status": {"replicas": 3, "readyReplicas": 3}
        }))
        .unwrap();
        assert_eq!(deployment_summary(&deployment), "3 replicas");
    }

    #[test]
    fn degraded_deployment_summary_counts_failing_replicas() {
        let deployment: DeploymentResource = serde_json::from_value(json!({
            "status": {"replicas": 3, "readyReplicas": 1}
        }))
        .unwrap();
        assert_eq!(
            deployment_summary(&deployment),
            "3 replicas (2 failing replicas)"
        );

        let single: DeploymentResource = serde_json::from_value(json!({
            "status": {"replicas": 1, "readyReplicas": 0}
        }))
        .unwrap();
        assert_eq!(deployment_summary(&single), "1 replica (1 failing replica)");
    }

    #[test]
    fn waiting_pod_without_owner_renders_orphaned() {
        let pod: PodResource = serde_json::from_value(json!({
            "status": {"containerStatuses": [{"state": {"waiting": {}}}]}
        }))
        .unwrap();
        assert_eq!(pod_summary(&pod), "phase: waiting · Orphaned pod");
    }

    #[test]
    fn owned_pod_renders_owner_reference() {
        let pod: PodResource = serde_json::from_value(json!({
            "metadata": {"ownerReferences": [{"kind": "ReplicaSet", "name": "web"}]},
            "status": {"containerStatuses": [{"state": {"running": {}}}]}
        }))
        .unwrap();
        assert_eq!(pod_summary(&pod), "phase: running · ReplicaSet/web");
    }

    #[test]
    fn container_summary_defaults_absent_resources_to_zero() {
        let container = ContainerSpec::default();
        assert_eq!(container_summary(&container), "-  cpu 0/0  mem 0/0");
    }

    #[test]
    fn container_summary_lists_ports() {
        let container: ContainerSpec = serde_json::from_value(json!({
            "image": "nginx:1.25",
            "ports": [{"name": "http", "containerPort": 8080, "protocol": "TCP"}],
            "resources": {"requests": {"cpu": "100m", "memory": "64Mi"},
                          "limits": {"cpu": "500m", "memory": "128Mi"}}
        }))
        .unwrap();
        assert_eq!(
            container_summary(&container),
            "nginx:1.25  cpu 100m/500m  mem 64Mi/128Mi  [http (8080/tcp)]"
        );
    }

    #[test]
    fn port_label_lowercases_protocol() {
        let port: ContainerPort =
            serde_json::from_value(json!({"name": "dns", "containerPort": 53, "protocol": "UDP"}))
                .unwrap();
        assert_eq!(port_label(&port), "dns (53/udp)");

        let unnamed: ContainerPort =
            serde_json::from_value(json!({"containerPort": 9090})).unwrap();
        assert_eq!(port_label(&unnamed), "port (9090/)");
    }

    #[test]
    fn scroll_keeps_selected_card_visible() {
        // Everything fits: no scrolling.
        assert_eq!(scroll_offset(0, 4, 10, 20), 0);
        // Selected card below the fold scrolls just enough.
        assert_eq!(scroll_offset(30, 34, 40, 20), 14);
        // Selected card at the top stays pinned.
        assert_eq!(scroll_offset(0, 4, 40, 20), 0);
        // Never scrolls past the end of the content.
        assert_eq!(scroll_offset(38, 40, 40, 20), 20);
    }
}
