use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, Paragraph};
use ratatui::Terminal;
use ringwatch_core::{MonitorHandle, MonitorSnapshot, Notification, SampleRecord};
use tokio::sync::mpsc;

use crate::render::{device_label, heart_rate_label, oxygen_label};

struct MetricSeries {
    label: &'static str,
    color: Color,
    value: fn(&SampleRecord) -> f64,
}

fn heart_rate(sample: &SampleRecord) -> f64 {
    sample.heart_rate
}

fn oxygen_level(sample: &SampleRecord) -> f64 {
    sample.oxygen_level
}

fn steps(sample: &SampleRecord) -> f64 {
    sample.steps as f64
}

const SERIES: [MetricSeries; 3] = [
    MetricSeries {
        label: "Heart Rate (BPM)",
        color: Color::Red,
        value: heart_rate,
    },
    MetricSeries {
        label: "Blood Oxygen (%)",
        color: Color::Blue,
        value: oxygen_level,
    },
    MetricSeries {
        label: "Steps",
        color: Color::Green,
        value: steps,
    },
];

impl MetricSeries {
    fn points(&self, history: &[SampleRecord]) -> Vec<(f64, f64)> {
        history
            .iter()
            .map(|s| (s.mono_ms as f64 / 1000.0, (self.value)(s)))
            .collect()
    }
}

fn bounds(points: &[(f64, f64)]) -> [f64; 2] {
    if points.is_empty() {
        return [0.0, 1.0];
    }
    let mut min = f64::MAX;
    let mut max = f64::MIN;
    for (_, y) in points {
        min = min.min(*y);
        max = max.max(*y);
    }
    if (max - min).abs() < f64::EPSILON {
        [min - 1.0, max + 1.0]
    } else {
        let pad = (max - min) * 0.12;
        [min - pad, max + pad]
    }
}

struct ViewerState {
    snapshot: MonitorSnapshot,
    last_notification: Option<Notification>,
}

pub async fn run_viewer(
    handle: MonitorHandle,
    mut notifications: mpsc::UnboundedReceiver<Notification>,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut snapshots = handle.subscribe();
    let mut state = ViewerState {
        snapshot: handle.snapshot(),
        last_notification: None,
    };

    let run_result = async {
        loop {
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    match key.code {
                        KeyCode::Char('q') => break,
                        KeyCode::Char('c') => handle.connect().await?,
                        KeyCode::Char('d') => handle.disconnect().await?,
                        _ => {}
                    }
                }
            }

            if snapshots.has_changed().unwrap_or(false) {
                state.snapshot = snapshots.borrow_and_update().clone();
            }
            while let Ok(notification) = notifications.try_recv() {
                state.last_notification = Some(notification);
            }

            terminal.draw(|frame| draw_ui(frame.size(), frame, &state))?;
        }

        Ok::<(), anyhow::Error>(())
    }
    .await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    handle.shutdown().await?;
    run_result
}

fn draw_ui(area: Rect, frame: &mut ratatui::Frame<'_>, state: &ViewerState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    frame.render_widget(render_header(state), rows[0]);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25); 4])
        .split(rows[1]);
    let current = &state.snapshot.current;
    let card_values = [
        ("Heart Rate", heart_rate_label(current), Color::Red),
        ("Blood Oxygen", oxygen_label(current), Color::Blue),
        ("Sleep Phase", current.sleep_phase.to_string(), Color::Magenta),
        ("Steps", current.steps.to_string(), Color::Green),
    ];
    for ((title, value, color), area) in card_values.into_iter().zip(cards.iter().copied()) {
        let card = Paragraph::new(Line::from(Span::styled(
            value,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )))
        .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(card, area);
    }

    let charts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(rows[2]);
    for (series, area) in SERIES.iter().zip(charts.iter().copied()) {
        render_metric_chart(frame, area, series, &state.snapshot);
    }
}

fn render_header(state: &ViewerState) -> Paragraph<'static> {
    let snapshot = &state.snapshot;
    let status = format!(
        "status={} device={} history={}/{} decode_errors={} link_losses={}",
        snapshot.status,
        device_label(snapshot),
        snapshot.history.len(),
        snapshot.quality.capacity,
        snapshot.quality.decode_errors,
        snapshot.quality.link_losses,
    );

    let toast = match &state.last_notification {
        Some(n) => {
            let color = if n.kind.is_error() { Color::Red } else { Color::Green };
            Line::from(Span::styled(
                format!("{}: {}", n.title, n.message),
                Style::default().fg(color),
            ))
        }
        None => Line::from("'c' connect  'd' disconnect  'q' quit"),
    };

    let lines = vec![
        Line::from(vec![
            Span::styled(
                "Smart Ring Monitor  ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(status),
        ]),
        toast,
    ];

    Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status"))
}

fn render_metric_chart(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    series: &MetricSeries,
    snapshot: &MonitorSnapshot,
) {
    let points = series.points(&snapshot.history);

    let x_min = points.first().map(|(x, _)| *x).unwrap_or(0.0);
    let x_max = points
        .last()
        .map(|(x, _)| *x)
        .unwrap_or(1.0)
        .max(x_min + 1.0);
    let y_bounds = bounds(&points);

    let dataset = Dataset::default()
        .name(series.label)
        .marker(symbols::Marker::Braille)
        .graph_type(ratatui::widgets::GraphType::Line)
        .style(Style::default().fg(series.color))
        .data(&points);

    let x_mid = (x_min + x_max) / 2.0;

    let chart = Chart::new(vec![dataset])
        .block(Block::default().borders(Borders::ALL).title(series.label))
        .x_axis(
            Axis::default()
                .title("time (s)")
                .style(Style::default().fg(Color::Gray))
                .bounds([x_min, x_max])
                .labels(vec![
                    Span::raw(format!("{x_min:.0}")),
                    Span::raw(format!("{x_mid:.0}")),
                    Span::raw(format!("{x_max:.0}")),
                ]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds(y_bounds)
                .labels(vec![
                    Span::raw(format!("{:.1}", y_bounds[0])),
                    Span::raw(format!("{:.1}", (y_bounds[0] + y_bounds[1]) / 2.0)),
                    Span::raw(format!("{:.1}", y_bounds[1])),
                ]),
        );

    frame.render_widget(chart, area);
}
