//! Screen layout and rendering: header, source pane, variables pane, footer,
//! and overlays. Pure rendering — all state lives in [`crate::replay::app::App`].

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};
use ratatui::Frame;

use crate::event::Event;
use crate::replay::app::{App, Mode};

/// Fixed width of the right-hand variables pane.
pub const VARS_PANE_WIDTH: u16 = 35;
/// Smallest terminal the TUI will start in. Below this, panes can't fit
/// their minimum content and the application refuses to start.
pub const MIN_WIDTH: u16 = 60;
pub const MIN_HEIGHT: u16 = 15;

const SOURCE_SCROLL_MARGIN: usize = 3;

pub fn draw(frame: &mut Frame, app: &mut App) {
    let area = frame.area();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // header
            Constraint::Min(1),    // body
            Constraint::Length(3), // footer
        ])
        .split(area);

    draw_header(frame, rows[0], app);
    draw_body(frame, rows[1], &mut *app);
    draw_footer(frame, rows[2], app);

    match &app.mode {
        Mode::Help => draw_help_overlay(frame, area),
        Mode::Timeline => draw_timeline_overlay(frame, area, app),
        Mode::Inspect(name) => draw_inspect_overlay(frame, area, app, name),
        _ => {}
    }
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let last = app.trace.len().saturating_sub(1);
    let title = Line::from(format!("retrace — Step {} / {}", app.pos, last));

    let event = app.trace.get(app.pos);
    let mut detail = String::new();
    if let Some(event) = event {
        detail.push_str(&format!("{}:{}", event.file, event.line));
        if event.scope != crate::event::MODULE_SCOPE {
            detail.push_str(&format!("  scope={}", event.scope));
        }
        if event.depth != 0 {
            detail.push_str(&format!("  depth={}", event.depth));
        }
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);
    frame.render_widget(Paragraph::new(title), rows[0]);
    frame.render_widget(Paragraph::new(Line::from(detail)), rows[1]);
}

fn draw_body(frame: &mut Frame, area: Rect, app: &mut App) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(VARS_PANE_WIDTH)])
        .split(area);

    draw_source_pane(frame, cols[0], &mut *app);
    draw_vars_pane(frame, cols[1], app);
}

fn draw_source_pane(frame: &mut Frame, area: Rect, app: &mut App) {
    let block = Block::default().borders(Borders::ALL).title("Source");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(event) = app.trace.get(app.pos) else {
        return;
    };
    let file = event.file.clone();
    let current_line = event.line as usize;
    let breakpoints = app.breakpoints.clone();
    let lines = app.source_cache.lines(&file).to_vec();

    let visible = inner.height as usize;
    let current_idx = current_line.saturating_sub(1);
    let start = scroll_start(current_idx, lines.len(), visible, SOURCE_SCROLL_MARGIN);

    let rendered: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(start)
        .take(visible)
        .map(|(idx, text)| {
            let line_no = idx + 1;
            let has_breakpoint = breakpoints.iter().any(|bp| bp.matches(&file, line_no as u32));
            let marker = if has_breakpoint { "●" } else { " " };
            let style = if idx == current_idx {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            Line::from(Span::styled(format!("{marker} {line_no:>4} {text}"), style))
        })
        .collect();

    frame.render_widget(Paragraph::new(rendered), inner);
}

/// Computes the first visible line so the current line stays within
/// `margin` lines of the top/bottom of the visible window.
fn scroll_start(current_idx: usize, total: usize, visible: usize, margin: usize) -> usize {
    if total <= visible {
        return 0;
    }
    let lower_bound = current_idx.saturating_sub(visible.saturating_sub(margin + 1));
    let max_start = total - visible;
    lower_bound.min(max_start)
}

fn draw_vars_pane(frame: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let Some(event) = app.trace.get(app.pos) else {
        return;
    };
    let changed = app.trace.changed_names(app.pos);
    let mut names: Vec<&String> = event.vars.keys().collect();
    names.sort();

    let items: Vec<ListItem> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let value = &event.vars[*name];
            let prefix = if changed.added.contains(*name) || changed.changed.contains(*name) {
                '>'
            } else if app.watches.contains(*name) {
                '@'
            } else {
                ' '
            };
            let text = format!(
                "{prefix} {}={}",
                truncate(name, 12),
                truncate(value, 18)
            );
            let style = if i == app.selected_var_index {
                Style::default().add_modifier(Modifier::BOLD).fg(Color::Yellow)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(text, style)))
        })
        .collect();
    frame.render_widget(
        List::new(items).block(Block::default().borders(Borders::ALL).title("Variables")),
        rows[0],
    );

    let watch_items: Vec<ListItem> = app
        .watches
        .iter()
        .map(|name| {
            let value = event.vars.get(name).cloned().unwrap_or_default();
            let changes = app.trace.watch_history(name).len();
            ListItem::new(format!("{name}={value} ({changes} changes)"))
        })
        .collect();
    frame.render_widget(
        List::new(watch_items).block(Block::default().borders(Borders::ALL).title("Watches")),
        rows[1],
    );
}

fn truncate(s: &str, max_len: usize) -> String {
    Event::truncate_with_ellipsis(s, max_len)
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    let hints = match app.mode {
        Mode::Normal => {
            "←/→ step  PgUp/PgDn page  Home/End  c/r bp  d diff  /,f search  g jump  b break  w watch  h help  t timeline  v inspect  q quit"
        }
        Mode::SearchPrompt => "Enter: search  Esc: cancel",
        Mode::JumpPrompt => "digits only  Enter: jump  Esc: cancel",
        Mode::BreakPrompt => "file:line  Enter: set  Esc: cancel",
        Mode::WatchPrompt => "name (empty = list)  Enter: toggle  Esc: cancel",
        Mode::Help | Mode::Timeline | Mode::Inspect(_) => "any key: dismiss",
    };
    frame.render_widget(Paragraph::new(hints), rows[0]);

    let second_line = match app.mode {
        Mode::SearchPrompt | Mode::JumpPrompt | Mode::BreakPrompt | Mode::WatchPrompt => {
            format!("> {}", app.input)
        }
        _ => app.status.clone().unwrap_or_default(),
    };
    frame.render_widget(Paragraph::new(second_line), rows[1]);

    let desc = app
        .trace
        .get(app.pos)
        .map(|e| Event::truncate_with_ellipsis(&e.desc, area.width as usize))
        .unwrap_or_default();
    frame.render_widget(Paragraph::new(desc), rows[2]);
}

fn centered_overlay(area: Rect, width_pct: u16, height_pct: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - height_pct) / 2),
            Constraint::Percentage(height_pct),
            Constraint::Percentage((100 - height_pct) / 2),
        ])
        .split(area);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_pct) / 2),
            Constraint::Percentage(width_pct),
            Constraint::Percentage((100 - width_pct) / 2),
        ])
        .split(vertical[1]);
    horizontal[1]
}

fn draw_help_overlay(frame: &mut Frame, area: Rect) {
    let overlay = centered_overlay(area, 60, 60);
    let text = "\
Navigation:
  ←/→  step backward/forward
  PgUp/PgDn  page by 10
  Home/End  jump to start/end
  c / r  continue / reverse to breakpoint
  d  show diff vs previous step

Modes:
  / or f  search      g  jump to step
  b  set breakpoint   w  watch / list watches
  h  this help        t  timeline
  v  inspect selected variable
  q / Esc  quit";
    frame.render_widget(
        Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .wrap(Wrap { trim: false }),
        overlay,
    );
}

fn draw_timeline_overlay(frame: &mut Frame, area: Rect, app: &App) {
    let overlay = centered_overlay(area, 70, 50);
    let last = app.trace.len().saturating_sub(1).max(1);
    let bar_width = overlay.width.saturating_sub(4).max(1) as usize;
    let marker_pos = ((app.pos * bar_width) / last).min(bar_width - 1);
    let mut bar = vec!['-'; bar_width];
    bar[marker_pos] = '●';
    let bar: String = bar.into_iter().collect();

    let mut lines = vec![
        Line::from(format!("[{bar}]")),
        Line::from(format!("step {} of {}", app.pos, last)),
        Line::from(""),
        Line::from("Files:"),
    ];
    lines.extend(app.trace.files().iter().map(|f| Line::from(format!("  {f}"))));
    lines.push(Line::from(""));
    lines.push(Line::from("Scopes entered:"));
    lines.extend(app.trace.scopes().iter().map(|s| Line::from(format!("  {s}"))));

    frame.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Timeline"))
            .wrap(Wrap { trim: false }),
        overlay,
    );
}

fn draw_inspect_overlay(frame: &mut Frame, area: Rect, app: &App, name: &str) {
    let overlay = centered_overlay(area, 60, 60);
    let current_value = app
        .trace
        .get(app.pos)
        .and_then(|e| e.vars.get(name))
        .cloned()
        .unwrap_or_default();

    let mut lines = vec![
        Line::from(format!("Inspecting: {name}")),
        Line::from(format!("Current value: {current_value}")),
        Line::from(""),
        Line::from("History:"),
    ];
    for (step, value) in app.trace.watch_history(name) {
        let marker = if step as usize == app.pos { "-> " } else { "   " };
        lines.push(Line::from(format!("{marker}[{step}] {value}")));
    }

    frame.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Inspect"))
            .wrap(Wrap { trim: false }),
        overlay,
    );
}
