//! TUI rendering for Fairway Finder.
//!
//! This module handles all drawing with the `ratatui` crate: the landing
//! screen, loading and error screens, the consent dialog and the results
//! view (ranked list, map, details and attribution).

use crate::app::App;
use crate::map::MapView;
use crate::models::RankedResultSet;
use crate::presenter::{self, ATTRIBUTION, FORMULA};
use crate::session::SessionState;
use ratatui::{
    prelude::*,
    widgets::{canvas::*, *}, // Imports Canvas, Map, MapResolution, etc.
};

use ratatui::text::Line;

const ACCENT: Color = Color::Green;
const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Renders one frame of the TUI based on current application state.
///
/// Draws the header and footer, then the body for the current
/// [`SessionState`]. The consent dialog, when open, is drawn on top.
///
/// # Arguments
///
/// * `f` - The ratatui frame to draw into (from `terminal.draw()`).
/// * `app` - Current application state.
pub fn render(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.size());

    render_header(f, app, chunks[0]);

    match app.state() {
        SessionState::Idle => render_landing(f, chunks[1]),
        SessionState::RequestingLocation => render_loading(
            f,
            app,
            chunks[1],
            "Acquiring Location...",
            "Please allow location access.",
        ),
        SessionState::LoadingData => render_loading(
            f,
            app,
            chunks[1],
            "Ranked Search in progress...",
            &format!("Applying formula: {FORMULA}"),
        ),
        SessionState::Error(msg) => render_error(f, chunks[1], msg, None),
        SessionState::PermissionDenied(msg) => render_error(
            f,
            chunks[1],
            msg,
            Some("Answer 'y' at the prompt, or set location.ask_permission = false in config.toml."),
        ),
        SessionState::Success(results) => render_results(f, app, results, chunks[1]),
    }

    render_footer(f, app, chunks[2]);

    if app.is_prompting() {
        render_permission_prompt(f);
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(inner);

    let title = Line::from(vec![
        Span::styled(" ⛳ ", Style::default().fg(Color::Black).bg(ACCENT)),
        Span::styled(
            " Fairway Finder",
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ]);
    f.render_widget(Paragraph::new(title), cols[0]);

    if let (SessionState::Success(_), Some(updated)) = (app.state(), app.last_update) {
        let status = Line::from(vec![
            Span::styled(
                format!("Updated {} ", updated.format("%H:%M")),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled("│ r Refresh ", Style::default().fg(ACCENT)),
        ]);
        f.render_widget(Paragraph::new(status).alignment(Alignment::Right), cols[1]);
    }
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let help = if app.is_prompting() {
        " y allow   n deny   q quit"
    } else {
        match app.state() {
            SessionState::Idle => " Enter find ranges   q quit",
            SessionState::RequestingLocation | SessionState::LoadingData => " r restart search   q quit",
            SessionState::Error(_) | SessionState::PermissionDenied(_) => " r try again   q quit",
            SessionState::Success(_) => " ↑/↓ select   a analysis   r refresh   q quit",
        }
    };
    f.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

/// Splits `area` into a vertically centered band of `height` rows.
fn centered_band(area: Rect, height: u16) -> Rect {
    let top = area.height.saturating_sub(height) / 2;
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(top),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area)[1]
}

fn render_landing(f: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(Span::styled("📍", Style::default().fg(ACCENT))),
        Line::from(""),
        Line::from(vec![
            Span::styled("Find Your Perfect ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                "Practice Spot",
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Use AI to locate the best driving ranges nearby.",
            Style::default().fg(Color::Gray),
        )),
        Line::from(Span::styled(
            "We analyze ratings, facilities, and reviews instantly.",
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "  Press Enter to Find Ranges Near Me  ",
            Style::default()
                .fg(Color::Black)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD),
        )),
    ];
    f.render_widget(
        Paragraph::new(text).alignment(Alignment::Center),
        centered_band(area, 8),
    );
}

fn render_loading(f: &mut Frame, app: &App, area: Rect, title: &str, detail: &str) {
    let frame = SPINNER[app.tick_count % SPINNER.len()];
    let text = vec![
        Line::from(Span::styled(frame, Style::default().fg(ACCENT))),
        Line::from(""),
        Line::from(Span::styled(
            title.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            detail.to_string(),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    f.render_widget(
        Paragraph::new(text).alignment(Alignment::Center),
        centered_band(area, 4),
    );
}

fn render_error(f: &mut Frame, area: Rect, message: &str, remedy: Option<&str>) {
    let mut text = vec![
        Line::from(Span::styled("⚠", Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(Span::styled(
            "Oops! Something went wrong",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Gray),
        )),
    ];
    if let Some(remedy) = remedy {
        text.push(Line::from(Span::styled(
            remedy.to_string(),
            Style::default().fg(Color::DarkGray),
        )));
    }
    text.push(Line::from(""));
    text.push(Line::from(Span::styled(
        "  Press r to Try Again  ",
        Style::default().fg(Color::Black).bg(Color::White),
    )));
    f.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        centered_band(area, 8),
    );
}

/// Results view: ranked list + attribution (40%) beside map + details (60%).
fn render_results(f: &mut Frame, app: &App, results: &RankedResultSet, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(7)])
        .split(cols[0]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(cols[1]);

    // An unreadable answer may still be readable prose.
    if results.outcome.is_degraded() || app.show_analysis {
        render_analysis(f, results, left[0]);
    } else if results.is_empty() {
        render_no_results(f, left[0]);
    } else {
        render_ranked_list(f, app, results, left[0]);
    }
    render_attribution(f, results, left[1]);
    render_map(f, &app.map, app.selected_index, right[0]);
    render_details(f, app, right[1]);
}

fn render_ranked_list(f: &mut Frame, app: &App, results: &RankedResultSet, area: Rect) {
    let items: Vec<ListItem> = results
        .locations
        .iter()
        .enumerate()
        .map(|(i, loc)| {
            let name = if loc.name.is_empty() {
                "Unnamed range"
            } else {
                loc.name.as_str()
            };
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(
                        format!(" {} ", i + 1),
                        Style::default().fg(Color::White).bg(Color::Red),
                    ),
                    Span::styled(
                        format!(" {}", name),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                ]),
                Line::from(Span::styled(
                    format!("    {}", presenter::summary_line(loc)),
                    Style::default().fg(Color::Yellow),
                )),
                Line::from(Span::styled(
                    format!("    {}", presenter::short_address(&loc.address)),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(" Ranked Ranges ")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        )
        .highlight_style(Style::default().bg(Color::Rgb(20, 50, 30)));

    let mut state = ListState::default().with_selected(Some(app.selected_index));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_no_results(f: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            "No driving ranges found nearby.",
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];
    f.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title(" Ranked Ranges ")
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded),
            ),
        area,
    );
}

fn render_analysis(f: &mut Frame, results: &RankedResultSet, area: Rect) {
    let mut text = Vec::new();
    if results.outcome.is_degraded() {
        text.push(Line::from(Span::styled(
            "No ranked list could be read from this answer. Press r to try again.",
            Style::default().fg(Color::Yellow),
        )));
        text.push(Line::from(""));
    }
    if results.text.trim().is_empty() {
        text.push(Line::from(Span::styled(
            "The model returned no text.",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        text.extend(results.text.lines().map(|l| Line::from(l.to_string())));
    }

    f.render_widget(
        Paragraph::new(text).wrap(Wrap { trim: false }).block(
            Block::default()
                .title(" Gemini Analysis ")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        ),
        area,
    );
}

fn render_attribution(f: &mut Frame, results: &RankedResultSet, area: Rect) {
    let mut lines: Vec<Line> = results
        .grounding
        .as_ref()
        .map(presenter::attribution_lines)
        .unwrap_or_default()
        .into_iter()
        .map(|l| Line::from(Span::styled(l, Style::default().fg(Color::Gray))))
        .collect();
    lines.push(Line::from(Span::styled(
        ATTRIBUTION,
        Style::default().fg(Color::DarkGray),
    )));

    f.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: true }).block(
            Block::default()
                .title(" Sources ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        ),
        area,
    );
}

fn render_map(f: &mut Frame, map: &MapView, selected_index: usize, area: Rect) {
    let (x_bounds, y_bounds) = map.bounds();
    let pins: Vec<(f64, f64, usize)> = map
        .pins()
        .iter()
        .map(|p| (p.position.longitude, p.position.latitude, p.rank))
        .collect();
    let user = map.user();
    let selected_rank = selected_index + 1;

    let canvas = Canvas::default()
        .block(
            Block::default()
                .title(" Map ")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        )
        .marker(symbols::Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(move |ctx| {
            ctx.draw(&Map {
                color: Color::Rgb(50, 50, 50),
                resolution: MapResolution::High,
            });
            ctx.layer();

            for &(x, y, rank) in &pins {
                let style = if rank == selected_rank {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Yellow)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White).bg(Color::Red)
                };
                ctx.print(x, y, Line::from(Span::styled(format!("{rank}"), style)));
            }

            if let Some(user) = user {
                ctx.print(
                    user.longitude,
                    user.latitude,
                    Line::from(Span::styled("◉", Style::default().fg(Color::Cyan))),
                );
            }
        });

    f.render_widget(canvas, area);
}

fn render_details(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Details ")
        .borders(Borders::ALL)
        .padding(Padding::new(1, 1, 0, 0));

    let Some(loc) = app.selected_location() else {
        let text = vec![
            Line::from(Span::styled(
                format!("Ranked by {FORMULA}"),
                Style::default().fg(Color::DarkGray),
            )),
        ];
        f.render_widget(Paragraph::new(text).block(block), area);
        return;
    };

    let label = Style::default().add_modifier(Modifier::BOLD);
    let mut text = vec![
        Line::from(Span::styled(
            loc.name.clone(),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(loc.description.clone()),
        Line::from(""),
        Line::from(vec![
            Span::styled("Address:  ", label),
            Span::raw(loc.address.clone()),
        ]),
    ];
    if loc.rating > 0.0 {
        text.push(Line::from(vec![
            Span::styled("Rating:   ", label),
            Span::styled(
                format!("{} {:.1}", presenter::stars(loc.rating), loc.rating),
                Style::default().fg(Color::Yellow),
            ),
        ]));
    }
    text.push(Line::from(vec![
        Span::styled("Open:     ", label),
        Span::styled(
            presenter::deep_link(loc),
            Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
        ),
    ]));
    text.push(Line::from(Span::styled(
        format!("Ranked by {FORMULA}"),
        Style::default().fg(Color::DarkGray),
    )));

    f.render_widget(
        Paragraph::new(text).wrap(Wrap { trim: false }).block(block),
        area,
    );
}

/// Centered modal asking whether the location may be looked up.
fn render_permission_prompt(f: &mut Frame) {
    let area = centered_rect(60, 9, f.size());
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Fairway Finder wants to use your location.",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "It is sent to Gemini to find driving ranges near you.",
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled(" y ", Style::default().fg(Color::Black).bg(ACCENT)),
            Span::raw(" Allow    "),
            Span::styled(" n ", Style::default().fg(Color::Black).bg(Color::Red)),
            Span::raw(" Deny"),
        ]),
    ];

    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title(" Location Access ")
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(ACCENT)),
            ),
        area,
    );
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let band = centered_band(area, height);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(band)[1]
}
