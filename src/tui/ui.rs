use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use chrono::Local;

use crate::app::{App, Screen, ACCESS_TOKEN_URL};
use crate::stats::{difference_sentence, window_caption, MonthBucket};

const ADDED_COLOR: Color = Color::Cyan;
const READ_COLOR: Color = Color::Magenta;

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Screen
            Constraint::Length(1), // Status line
        ])
        .split(frame.area());

    match app.screen {
        Screen::Settings => render_settings(frame, app, chunks[0]),
        Screen::Dashboard if !app.has_token() => render_no_token(frame, chunks[0]),
        Screen::Dashboard => render_dashboard(frame, app, chunks[0]),
    }

    render_status(frame, app, chunks[1]);

    if app.range_input_active {
        render_range_input(frame, app);
    }

    if app.show_help {
        render_help(frame);
    }
}

fn render_dashboard(frame: &mut Frame, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Title bar
            Constraint::Length(16), // Totals + monthly chart
            Constraint::Min(0),     // Custom range
        ])
        .split(area);

    render_header(frame, app, rows[0]);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4), Constraint::Ratio(3, 4)])
        .split(rows[1]);

    let cards = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)])
        .split(top[0]);

    render_count_card(
        frame,
        cards[0],
        " Read articles total ",
        "Articles in your Reader archive",
        app.stats.archived_total,
    );
    render_count_card(
        frame,
        cards[1],
        &format!(" Read articles {} ", app.stats.year),
        "Articles you read this year",
        app.stats.archived_this_year,
    );
    render_monthly_chart(frame, app, top[1]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4), Constraint::Ratio(3, 4)])
        .split(rows[2]);

    render_range_card(frame, app, bottom[0]);
    render_range_chart(frame, app, bottom[1]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Your Readwise Reader Stats ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let line = if app.is_refreshing {
        Line::from(vec![
            Span::styled(app.spinner(), Style::default().fg(Color::Yellow)),
            Span::raw(" Refreshing..."),
        ])
    } else {
        Line::from(format!(
            " {} documents stored",
            app.settings().data.len()
        ))
    };

    frame.render_widget(Paragraph::new(line), inner);
}

fn render_count_card(frame: &mut Frame, area: Rect, title: &str, description: &str, count: usize) {
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let text = vec![
        Line::styled(description.to_string(), Style::default().fg(Color::DarkGray)),
        Line::from(""),
        Line::styled(
            count.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ];

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn legend() -> Line<'static> {
    Line::from(vec![
        Span::styled(" ■ Added ", Style::default().fg(ADDED_COLOR)),
        Span::styled("■ Read ", Style::default().fg(READ_COLOR)),
    ])
}

fn bar_groups(buckets: &[MonthBucket], label: fn(&MonthBucket) -> String) -> Vec<BarGroup<'static>> {
    buckets
        .iter()
        .map(|bucket| {
            let bars = [
                Bar::default()
                    .value(u64::from(bucket.articles_added))
                    .style(Style::default().fg(ADDED_COLOR)),
                Bar::default()
                    .value(u64::from(bucket.articles_read))
                    .style(Style::default().fg(READ_COLOR)),
            ];
            BarGroup::default()
                .label(Line::from(label(bucket)))
                .bars(&bars)
        })
        .collect()
}

fn bar_chart<'a>(block: Block<'a>, groups: Vec<BarGroup<'a>>) -> BarChart<'a> {
    let mut chart = BarChart::default()
        .block(block)
        .bar_width(4)
        .bar_gap(0)
        .group_gap(2)
        .value_style(Style::default().fg(Color::Black).add_modifier(Modifier::BOLD));
    for group in groups {
        chart = chart.data(group);
    }
    chart
}

fn render_monthly_chart(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Articles/Month ")
        .title_bottom(legend())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Caption
            Constraint::Min(0),    // Chart
            Constraint::Length(1), // Difference
        ])
        .split(inner);

    let caption = Paragraph::new(window_caption(&app.stats_as_of))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(caption, parts[0]);

    let groups = bar_groups(&app.stats.window, MonthBucket::short_month);
    frame.render_widget(bar_chart(Block::default(), groups), parts[1]);

    let footer = Paragraph::new(difference_sentence(app.stats.window_difference))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, parts[2]);
}

fn render_range_card(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Articles in Custom Range ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let totals = app.stats.range_totals;
    let text = vec![
        Line::styled(app.range_label(), Style::default().fg(Color::DarkGray)),
        Line::from(""),
        Line::from(vec![
            Span::styled("Added ", Style::default().fg(ADDED_COLOR)),
            Span::styled(
                totals.added.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("Read  ", Style::default().fg(READ_COLOR)),
            Span::styled(
                totals.read.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::styled(
            "c:change range  y:this year",
            Style::default().fg(Color::DarkGray),
        ),
    ];

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_range_chart(frame: &mut Frame, app: &App, area: Rect) {
    // Nothing to chart for an incomplete range
    let (Some(first), Some(last)) = (app.stats.range.first(), app.stats.range.last()) else {
        return;
    };

    let title = format!(
        " Articles/Month in Selected Range: {} - {} ",
        first.month, last.month
    );
    let block = Block::default()
        .title(title)
        .title_bottom(legend())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    let groups = bar_groups(&app.stats.range, MonthBucket::short_month_and_year);
    frame.render_widget(bar_chart(block, groups), area);
}

fn render_no_token(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" ⚠ No API token found ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let text = vec![
        Line::from(""),
        Line::from("Please add your Readwise API token in the settings to continue."),
        Line::from(""),
        Line::from(vec![
            Span::styled("s", Style::default().fg(Color::Cyan)),
            Span::raw(": open settings   "),
            Span::styled("o", Style::default().fg(Color::Cyan)),
            Span::raw(format!(": get a token at {}", ACCESS_TOKEN_URL)),
        ]),
    ];

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_settings(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Settings ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Token input
            Constraint::Length(2), // Description / validation
            Constraint::Min(0),
            Constraint::Length(2), // Storage info
        ])
        .split(inner);

    let input = Paragraph::new(format!("> {}_", app.token_input)).block(
        Block::default()
            .title(" Readwise API Token ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    );
    frame.render_widget(input, rows[0]);

    let help = match &app.token_error {
        Some(message) => Line::styled(message.clone(), Style::default().fg(Color::Red)),
        None => Line::styled(
            format!(
                "Your personal Readwise API token. Get one at {}. Enter: save  Esc: back",
                ACCESS_TOKEN_URL
            ),
            Style::default().fg(Color::DarkGray),
        ),
    };
    frame.render_widget(Paragraph::new(help).wrap(Wrap { trim: true }), rows[1]);

    let saved = app
        .last_saved
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "never".to_string());
    let info = vec![
        Line::from(format!("Size of local data: {:.2} KB", app.stored_size_kb())),
        Line::from(format!("Last saved: {}", saved)),
    ];
    frame.render_widget(
        Paragraph::new(info).style(Style::default().fg(Color::DarkGray)),
        rows[3],
    );
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let line = match &app.status {
        Some(status) if status.is_error => {
            Line::styled(status.text.clone(), Style::default().fg(Color::Red))
        }
        Some(status) => Line::styled(status.text.clone(), Style::default().fg(Color::Green)),
        None => Line::styled(
            "r:refresh  s:settings  c:range  ?:help  q:quit",
            Style::default().fg(Color::DarkGray),
        ),
    };

    frame.render_widget(Paragraph::new(line), area);
}

fn render_range_input(frame: &mut Frame, app: &App) {
    let area = centered_rect(60, 20, frame.area());

    let block = Block::default()
        .title(" Date range (YYYY-MM-DD..YYYY-MM-DD) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let inner = block.inner(area);

    // Clear the area first
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let input_text = format!("> {}_", app.range_input);
    let paragraph = Paragraph::new(input_text).style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, inner);
}

fn render_help(frame: &mut Frame) {
    let area = centered_rect(50, 60, frame.area());

    let help_text = [
        "",
        " Dashboard:",
        "   r        Refresh data from Readwise",
        "   c        Change custom date range",
        "   y        Reset range to this year",
        "",
        " Settings:",
        "   s        Open settings",
        "   o        Open the access token page",
        "   Enter    Save token",
        "   Esc      Back to dashboard",
        "",
        " General:",
        "   ?        Toggle this help",
        "   q        Quit",
        "",
        " Press any key to close",
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(help_text.join("\n"))
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
