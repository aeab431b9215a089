use crate::engine::{RuleOutcome, NOT_AVAILABLE};
use crate::model::value::format_real;
use crate::ui::app::{App, FocusPanel};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, List, ListItem, Paragraph, Row, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Table,
    },
    Frame,
};

// Brandbook colors
const BRAND_DARK: Color = Color::Rgb(0x1F, 0x2F, 0x3C); // #1f2f3c
const BRAND_SELECT_BG: Color = Color::Rgb(0xC3, 0xD3, 0xE0); // #c3d3e0
const BRAND_GREEN: Color = Color::Rgb(0x82, 0x9A, 0x68); // #829a68
const BRAND_ORANGE: Color = Color::Rgb(0x9E, 0x68, 0x3C); // #9e683c
const BRAND_RED: Color = Color::Rgb(0xA8, 0x4A, 0x3F); // #a84a3f
const BRAND_MUTED: Color = Color::Rgb(0x71, 0x65, 0x65); // #716565

// Styles
const HEADER_STYLE: Style = Style::new().fg(BRAND_DARK).add_modifier(Modifier::BOLD);
const SELECTED_STYLE: Style = Style::new()
    .bg(BRAND_SELECT_BG)
    .fg(BRAND_DARK)
    .add_modifier(Modifier::BOLD);
const COUNT_COLOR: Color = BRAND_GREEN;
const FAILED_COLOR: Color = BRAND_RED;

pub fn draw_dashboard(frame: &mut Frame, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Length(3), // Header
        Constraint::Min(10),   // Main content
        Constraint::Length(3), // Footer
    ])
    .split(frame.area());

    draw_header(frame, chunks[0], app);
    draw_main_content(frame, chunks[1], app);
    draw_footer(
        frame,
        chunks[2],
        " ←→ Panel | ↑↓ Select | Enter Element | q Quit ",
    );
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let title = format!(
        " IFC WBS | {} | {} | {} rules ({} failed) | {} elements ",
        app.run.model_label,
        app.run.project.project,
        app.run.rules.len(),
        app.run.failed(),
        app.run.matched_elements()
    );

    let header = Paragraph::new(title)
        .style(HEADER_STYLE)
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(header, area);
}

fn draw_main_content(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::horizontal([
        Constraint::Percentage(35), // Rules
        Constraint::Percentage(25), // Groups
        Constraint::Percentage(40), // Matches
    ])
    .split(area);

    draw_rules(frame, chunks[0], app);
    draw_groups(frame, chunks[1], app);
    draw_matches(frame, chunks[2], app);
}

fn border_style(is_focused: bool) -> Style {
    if is_focused {
        Style::default().fg(BRAND_ORANGE)
    } else {
        Style::default()
    }
}

fn item_style(is_selected: bool, is_focused: bool) -> Style {
    if is_selected && is_focused {
        SELECTED_STYLE
    } else if is_selected {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

fn draw_rules(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.focus_panel == FocusPanel::Rules;

    let items: Vec<ListItem> = app
        .run
        .rules
        .iter()
        .enumerate()
        .map(|(i, report)| {
            let is_selected = i == app.selected_rule;
            let marker = if is_selected && is_focused { " ◄" } else { "" };

            let (summary, summary_style) = match &report.outcome {
                RuleOutcome::Completed(result) => (
                    format!(" {} ({})", format_real(result.total), result.matches.len()),
                    Style::default().fg(COUNT_COLOR),
                ),
                RuleOutcome::Failed { .. } => (" failed".to_string(), Style::default().fg(FAILED_COLOR)),
            };

            ListItem::new(Line::from(vec![
                Span::styled(&report.code, item_style(is_selected, is_focused)),
                Span::styled(
                    format!(" {}", report.ifc_class),
                    Style::default().fg(BRAND_MUTED),
                ),
                Span::styled(summary, summary_style),
                Span::styled(marker, Style::default().fg(BRAND_ORANGE)),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(format!(" Rules ({}) ", app.run.rules.len()))
            .borders(Borders::ALL)
            .border_style(border_style(is_focused)),
    );

    frame.render_widget(list, area);
}

fn draw_groups(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.focus_panel == FocusPanel::Groups;
    let mut items: Vec<ListItem> = Vec::new();

    match app.selected_report().map(|r| &r.outcome) {
        Some(RuleOutcome::Completed(result)) => {
            let all_selected = app.selected_group == 0;
            items.push(ListItem::new(Line::from(vec![
                Span::styled("All", item_style(all_selected, is_focused)),
                Span::styled(
                    format!(" {}", format_real(result.total)),
                    Style::default().fg(COUNT_COLOR),
                ),
            ])));

            for (i, group) in result.groups.iter().enumerate() {
                let is_selected = (i + 1) == app.selected_group;
                items.push(ListItem::new(Line::from(vec![
                    Span::styled(&group.value, item_style(is_selected, is_focused)),
                    Span::styled(
                        format!(" {} ({})", format_real(group.sum), group.count),
                        Style::default().fg(COUNT_COLOR),
                    ),
                ])));
            }
        }
        Some(RuleOutcome::Failed { reason }) => {
            items.push(ListItem::new(Span::styled(
                reason.as_str(),
                Style::default().fg(FAILED_COLOR),
            )));
        }
        None => {}
    }

    let list = List::new(items).block(
        Block::default()
            .title(" Groups ")
            .borders(Borders::ALL)
            .border_style(border_style(is_focused)),
    );

    frame.render_widget(list, area);
}

fn draw_matches(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.focus_panel == FocusPanel::Matches;
    let matches = app.filtered_matches();

    // Subtract 3 for borders and header
    let visible_rows = (area.height as usize).saturating_sub(3);
    let scroll_offset = if app.selected_match >= visible_rows {
        app.selected_match - visible_rows + 1
    } else {
        0
    };

    let header = Row::new(vec!["GlobalId", "Storey", "Value"])
        .style(HEADER_STYLE)
        .height(1);

    let rows: Vec<Row> = matches
        .iter()
        .enumerate()
        .skip(scroll_offset)
        .take(visible_rows)
        .map(|(i, record)| {
            Row::new(vec![
                record.global_id.clone(),
                record.enrichment.building_storey.clone(),
                format_real(record.value),
            ])
            .style(item_style(i == app.selected_match, is_focused))
        })
        .collect();

    let widths = [
        Constraint::Percentage(50),
        Constraint::Percentage(30),
        Constraint::Percentage(20),
    ];

    let title = match app.selected_group_value() {
        Some(group) => format!(" Elements: {group} ({}) ", matches.len()),
        None => format!(" Elements ({}) ", matches.len()),
    };
    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(border_style(is_focused)),
    );

    frame.render_widget(table, area);
    draw_scrollbar(frame, area, matches.len(), app.selected_match, visible_rows);
}

fn draw_scrollbar(frame: &mut Frame, area: Rect, len: usize, position: usize, visible_rows: usize) {
    if len <= visible_rows || area.height < 3 {
        return;
    }
    let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
        .begin_symbol(Some("↑"))
        .end_symbol(Some("↓"));
    let mut scrollbar_state = ScrollbarState::new(len).position(position);

    let scrollbar_area = Rect {
        x: area.x + area.width - 1,
        y: area.y + 2,
        width: 1,
        height: area.height - 3,
    };
    frame.render_stateful_widget(scrollbar, scrollbar_area, &mut scrollbar_state);
}

fn draw_footer(frame: &mut Frame, area: Rect, help: &str) {
    let footer = Paragraph::new(help)
        .style(Style::default().fg(BRAND_MUTED))
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(footer, area);
}

pub fn draw_match_detail(frame: &mut Frame, app: &App) {
    let (Some(report), Some(record)) = (app.selected_report(), app.selected_match_record()) else {
        return;
    };

    let chunks = Layout::vertical([
        Constraint::Length(3),  // Header: element
        Constraint::Length(12), // Attributes
        Constraint::Min(5),     // Rule diagnostics (scrollable)
        Constraint::Length(3),  // Footer
    ])
    .split(frame.area());

    let count = app.filtered_matches().len();
    let header = Paragraph::new(format!(
        " {} {} | {}/{} ",
        record.class_name,
        record.global_id,
        app.selected_match + 1,
        count
    ))
    .style(HEADER_STYLE)
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, chunks[0]);

    let or_na = |value: &Option<String>| value.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let fields = [
        ("WBS code", app.code_of(record)),
        ("Rule", report.code.clone()),
        ("Predefined type", or_na(&record.predefined_type)),
        ("Object type", or_na(&record.object_type)),
        ("Group", or_na(&record.group)),
        ("Value", format_real(record.value)),
        ("Material", record.enrichment.material.clone()),
        ("Storey", record.enrichment.building_storey.clone()),
        ("Classification", record.enrichment.classification_code.clone()),
    ];
    let rows: Vec<Row> = fields
        .into_iter()
        .map(|(name, value)| Row::new(vec![name.to_string(), value]))
        .collect();
    let widths = [Constraint::Percentage(30), Constraint::Percentage(70)];
    let table = Table::new(rows, widths)
        .header(Row::new(vec!["Attribute", "Value"]).style(HEADER_STYLE))
        .block(Block::default().title(" Element ").borders(Borders::ALL));
    frame.render_widget(table, chunks[1]);

    let diagnostics = app.selected_result().map_or(&[][..], |r| r.diagnostics.as_slice());
    let visible = (chunks[2].height as usize).saturating_sub(3);
    let rows: Vec<Row> = diagnostics
        .iter()
        .skip(app.diagnostics_scroll_offset)
        .take(visible)
        .map(|d| {
            let style = if d.global_id == record.global_id {
                Style::default().fg(BRAND_ORANGE)
            } else {
                Style::default()
            };
            Row::new(vec![d.stage.to_string(), d.global_id.clone(), d.message.clone()]).style(style)
        })
        .collect();
    let widths = [
        Constraint::Length(10),
        Constraint::Percentage(30),
        Constraint::Percentage(60),
    ];
    let table = Table::new(rows, widths)
        .header(Row::new(vec!["Stage", "GlobalId", "Skipped because"]).style(HEADER_STYLE))
        .block(
            Block::default()
                .title(format!(" Rule diagnostics ({}) ", diagnostics.len()))
                .borders(Borders::ALL),
        );
    frame.render_widget(table, chunks[2]);
    draw_scrollbar(
        frame,
        chunks[2],
        diagnostics.len(),
        app.diagnostics_scroll_offset,
        visible,
    );

    draw_footer(
        frame,
        chunks[3],
        " Esc Back | ↑↓ Scroll | ←→ Element | q Quit ",
    );
}
