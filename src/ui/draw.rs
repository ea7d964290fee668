use anyhow::Result;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::{Frame, Terminal};
// Use Popup from tui-widgets to render modals
use tui_widgets::popup::Popup;

use crate::form::{FieldRow, Focus};

use super::app::App;

const FOOTER_HELP: &str =
    "C-s: save  C-q/Esc: quit  Tab: next field  C-n: add row  C-d: remove row  C-l: label";
const CONFIRM_HELP: &str = "y/Enter: confirm  n/Esc: cancel";

const LABEL_COLUMN: usize = 12;
const ROW_INDENT: usize = 4;

pub fn render<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    terminal.draw(|frame| draw_frame(frame, app))?;
    Ok(())
}

fn draw_frame(frame: &mut Frame<'_>, app: &mut App) {
    let size = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    draw_header(frame, layout[0], app);
    draw_form(frame, layout[1], app);
    draw_footer(frame, layout[2], app);
    draw_confirm_modal(frame, size, app);
}

fn draw_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let header_style = Style::default().add_modifier(Modifier::BOLD);
    let mut spans = vec![Span::styled(app.title().to_string(), header_style)];
    if let Some(path) = app.source_display() {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(
            format!("FILE://{path}"),
            Style::default().add_modifier(Modifier::DIM),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_footer(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let line = match app.status_text() {
        Some(status) => Line::from(Span::styled(
            status.to_string(),
            Style::default().add_modifier(Modifier::REVERSED),
        )),
        None => Line::from(Span::styled(
            FOOTER_HELP,
            Style::default().add_modifier(Modifier::DIM),
        )),
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_form(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let form = &app.form;
    let mut lines: Vec<Line> = Vec::new();
    // (line index, column where the input value starts, visual cursor)
    let mut cursor: Option<(usize, usize, usize)> = None;

    push_input_line(
        &mut lines,
        &mut cursor,
        "Name",
        form.name.value(),
        None,
        form.focus == Focus::Name,
        form.name.visual_cursor(),
    );
    push_input_line(
        &mut lines,
        &mut cursor,
        "Address",
        form.address.text.value(),
        Some(&form.address.label),
        form.focus == Focus::Address,
        form.address.text.visual_cursor(),
    );

    lines.push(Line::default());
    lines.push(section_line("Phones"));
    push_rows(&mut lines, &mut cursor, &form.phones, |index| {
        form.focus == Focus::Phone(index)
    });

    lines.push(Line::default());
    lines.push(section_line("Mails"));
    push_rows(&mut lines, &mut cursor, &form.mails, |index| {
        form.focus == Focus::Mail(index)
    });

    lines.push(Line::default());
    push_input_line(
        &mut lines,
        &mut cursor,
        "Comments",
        form.comments.value(),
        None,
        form.focus == Focus::Comments,
        form.comments.visual_cursor(),
    );

    frame.render_widget(Paragraph::new(lines), area);

    // Hardware cursor on the focused input, unless a modal is on top
    if app.confirm_modal.is_none() {
        if let Some((line_index, value_col, visual)) = cursor {
            let x = area.x.saturating_add((value_col + visual) as u16);
            let y = area.y.saturating_add(line_index as u16);
            if y < area.y.saturating_add(area.height) {
                frame.set_cursor_position((x, y));
            }
        }
    }
}

fn section_line(title: &str) -> Line<'static> {
    Line::from(Span::styled(
        format!("{title}:"),
        Style::default().add_modifier(Modifier::UNDERLINED),
    ))
}

#[allow(clippy::too_many_arguments)]
fn push_input_line(
    lines: &mut Vec<Line>,
    cursor: &mut Option<(usize, usize, usize)>,
    label: &str,
    value: &str,
    category: Option<&str>,
    focused: bool,
    visual_cursor: usize,
) {
    let value_col = LABEL_COLUMN;
    let mut spans = vec![
        Span::raw(format!("{label:<width$}", width = LABEL_COLUMN)),
        Span::styled(value.to_string(), value_style(focused)),
    ];
    if let Some(category) = category {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("[{category}]"),
            Style::default().add_modifier(Modifier::DIM),
        ));
    }
    if focused {
        *cursor = Some((lines.len(), value_col, visual_cursor));
    }
    lines.push(Line::from(spans));
}

fn push_rows<F>(
    lines: &mut Vec<Line>,
    cursor: &mut Option<(usize, usize, usize)>,
    rows: &[FieldRow],
    is_focused: F,
) where
    F: Fn(usize) -> bool,
{
    for (index, row) in rows.iter().enumerate() {
        let focused = is_focused(index);
        if focused {
            *cursor = Some((lines.len(), ROW_INDENT, row.text.visual_cursor()));
        }
        lines.push(Line::from(vec![
            Span::raw(" ".repeat(ROW_INDENT)),
            Span::styled(row.text.value().to_string(), value_style(focused)),
            Span::raw("  "),
            Span::styled(
                format!("[{}]", row.label),
                Style::default().add_modifier(Modifier::DIM),
            ),
        ]));
    }
}

fn value_style(focused: bool) -> Style {
    if focused {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

fn draw_confirm_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(modal) = app.confirm_modal.as_ref() else {
        return;
    };

    let lines = vec![
        Line::from(modal.message.clone()),
        Line::from("".to_string()),
        Line::from(CONFIRM_HELP.to_string()),
    ];
    let body_text = ratatui::text::Text::from(lines);

    let title_line = Line::from(Span::styled(
        modal.title.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    ));
    let popup = Popup::new(body_text)
        .title(title_line)
        .border_style(Style::default());

    frame.render_stateful_widget_ref(popup, area, &mut app.modal_popup);
}
