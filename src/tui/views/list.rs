use crate::render;
use crate::tui::app::{App, ListItem};
use crate::tui::screen::{Style, Terminal};
use std::io;

const LOAD_MORE_LABEL: &str = "Load More Emails...";
const LOADING_MORE_LABEL: &str = "Loading more emails...";

fn title(app: &App) -> String {
    let index = app.index();
    let mut title = format!(
        "{}: {} of {} messages",
        app.mailbox(),
        index.len(),
        index.total()
    );
    if index.more_available() {
        title.push_str(" \u{2022} More available");
    }
    if let Some(filter) = app.filter() {
        title.push_str(&format!(" \u{2022} /{}", filter.query));
    }
    title
}

fn status(app: &App, rows: usize) -> String {
    match app.filter() {
        Some(filter) if filter.editing => {
            format!(" /{}_ | RET:apply ESC:clear", filter.query)
        }
        _ if app.is_loading() => " Loading... | q:quit".to_string(),
        _ if rows == 0 => " q:quit r:refresh /:search".to_string(),
        _ => format!(
            " {}/{} | q:quit j/k:move RET:open d:delete r:refresh /:search",
            app.cursor() + 1,
            rows
        ),
    }
}

pub fn render(app: &App, term: &mut Terminal) -> io::Result<()> {
    term.move_to(1, 1)?;
    term.write_styled(&title(app), Style::Bold)?;

    term.move_to(2, 1)?;
    term.write_str(&"-".repeat(term.cols as usize))?;

    let rows = app.rows();
    if app.is_loading() && app.index().is_empty() {
        term.move_to(3, 1)?;
        term.write_fit("Loading emails...", term.cols)?;
    } else if rows.is_empty() {
        term.move_to(3, 1)?;
        let empty = if app.filter().is_some() {
            "No messages match."
        } else {
            "No messages."
        };
        term.write_fit(empty, term.cols)?;
    } else {
        // Header, separator, banner row, status bar
        let max_items = (term.rows as usize).saturating_sub(4).max(1);
        let cursor = app.cursor();
        let scroll_offset = (cursor + 1).saturating_sub(max_items);

        for (i, row) in rows.iter().skip(scroll_offset).take(max_items).enumerate() {
            term.move_to(3 + i as u16, 1)?;
            let selected = scroll_offset + i == cursor;
            if selected {
                term.style(Style::Reverse)?;
            }
            match row {
                ListItem::Message(message) => {
                    if !message.seen {
                        term.style(Style::Bold)?;
                    }
                    let line = render::list_row(message, term.cols as usize);
                    term.write_fit(&line, term.cols)?;
                }
                ListItem::LoadMore => {
                    if !selected {
                        term.style(Style::Dim)?;
                    }
                    let label = if app.is_loading_more() {
                        LOADING_MORE_LABEL
                    } else {
                        LOAD_MORE_LABEL
                    };
                    term.write_fit(&format!("   {}", label), term.cols)?;
                }
            }
            term.style(Style::Plain)?;
        }
    }

    term.status_bar(&status(app, rows.len()))
}
