pub mod confirm;
pub mod detail;
pub mod list;

use super::app::{App, Mode};
use super::screen::{Style, Terminal};
use std::io;

/// Draw the whole screen for the app's current state.
pub fn render(app: &App, term: &mut Terminal) -> io::Result<()> {
    term.clear()?;
    if let Some(failure) = app.failure() {
        render_failure(term, &failure.message, failure.fatal)?;
        return term.flush();
    }
    match app.mode() {
        Mode::List => list::render(app, term)?,
        Mode::Detail { lines, scroll, .. } => detail::render(lines, *scroll, term)?,
        Mode::ConfirmDelete(confirm) => confirm::render(confirm, term)?,
    }
    if let Some(err) = app.error_banner() {
        term.banner(err, Style::Error)?;
    } else if let Some(banner) = app.banner() {
        term.banner(&banner.text, Style::Success)?;
    }
    term.flush()
}

fn render_failure(term: &mut Terminal, message: &str, fatal: bool) -> io::Result<()> {
    term.move_to(1, 1)?;
    term.write_styled("Error", Style::Error)?;
    for (i, line) in message.lines().enumerate().take(term.rows.saturating_sub(3) as usize) {
        term.move_to(3 + i as u16, 1)?;
        term.write_fit(line, term.cols)?;
    }
    term.status_bar(if fatal {
        " Press any key to exit"
    } else {
        " q:quit"
    })
}
