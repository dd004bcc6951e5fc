use crate::tui::screen::{Style, Terminal};
use std::io;

pub fn render(lines: &[String], scroll: usize, term: &mut Terminal) -> io::Result<()> {
    // Leave the banner row and the status bar free
    let visible_rows = (term.rows as usize).saturating_sub(2);

    for (i, line) in lines.iter().skip(scroll).take(visible_rows).enumerate() {
        term.move_to(1 + i as u16, 1)?;
        if scroll + i == 0 {
            term.write_styled(line, Style::Bold)?;
        } else {
            term.write_fit(line, term.cols)?;
        }
    }

    let last = (scroll + visible_rows).min(lines.len());
    let status = format!(
        " {}-{}/{} | q:quit ESC:back j/k:scroll d:delete",
        (scroll + 1).min(lines.len()),
        last,
        lines.len()
    );
    term.status_bar(&status)
}
