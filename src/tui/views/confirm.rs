use crate::render;
use crate::tui::app::{Choice, DeleteConfirm};
use crate::tui::screen::{Style, Terminal};
use std::io;

const PROMPT_WIDTH: usize = 50;

pub fn render(confirm: &DeleteConfirm, term: &mut Terminal) -> io::Result<()> {
    let top = (term.rows / 2).saturating_sub(3).max(1);

    term.move_to(top, 3)?;
    term.style(Style::Bold)?;
    term.write_fit("Delete this message?", term.cols.saturating_sub(2))?;
    term.style(Style::Plain)?;

    term.move_to(top + 2, 3)?;
    let subject = render::truncate(&confirm.target.subject, PROMPT_WIDTH);
    term.write_fit(&format!("Subject: {}", subject), term.cols.saturating_sub(2))?;
    term.move_to(top + 3, 3)?;
    let from = render::truncate(&confirm.target.from, PROMPT_WIDTH);
    term.write_fit(&format!("From:    {}", from), term.cols.saturating_sub(2))?;

    term.move_to(top + 5, 3)?;
    if confirm.deleting {
        term.style(Style::Dim)?;
        term.write_str("Deleting...")?;
        term.style(Style::Plain)?;
        return term.status_bar(" Deleting... | q:quit");
    }

    for (choice, label) in [(Choice::No, " No "), (Choice::Yes, " Yes ")] {
        if confirm.choice == choice {
            term.style(Style::Reverse)?;
        }
        term.write_str(label)?;
        term.style(Style::Plain)?;
        term.write_str("   ")?;
    }
    term.status_bar(" \u{2190}/\u{2192}:choose RET:confirm ESC:cancel")
}
