//! Raw-mode terminal on the alternate screen.

use std::io::{self, BufWriter, Stdout, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};

static RESIZED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigwinch(_: libc::c_int) {
    RESIZED.store(true, Ordering::Relaxed);
}

fn watch_resize() -> io::Result<()> {
    // SAFETY: the handler only touches an atomic.
    let rc = unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = on_sigwinch as libc::sighandler_t;
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaction(libc::SIGWINCH, &action, std::ptr::null_mut())
    };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn window_size(fd: RawFd) -> io::Result<(u16, u16)> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    if unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut ws) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok((ws.ws_row, ws.ws_col))
}

/// Terminal settings saved on entry and put back on drop.
struct RawMode {
    fd: RawFd,
    saved: libc::termios,
}

impl RawMode {
    fn enable(fd: RawFd) -> io::Result<Self> {
        let mut saved: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(fd, &mut saved) } == -1 {
            return Err(io::Error::last_os_error());
        }

        let mut raw = saved;
        raw.c_iflag &= !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
        raw.c_oflag &= !libc::OPOST;
        raw.c_cflag |= libc::CS8;
        raw.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);
        // Reads return after 100ms so the event loop can poll the backend.
        raw.c_cc[libc::VMIN] = 0;
        raw.c_cc[libc::VTIME] = 1;

        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw) } == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(RawMode { fd, saved })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        unsafe {
            libc::tcsetattr(self.fd, libc::TCSAFLUSH, &self.saved);
        }
    }
}

/// Text attributes. They add up until `Style::Plain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Plain,
    Bold,
    Dim,
    Reverse,
    Error,
    Success,
}

impl Style {
    fn sgr(self) -> &'static str {
        match self {
            Style::Plain => "\x1b[0m",
            Style::Bold => "\x1b[1m",
            Style::Dim => "\x1b[2m",
            Style::Reverse => "\x1b[7m",
            Style::Error => "\x1b[1;31m",
            Style::Success => "\x1b[1;32m",
        }
    }
}

/// The longest prefix of `s` that fits in `width` columns.
fn fit(s: &str, width: usize) -> &str {
    match s.char_indices().nth(width) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

pub struct Terminal {
    out: BufWriter<Stdout>,
    pub rows: u16,
    pub cols: u16,
    // Dropped after `out` is flushed by `Terminal::drop`.
    _raw: RawMode,
}

impl Terminal {
    pub fn new() -> io::Result<Self> {
        let raw = RawMode::enable(io::stdin().as_raw_fd())?;
        watch_resize()?;
        let (rows, cols) = window_size(io::stdout().as_raw_fd())?;

        let mut out = BufWriter::new(io::stdout());
        // Alternate screen, hidden cursor
        out.write_all(b"\x1b[?1049h\x1b[?25l")?;
        out.flush()?;

        Ok(Terminal {
            out,
            rows,
            cols,
            _raw: raw,
        })
    }

    /// Pick up a pending SIGWINCH. Returns true if the size changed.
    pub fn check_resize(&mut self) -> bool {
        if !RESIZED.swap(false, Ordering::Relaxed) {
            return false;
        }
        match window_size(io::stdout().as_raw_fd()) {
            Ok((rows, cols)) => {
                self.rows = rows;
                self.cols = cols;
                true
            }
            Err(_) => false,
        }
    }

    pub fn clear(&mut self) -> io::Result<()> {
        self.out.write_all(b"\x1b[2J\x1b[H")
    }

    pub fn move_to(&mut self, row: u16, col: u16) -> io::Result<()> {
        write!(self.out, "\x1b[{};{}H", row, col)
    }

    pub fn clear_line(&mut self) -> io::Result<()> {
        self.out.write_all(b"\x1b[K")
    }

    pub fn write_str(&mut self, s: &str) -> io::Result<()> {
        self.out.write_all(s.as_bytes())
    }

    pub fn style(&mut self, style: Style) -> io::Result<()> {
        self.out.write_all(style.sgr().as_bytes())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Write `s` cut to at most `width` characters.
    pub fn write_fit(&mut self, s: &str, width: u16) -> io::Result<()> {
        self.write_str(fit(s, width as usize))
    }

    /// Write `s` in `style` on the current row, cut to the screen width.
    pub fn write_styled(&mut self, s: &str, style: Style) -> io::Result<()> {
        self.style(style)?;
        self.write_fit(s, self.cols)?;
        self.style(Style::Plain)
    }

    /// Reverse-video bar across the last row.
    pub fn status_bar(&mut self, text: &str) -> io::Result<()> {
        let width = self.cols as usize;
        let shown = fit(text, width);
        let pad = width.saturating_sub(shown.chars().count());
        self.move_to(self.rows, 1)?;
        self.style(Style::Reverse)?;
        write!(self.out, "{}{:pad$}", shown, "", pad = pad)?;
        self.style(Style::Plain)
    }

    /// One-line message just above the status bar.
    pub fn banner(&mut self, text: &str, style: Style) -> io::Result<()> {
        let row = self.rows.saturating_sub(1);
        if row < 2 {
            return Ok(());
        }
        self.move_to(row, 1)?;
        self.clear_line()?;
        self.write_styled(&format!(" {}", text), style)
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        // Cursor back, leave the alternate screen
        let _ = self.out.write_all(b"\x1b[?25h\x1b[?1049l");
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_counts_characters() {
        assert_eq!(fit("hello", 3), "hel");
        assert_eq!(fit("hello", 5), "hello");
        assert_eq!(fit("hello", 80), "hello");
        assert_eq!(fit("h\u{e9}llo", 2), "h\u{e9}");
        assert_eq!(fit("\u{2022} More", 1), "\u{2022}");
        assert_eq!(fit("abc", 0), "");
    }

    #[test]
    fn test_style_codes() {
        assert_eq!(Style::Plain.sgr(), "\x1b[0m");
        assert_eq!(Style::Reverse.sgr(), "\x1b[7m");
        assert_eq!(Style::Error.sgr(), "\x1b[1;31m");
        assert_eq!(Style::Success.sgr(), "\x1b[1;32m");
    }
}
