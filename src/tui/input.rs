use std::io::{self, Read};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Backspace,
    Tab,
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Home,
    End,
    Delete,
    Ctrl(char),
}

/// Read a single keypress from stdin.
/// Returns None if no key is available (timeout expired).
pub fn read_key() -> Option<Key> {
    read_key_from(&mut io::stdin())
}

/// Decode one keypress from a raw-mode byte stream.
pub fn read_key_from<R: Read>(input: &mut R) -> Option<Key> {
    let b = next_byte(input)?;
    Some(parse_byte(b, input))
}

fn next_byte<R: Read>(input: &mut R) -> Option<u8> {
    let mut buf = [0u8; 1];
    match input.read(&mut buf) {
        Ok(1) => Some(buf[0]),
        _ => None, // timeout, no data
    }
}

fn parse_byte<R: Read>(b: u8, input: &mut R) -> Key {
    match b {
        13 | 10 => Key::Enter,
        27 => parse_escape(input),
        127 | 8 => Key::Backspace,
        9 => Key::Tab,
        b @ 1..=26 => Key::Ctrl((b'a' + b - 1) as char),
        b if (32..127).contains(&b) => Key::Char(b as char),
        _ => Key::Char('?'),
    }
}

fn parse_escape<R: Read>(input: &mut R) -> Key {
    // A bare escape is followed by nothing within the read timeout
    let Some(b) = next_byte(input) else {
        return Key::Escape;
    };
    if b != b'[' && b != b'O' {
        return Key::Escape; // not a CSI/SS3 sequence
    }

    match next_byte(input) {
        Some(b'A') => Key::Up,
        Some(b'B') => Key::Down,
        Some(b'C') => Key::Right,
        Some(b'D') => Key::Left,
        Some(b'H') => Key::Home,
        Some(b'F') => Key::End,
        // Extended sequences like ESC [ 5 ~
        Some(d @ b'0'..=b'9') => parse_csi_number(d, input),
        _ => Key::Escape,
    }
}

fn parse_csi_number<R: Read>(first_digit: u8, input: &mut R) -> Key {
    let mut num: u16 = (first_digit - b'0') as u16;

    loop {
        match next_byte(input) {
            Some(d @ b'0'..=b'9') => {
                num = num.saturating_mul(10).saturating_add((d - b'0') as u16);
            }
            Some(b'~') => {
                return match num {
                    1 | 7 => Key::Home,
                    3 => Key::Delete,
                    4 | 8 => Key::End,
                    5 => Key::PageUp,
                    6 => Key::PageDown,
                    _ => Key::Escape,
                };
            }
            _ => return Key::Escape,
        }
    }
}
