use crate::osc::pad4;

/// Arguments retained from a single datagram; anything past this is read
/// for validation but ignored.
const MAX_ARGS: usize = 8;

/// A decoded control message, one per incoming datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Key event: `index` 1–24 maps to a note, index 0 is the aux button.
    Key { index: i32, velocity: i32 },
    /// The five panel knobs, raw 0–1023 each.
    Knobs { values: [i32; 5] },
    /// Aux button event.
    Aux { value: i32 },
    /// Request loop termination.
    Quit,
}

/// Bounds-checked cursor over one datagram. Every read validates against
/// the remaining length first; a read past the end returns `None` and the
/// caller drops the datagram.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Read a NUL-terminated string and skip its padding, leaving the
    /// cursor on the next 4-byte boundary. Fails if no NUL is found or the
    /// padded field would run past the end of the datagram.
    fn padded_str(&mut self) -> Option<&'a str> {
        let rest = self.data.get(self.pos..)?;
        let nul = rest.iter().position(|&b| b == 0)?;
        let field_end = self.pos + pad4(nul + 1);
        if field_end > self.data.len() {
            return None;
        }
        let s = std::str::from_utf8(&rest[..nul]).ok()?;
        self.pos = field_end;
        Some(s)
    }

    fn be_i32(&mut self) -> Option<i32> {
        let bytes = self.data.get(self.pos..self.pos + 4)?;
        self.pos += 4;
        Some(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

/// Decode one control datagram. Returns `None` for anything malformed,
/// truncated, or simply unrecognized; the caller treats all three the
/// same way and moves on.
pub fn decode(datagram: &[u8]) -> Option<Command> {
    let mut reader = Reader::new(datagram);
    let address = reader.padded_str()?;
    let type_tag = reader.padded_str()?;
    if !type_tag.starts_with(',') {
        return None;
    }

    // One argument per declared tag entry. Arguments cut off by the end of
    // the datagram simply aren't available; whether that makes the message
    // malformed depends on how many the address requires.
    let declared = type_tag.len() - 1;
    let mut args = [0i32; MAX_ARGS];
    let mut count = 0usize;
    for _ in 0..declared {
        match reader.be_i32() {
            Some(value) => {
                if count < MAX_ARGS {
                    args[count] = value;
                    count += 1;
                }
            }
            None => break,
        }
    }

    match address {
        "/key" if count >= 2 => Some(Command::Key {
            index: args[0],
            velocity: args[1],
        }),
        "/knobs" if count >= 5 => Some(Command::Knobs {
            values: [args[0], args[1], args[2], args[3], args[4]],
        }),
        "/aux" if count >= 1 => Some(Command::Aux { value: args[0] }),
        "/quit" => Some(Command::Quit),
        _ => None,
    }
}
