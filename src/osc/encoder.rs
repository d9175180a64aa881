//! Builders for outgoing display datagrams.
//!
//! The display collaborator accepts three shapes: a string payload (text
//! lines), a single integer (indicator color), and five integers (rectangle
//! drawing). All share the padded address + type-tag framing.

fn push_padded_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
}

/// Datagram carrying a list of i32 arguments (type tag `,i...i`).
pub fn ints_message(address: &str, values: &[i32]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(address.len() + values.len() * 4 + 16);
    push_padded_str(&mut buf, address);
    let mut tag = String::with_capacity(values.len() + 1);
    tag.push(',');
    for _ in values {
        tag.push('i');
    }
    push_padded_str(&mut buf, &tag);
    for &v in values {
        buf.extend_from_slice(&v.to_be_bytes());
    }
    buf
}

/// Datagram carrying a single string argument (type tag `,s`).
pub fn string_message(address: &str, text: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(address.len() + text.len() + 16);
    push_padded_str(&mut buf, address);
    push_padded_str(&mut buf, ",s");
    push_padded_str(&mut buf, text);
    buf
}

/// Datagram carrying one i32 (type tag `,i`).
pub fn int_message(address: &str, value: i32) -> Vec<u8> {
    ints_message(address, &[value])
}
