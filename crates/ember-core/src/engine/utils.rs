/// Move every complete character from `staging` into `out`. An incomplete
/// trailing sequence stays staged for the next fragment; bytes that can never
/// form a character become U+FFFD.
pub(super) fn drain_complete_utf8(staging: &mut Vec<u8>, out: &mut String) {
    loop {
        let err = match std::str::from_utf8(staging) {
            Ok(s) => {
                out.push_str(s);
                staging.clear();
                return;
            }
            Err(e) => e,
        };
        let valid = err.valid_up_to();
        out.push_str(std::str::from_utf8(&staging[..valid]).unwrap_or_default());
        match err.error_len() {
            Some(bad) => {
                out.push(char::REPLACEMENT_CHARACTER);
                staging.drain(..valid + bad);
            }
            None => {
                staging.drain(..valid);
                return;
            }
        }
    }
}

/// Prompt tokens kept after truncation: `max(256, n_ctx - max_tokens - 8)`.
pub(crate) fn prompt_window(n_ctx: u32, max_tokens: u32) -> usize {
    const FLOOR: i64 = 256;
    const RESERVE: i64 = 8;
    let room = i64::from(n_ctx) - i64::from(max_tokens) - RESERVE;
    room.max(FLOOR) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_keeps_incomplete_tail() {
        let mut staging = vec![b'h', 0xC3];
        let mut out = String::new();
        drain_complete_utf8(&mut staging, &mut out);
        assert_eq!(out, "h");
        assert_eq!(staging, vec![0xC3]);

        staging.push(0xA9);
        drain_complete_utf8(&mut staging, &mut out);
        assert_eq!(out, "hé");
        assert!(staging.is_empty());
    }

    #[test]
    fn drain_replaces_garbage() {
        let mut staging = vec![b'a', 0xFF, b'b'];
        let mut out = String::new();
        drain_complete_utf8(&mut staging, &mut out);
        assert_eq!(out, "a\u{FFFD}b");
        assert!(staging.is_empty());
    }

    #[test]
    fn window_has_floor() {
        assert_eq!(prompt_window(2048, 256), 2048 - 256 - 8);
        assert_eq!(prompt_window(512, 400), 256);
        assert_eq!(prompt_window(128, 1_000_000), 256);
    }
}
