use bf_types::{Bracket, BracketError};

/// Find the partner of the bracket at `index` by scanning the source.
///
/// From a `[` the scan runs forward, from a `]` backward. A bracket facing
/// the same way as the start deepens the nesting; an opposite bracket closes
/// one level, and is the partner when no levels are open.
///
/// Returns `Ok(None)` when `code[index]` is not a bracket (or `index` is past
/// the end), and an error when the bracket has no partner.
pub fn scan_partner(code: &[u8], index: usize) -> Result<Option<usize>, BracketError> {
    let bracket = match code.get(index).copied().and_then(Bracket::from_byte) {
        Some(bracket) => bracket,
        None => return Ok(None),
    };

    let mut depth = 0usize;
    match bracket {
        Bracket::Open => {
            for (i, &b) in code.iter().enumerate().skip(index + 1) {
                match b {
                    b']' if depth == 0 => return Ok(Some(i)),
                    b']' => depth -= 1,
                    b'[' => depth += 1,
                    _ => {}
                }
            }
        }
        Bracket::Close => {
            for i in (0..index).rev() {
                match code[i] {
                    b'[' if depth == 0 => return Ok(Some(i)),
                    b'[' => depth -= 1,
                    b']' => depth += 1,
                    _ => {}
                }
            }
        }
    }

    Err(BracketError::new(bracket, index))
}
