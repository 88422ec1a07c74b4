//! Ticket number generation

use rand::Rng;

/// Characters that survive being read aloud or typed from a phone screen:
/// no `0/O`, `1/I/L`.
const ALPHABET: &[u8] = b"23456789ABCDEFGHJKMNPQRSTUVWXYZ";

/// Random part length. 31^8 ≈ 8.5e11 combinations.
pub const TICKET_CODE_LEN: usize = 8;

/// Generate `<PREFIX>-XXXXXXXX`.
///
/// Uniqueness is enforced by the `tickets.ticket_number` unique index; callers
/// retry on collision.
pub fn generate_ticket_number(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let code: String = (0..TICKET_CODE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{prefix}-{code}")
}

/// Whether `s` has the shape of a ticket number with the given prefix.
pub fn is_well_formed(s: &str, prefix: &str) -> bool {
    let Some(code) = s
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
    else {
        return false;
    };
    code.len() == TICKET_CODE_LEN && code.bytes().all(|b| ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn format_and_alphabet() {
        for _ in 0..200 {
            let n = generate_ticket_number("EMS");
            assert_eq!(n.len(), "EMS-".len() + TICKET_CODE_LEN);
            assert!(is_well_formed(&n, "EMS"), "{n}");
            assert!(!n[4..].contains(['0', 'O', '1', 'I', 'L']));
        }
    }

    #[test]
    fn numbers_do_not_repeat_in_practice() {
        let set: HashSet<String> = (0..5_000).map(|_| generate_ticket_number("EMS")).collect();
        assert_eq!(set.len(), 5_000);
    }

    #[test]
    fn well_formed_rejects_bad_input() {
        assert!(!is_well_formed("EMS-ABC", "EMS"));
        assert!(!is_well_formed("XYZ-ABCDEFGH", "EMS"));
        assert!(!is_well_formed("EMS-ABCDEFG0", "EMS"));
        assert!(!is_well_formed("EMSABCDEFGHJ", "EMS"));
        assert!(is_well_formed("EMS-ABCDEFGH", "EMS"));
    }
}
