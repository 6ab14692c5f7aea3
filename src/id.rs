use nanoid::nanoid;

/// Alphabet for h4ul record identifiers: lowercase alphanumerics with the
/// ambiguous glyphs (`0`, `o`, `1`, `l`, `i`) removed so ids survive being
/// read aloud or hand-copied from a support ticket.
const RECORD_ID_ALPHABET: &[char] = &[
    '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j', 'k', 'm', 'n', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Default record id length.
const RECORD_ID_LENGTH: usize = 16;

/// Generates a new record identifier.
///
/// Ids sort randomly on purpose; creation-time ordering comes from the
/// score-indexed listings, never from the id itself.
pub fn generate_record_id() -> String {
    nanoid!(RECORD_ID_LENGTH, RECORD_ID_ALPHABET)
}
