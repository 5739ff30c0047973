//! Display-label naming for pooled instances

/// Build the display label for the `ordinal`-th instance of a template.
///
/// The ordinal is zero-padded to three digits, so "Card" yields "Card001",
/// "Card002", and so on (four digits and beyond are kept as-is).
///
/// # Examples
///
/// ```
/// use spawnpool::label::display_label;
///
/// assert_eq!(display_label("Card", 1), "Card001");
/// assert_eq!(display_label("Card", 42), "Card042");
/// assert_eq!(display_label("Card", 1234), "Card1234");
/// ```
pub fn display_label(template: &str, ordinal: usize) -> String {
    format!("{template}{ordinal:03}")
}
