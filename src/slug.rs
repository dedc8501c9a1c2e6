//! # Slug Module
//!
//! Trasforma i valori dei tag in componenti di path sicuri.
//!
//! ## Regole:
//! - Traslitterazione ASCII (`deunicode`): lettere accentate, umlaut, etc.
//! - Tutto in minuscolo
//! - Apostrofi e virgolette vengono rimossi
//! - Ogni sequenza di caratteri fuori da `[a-z0-9]` diventa un singolo `_`
//! - Nessun `_` iniziale o finale

use deunicode::deunicode;

/// Turn a tag value into a lowercase ASCII slug separated by underscores
pub fn slugify(value: &str) -> String {
    let ascii = deunicode(value).to_lowercase();

    let mut slug = String::with_capacity(ascii.len());
    let mut pending_separator = false;

    for c in ascii.chars() {
        match c {
            '\'' | '"' | '`' => {}
            c if c.is_ascii_alphanumeric() => {
                if pending_separator && !slug.is_empty() {
                    slug.push('_');
                }
                pending_separator = false;
                slug.push(c);
            }
            _ => pending_separator = true,
        }
    }

    slug
}

/// Left-pad with zeros to `width`, like Python's `str.zfill`
pub fn zero_pad(value: &str, width: usize) -> String {
    format!("{:0>width$}", value, width = width)
}
