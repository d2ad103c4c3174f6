//! Slug helpers for page and section URLs.

const MAX_SLUG_LEN: usize = 80;

/// Map accented characters common in Spanish titles to ASCII before
/// slugifying, so "Sección Lobatos" becomes "seccion-lobatos".
fn fold_accent(ch: char) -> Option<char> {
    let folded = match ch {
        'á' | 'à' | 'ä' | 'Á' | 'À' | 'Ä' => 'a',
        'é' | 'è' | 'ë' | 'É' | 'È' | 'Ë' => 'e',
        'í' | 'ì' | 'ï' | 'Í' | 'Ì' | 'Ï' => 'i',
        'ó' | 'ò' | 'ö' | 'Ó' | 'Ò' | 'Ö' => 'o',
        'ú' | 'ù' | 'ü' | 'Ú' | 'Ù' | 'Ü' => 'u',
        'ñ' | 'Ñ' => 'n',
        'ç' | 'Ç' => 'c',
        _ => return None,
    };
    Some(folded)
}

/// Lowercase, accent-folded, dash-separated slug. Non-ASCII characters
/// without a fold are skipped entirely.
pub fn slugify(input: &str) -> String {
    let mut slug = String::new();
    let mut last_was_dash = false;

    for ch in input.chars() {
        let ch = fold_accent(ch).unwrap_or(ch);
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_dash = false;
        } else if ch.is_ascii() {
            if !slug.is_empty() && !last_was_dash {
                slug.push('-');
                last_was_dash = true;
            }
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basic_cases() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("foo/bar\\baz"), "foo-bar-baz");
        assert_eq!(slugify("  leading  spaces"), "leading-spaces");
    }

    #[test]
    fn slugify_folds_spanish_accents() {
        assert_eq!(slugify("Sección Lobatos"), "seccion-lobatos");
        assert_eq!(slugify("Campamento de Montaña"), "campamento-de-montana");
    }

    #[test]
    fn slugify_truncates_and_cleans() {
        let long = "a".repeat(100);
        let slug = slugify(&long);
        assert_eq!(slug.len(), MAX_SLUG_LEN);
    }

    #[test]
    fn slugify_skips_emoji() {
        assert_eq!(slugify("fiesta 🎉 mayor"), "fiesta-mayor");
    }
}
