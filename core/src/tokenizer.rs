use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Runs of letters, combining marks and digits, with inner apostrophes kept ("don't", "rock'n'roll").
    static ref RE: Regex =
        Regex::new(r"(?u)[\p{L}\p{M}\p{N}]+(?:['’][\p{L}\p{M}\p{N}]+)*").expect("valid regex");
}

/// A normalized word and its ordinal among the words of the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub position: usize,
}

/// Split text into NFKC-normalized, lowercased tokens.
///
/// The returned iterator is lazy and borrows `text`; calling `tokenize` again on the same
/// input yields the same sequence, so indexing and query evaluation see identical terms.
pub fn tokenize(text: &str) -> impl Iterator<Item = Token> + '_ {
    RE.find_iter(text)
        .map(|mat| normalize(mat.as_str()))
        .filter(|word| !word.is_empty())
        .enumerate()
        .map(|(position, text)| Token { text, position })
}

fn normalize(word: &str) -> String {
    word.nfkc().collect::<String>().to_lowercase().replace('’', "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<String> {
        tokenize(text).map(|t| t.text).collect()
    }

    #[test]
    fn splits_on_whitespace_and_punctuation() {
        assert_eq!(words("Kesä, aurinko... paistaa!"), vec!["kesä", "aurinko", "paistaa"]);
    }

    #[test]
    fn positions_are_sequential() {
        let positions: Vec<usize> = tokenize("a -- b ; c").map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn keeps_inner_apostrophes() {
        assert_eq!(words("Don’t stop 'til"), vec!["don't", "stop", "til"]);
    }

    #[test]
    fn composes_decomposed_letters() {
        assert_eq!(words("Ka\u{0308}rlek"), vec!["kärlek"]);
    }

    #[test]
    fn empty_and_symbol_only_text_has_no_tokens() {
        assert!(words("").is_empty());
        assert!(words(" :,: -- !! ").is_empty());
    }
}
