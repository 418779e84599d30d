/// True when any muted word occurs in `text`, ignoring case.
pub fn contains_muted_words<S: AsRef<str>>(text: &str, muted_words: &[S]) -> bool {
    if muted_words.is_empty() {
        return false;
    }
    let haystack = text.to_lowercase();
    muted_words
        .iter()
        .any(|word| haystack.contains(&word.as_ref().to_lowercase()))
}
