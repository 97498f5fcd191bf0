/// Separator between the lines of a signature.
///
/// The space before the newline is part of the signatures already embedded in existing collections.
const LINE_SEPARATOR: &str = " \n";

/// Builds the text from which an item embeddings are generated.
///
/// The title (empty if absent) is the first line, followed by the description when there is one.
/// `genres` and `cast` are accepted but do not contribute to the signature yet.
pub fn build_signature(
    title: Option<&str>,
    description: Option<&str>,
    _genres: Option<&[String]>,
    _cast: Option<&[String]>,
) -> String {
    let mut lines = vec![title.unwrap_or_default()];

    if let Some(description) = description.filter(|description| !description.is_empty()) {
        lines.push(description);
    }

    lines.join(LINE_SEPARATOR)
}
