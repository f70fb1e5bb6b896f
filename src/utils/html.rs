use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Question content comes from the remote HR API and is rendered as markup
/// by the exam page. Safe tags (like <b>, <p>, <code>) are kept while
/// dangerous tags (like <script>, <iframe>) and attributes (like onclick)
/// are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
