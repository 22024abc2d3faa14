use ammonia;

/// Cleans admin-authored question content with the ammonia whitelist.
///
/// Safe formatting tags (<b>, <p>, <code>) survive; <script>, <iframe> and
/// event-handler attributes are stripped. Exam takers' clients render this
/// text as HTML.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

pub fn clean_optional(input: Option<&str>) -> Option<String> {
    input.map(clean_html)
}
