//! Filename synthesis for new files named only by a task description.

/// Stem used when the task text has nothing usable.
pub const DEFAULT_STEM: &str = "script";

/// Maximum number of words joined into a stem.
const MAX_STEM_WORDS: usize = 3;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "app", "application", "are", "be", "build", "can", "code", "could", "create",
    "do", "file", "for", "from", "generate", "give", "hey", "how", "i", "in", "into", "is", "it",
    "just", "let", "lets", "make", "me", "my", "new", "now", "of", "on", "or", "please", "print",
    "program", "ruby", "say", "script", "should", "show", "simple", "some", "tell", "that", "the",
    "this", "to", "us", "want", "what", "which", "will", "with", "would", "write", "you",
];

/// Keywords preferred over other words, highest priority first.
const PRIORITY_KEYWORDS: &[&str] = &[
    "hello", "world", "calculator", "fibonacci", "factorial", "prime", "fizzbuzz", "game",
    "guess", "number", "quiz", "todo", "list", "timer", "counter", "converter", "temperature",
    "password", "generator", "random", "sort", "search", "parser", "server", "client", "weather",
    "chat", "bot", "test",
];

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .filter(|word| !STOP_WORDS.contains(&word.as_str()))
        .collect()
}

/// Derive a filename stem (no extension) from free-form task text.
///
/// Priority keywords present in the text are used first, in priority-list
/// order. Without any, the leading remaining words are used. Falls back to
/// [`DEFAULT_STEM`].
pub fn stem_for_task(task_text: &str) -> String {
    let words = tokenize(task_text);

    let keywords: Vec<&str> = PRIORITY_KEYWORDS
        .iter()
        .copied()
        .filter(|keyword| words.iter().any(|word| word == keyword))
        .take(MAX_STEM_WORDS)
        .collect();
    if !keywords.is_empty() {
        return keywords.join("_");
    }

    let leading: Vec<&str> = words.iter().take(MAX_STEM_WORDS).map(String::as_str).collect();
    if !leading.is_empty() {
        return leading.join("_");
    }

    DEFAULT_STEM.to_string()
}

/// Candidate names for `stem`: `stem.ext`, `stem_2.ext`, `stem_3.ext`, ...
pub fn numbered_candidates<'a>(stem: &'a str, extension: &'a str) -> impl Iterator<Item = String> + 'a {
    (1u32..).map(move |n| match n {
        1 => format!("{stem}.{extension}"),
        n => format!("{stem}_{n}.{extension}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_task_uses_priority_keywords() {
        assert_eq!(stem_for_task("say hello world"), "hello_world");
    }

    #[test]
    fn keywords_follow_priority_order_not_text_order() {
        assert_eq!(stem_for_task("a world of hello"), "hello_world");
        assert_eq!(stem_for_task("number guess game please"), "game_guess_number");
    }

    #[test]
    fn at_most_three_keywords() {
        assert_eq!(
            stem_for_task("hello world calculator fibonacci"),
            "hello_world_calculator"
        );
    }

    #[test]
    fn falls_back_to_leading_words() {
        assert_eq!(stem_for_task("Write a CSV merger for invoices today"), "csv_merger_invoices");
    }

    #[test]
    fn falls_back_to_default_stem() {
        assert_eq!(stem_for_task("please make it"), DEFAULT_STEM);
        assert_eq!(stem_for_task(""), DEFAULT_STEM);
    }

    #[test]
    fn candidates_start_unsuffixed_then_count_from_two() {
        let names: Vec<String> = numbered_candidates("foo", "rb").take(3).collect();
        assert_eq!(names, ["foo.rb", "foo_2.rb", "foo_3.rb"]);
    }
}
