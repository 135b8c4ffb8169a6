use crate::models::Priority;
use chrono::NaiveDate;
use regex::Regex;
use std::ops::Range;

#[derive(Debug, PartialEq)]
pub struct ParsedTodo {
    pub text: String,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
}

/// Pulls quick-add markers out of the compose line.
///
/// `!high`, `!medium`, `!low` (or `!h`, `!m`, `!l`) set the priority and
/// `due:YYYY-MM-DD` sets the due date. Only the first valid marker of each
/// kind is taken, and only taken markers leave the text. Everything else,
/// whitespace included, is kept as typed.
pub fn parse_todo_input(input: &str) -> ParsedTodo {
    let priority_re = Regex::new(r"(?i)(?:^|\s)!(high|medium|low|h|m|l)\b").unwrap();
    let due_re = Regex::new(r"(?:^|\s)due:(\S+)").unwrap();

    let priority_marker = priority_re.captures_iter(input).find_map(|caps| {
        let priority = caps.get(1)?.as_str().parse::<Priority>().ok()?;
        Some((caps.get(0)?.range(), priority))
    });
    let due_marker = due_re.captures_iter(input).find_map(|caps| {
        let day = NaiveDate::parse_from_str(caps.get(1)?.as_str(), "%Y-%m-%d").ok()?;
        Some((caps.get(0)?.range(), day))
    });

    let mut taken: Vec<Range<usize>> = priority_marker
        .iter()
        .map(|(span, _)| span.clone())
        .chain(due_marker.iter().map(|(span, _)| span.clone()))
        .collect();
    taken.sort_by_key(|span| std::cmp::Reverse(span.start));

    let mut text = input.to_string();
    for span in taken {
        let mut end = span.end;
        // A marker at the very start has no leading separator; drop the
        // trailing one instead.
        if span.start == 0 {
            if let Some(c) = text[end..].chars().next().filter(|c| c.is_whitespace()) {
                end += c.len_utf8();
            }
        }
        text.replace_range(span.start..end, "");
    }

    ParsedTodo {
        text,
        priority: priority_marker.map(|(_, priority)| priority),
        due_date: due_marker.map(|(_, day)| day),
    }
}
