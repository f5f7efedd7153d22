//! Full-text search over message content.

use std::ops::Range;

use crate::model::{Conversation, Message};

/// Queries shorter than this (after trimming, in characters) match nothing.
pub const MIN_QUERY_CHARS: usize = 2;

/// One message that matched a query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub conversation_id: String,
    pub conversation_name: String,
    pub message: Message,

    /// Byte ranges of every match in `message.content`, for highlighting.
    pub match_ranges: Vec<Range<usize>>,
}

fn chars_eq(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// End of a case-insensitive match of `needle` starting at byte `start`.
fn match_at(haystack: &str, start: usize, needle: &[char]) -> Option<usize> {
    let mut chars = haystack[start..].char_indices();
    let mut end = start;
    for &expected in needle {
        let (offset, c) = chars.next()?;
        if !chars_eq(c, expected) {
            return None;
        }
        end = start + offset + c.len_utf8();
    }
    Some(end)
}

/// Non-overlapping, case-insensitive matches of `needle` in `haystack`.
pub fn match_ranges(haystack: &str, needle: &str) -> Vec<Range<usize>> {
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut ranges = Vec::new();
    let mut pos = 0;
    while pos < haystack.len() {
        match match_at(haystack, pos, &needle) {
            Some(end) => {
                ranges.push(pos..end);
                pos = end;
            }
            None => pos += haystack[pos..].chars().next().map_or(1, char::len_utf8),
        }
    }
    ranges
}

/// Search every conversation for messages containing `query`.
///
/// Hits are ordered newest first.
pub fn search_messages(conversations: &[Conversation], query: &str) -> Vec<SearchHit> {
    let query = query.trim();
    if query.chars().count() < MIN_QUERY_CHARS {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = conversations
        .iter()
        .flat_map(|conversation| {
            conversation
                .messages
                .iter()
                .filter(|m| !m.content.trim().is_empty())
                .filter_map(move |message| {
                    let ranges = match_ranges(&message.content, query);
                    (!ranges.is_empty()).then(|| SearchHit {
                        conversation_id: conversation.id.clone(),
                        conversation_name: conversation.name.clone(),
                        message: message.clone(),
                        match_ranges: ranges,
                    })
                })
        })
        .collect();

    hits.sort_by(|a, b| b.message.timestamp.cmp(&a.message.timestamp));
    log::debug!("Search for {query:?} found {} messages", hits.len());
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Persona;
    use chrono::{Duration, TimeZone, Utc};

    fn message(id: &str, minutes: i64, content: &str) -> Message {
        let base = Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, 0).unwrap();
        Message::new(
            id,
            base + Duration::minutes(minutes),
            Persona::new("p-1", "Ash"),
            content,
        )
    }

    fn conversations() -> Vec<Conversation> {
        vec![
            Conversation::new("c-1", "Morning").with_messages(vec![
                message("m-1", 0, "Rain again today"),
                message("m-2", 5, "   "),
                message("m-3", 9, "I like the rain"),
            ]),
            Conversation::new("c-2", "Evening").with_messages(vec![
                message("m-4", 3, "RAINY evening"),
                message("m-5", 4, "sunny"),
            ]),
        ]
    }

    #[test]
    fn short_queries_match_nothing() {
        assert!(search_messages(&conversations(), "r").is_empty());
        assert!(search_messages(&conversations(), "  r  ").is_empty());
        assert!(search_messages(&conversations(), "").is_empty());
    }

    #[test]
    fn case_insensitive_newest_first() {
        let hits = search_messages(&conversations(), "rain");

        let ids: Vec<_> = hits.iter().map(|h| h.message.id.as_str()).collect();
        assert_eq!(ids, vec!["m-3", "m-4", "m-1"]);
        assert_eq!(hits[1].conversation_name, "Evening");
    }

    #[test]
    fn ranges_cover_every_match() {
        let content = "Rain, rain, go away";
        let ranges = match_ranges(content, "rain");

        assert_eq!(ranges, vec![0..4, 6..10]);
        assert_eq!(&content[ranges[1].clone()], "rain");
    }

    #[test]
    fn ranges_are_byte_offsets_for_multibyte_text() {
        let content = "Él dijo ÉL";
        let ranges = match_ranges(content, "él");

        assert_eq!(ranges.len(), 2);
        assert_eq!(&content[ranges[0].clone()], "Él");
        assert_eq!(&content[ranges[1].clone()], "ÉL");
    }

    #[test]
    fn query_is_trimmed() {
        let hits = search_messages(&conversations(), "  sunny ");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].conversation_id, "c-2");
    }
}
