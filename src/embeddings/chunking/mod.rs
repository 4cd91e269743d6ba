
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Represents a chunk of content ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChunk {
    /// The content text
    pub content: String,
    /// The index of this chunk within its source record
    pub chunk_index: usize,
    /// Length in characters
    pub char_count: usize,
}

/// Configuration for content chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Characters carried over from the end of one chunk into the next
    pub chunk_overlap: usize,
    /// Separators tried in order, coarsest first; `""` splits into characters
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 300,
            chunk_overlap: 50,
            separators: vec![
                "\n\n".to_string(),
                "\n".to_string(),
                ". ".to_string(),
                " ".to_string(),
                String::new(),
            ],
        }
    }
}

/// Split `text` into overlapping chunks no longer than `config.chunk_size`
///
/// Each chunk after the first starts with the last `config.chunk_overlap`
/// characters of its predecessor (leading whitespace trimmed). Whitespace-only
/// input yields no chunks, and text no longer than `chunk_size` is a single
/// chunk. A piece that cannot be split further by any configured separator is
/// emitted as-is, even if oversized.
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<ContentChunk> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let contents = if char_len(text) <= config.chunk_size {
        vec![text.trim().to_string()]
    } else {
        // Pieces must leave room for the carried overlap
        let piece_limit = config
            .chunk_size
            .saturating_sub(config.chunk_overlap)
            .max(1);
        merge_splits(
            &split_recursive(text, &config.separators, piece_limit),
            config,
        )
    };

    let chunks: Vec<ContentChunk> = contents
        .into_iter()
        .enumerate()
        .map(|(chunk_index, content)| ContentChunk {
            char_count: char_len(&content),
            content,
            chunk_index,
        })
        .collect();

    debug!(
        "Chunked {} characters into {} chunks",
        char_len(text),
        chunks.len()
    );

    chunks
}

/// Break `text` into contiguous pieces of at most `piece_limit` characters,
/// preferring the coarsest separator present. Concatenating the pieces gives
/// back `text`.
fn split_recursive(text: &str, separators: &[String], piece_limit: usize) -> Vec<String> {
    // Pick the first separator present in the text; the rest become fallbacks
    let mut separator = separators.last().map_or("", String::as_str);
    let mut fallbacks: &[String] = &[];
    for (i, candidate) in separators.iter().enumerate() {
        if candidate.is_empty() {
            separator = "";
            break;
        }
        if text.contains(candidate.as_str()) {
            separator = candidate.as_str();
            fallbacks = &separators[i + 1..];
            break;
        }
    }

    let mut pieces = Vec::new();
    for split in split_keeping_separator(text, separator) {
        if char_len(&split) <= piece_limit || fallbacks.is_empty() {
            pieces.push(split);
        } else {
            pieces.extend(split_recursive(&split, fallbacks, piece_limit));
        }
    }
    pieces
}

/// Split on `separator`, attaching it to the start of each following piece
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }

    let mut pieces = text.split(separator);
    let mut splits = Vec::new();
    if let Some(first) = pieces.next() {
        splits.push(first.to_string());
    }
    splits.extend(pieces.map(|piece| format!("{separator}{piece}")));
    splits.retain(|s| !s.is_empty());
    splits
}

/// Greedily pack contiguous pieces into chunks of at most `chunk_size`
/// characters. Every new chunk opens on the last `chunk_overlap` characters
/// of the one before it.
fn merge_splits(splits: &[String], config: &ChunkingConfig) -> Vec<String> {
    let chars: Vec<char> = splits.iter().flat_map(|split| split.chars()).collect();
    let mut docs = Vec::new();
    // Current chunk is chars[start..end]
    let mut start = 0;
    let mut end = 0;
    // Whether the current chunk holds anything beyond the carried overlap
    let mut fresh = false;

    for split in splits {
        let piece_end = end + char_len(split);

        if fresh && piece_end - start > config.chunk_size {
            push_window(&mut docs, &chars[start..end]);
            start = end - config.chunk_overlap.min(end - start);
            fresh = false;
        }

        if piece_end - start > config.chunk_size {
            // Only reachable for pieces no separator could break up
            if piece_end - end > config.chunk_size {
                warn!(
                    "Created a chunk of size {}, which is longer than the specified {}",
                    piece_end - end,
                    config.chunk_size
                );
            }
            start = end;
        }

        end = piece_end;
        fresh = true;
    }

    if fresh {
        push_window(&mut docs, &chars[start..end]);
    }
    docs
}

fn push_window(docs: &mut Vec<String>, window: &[char]) {
    let joined: String = window.iter().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        docs.push(trimmed.to_string());
    }
}

/// Length in characters, the unit chunk sizes are expressed in
#[inline]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
