use super::*;

fn size(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).expect("test chunk size should be non-zero")
}

fn texts(chunks: &[Chunk]) -> Vec<&str> {
    chunks.iter().map(|c| c.text.as_str()).collect()
}

#[test]
fn groups_words_in_order() {
    let chunks = chunk_text("a b c d e", size(2));

    assert_eq!(texts(&chunks), vec!["a b", "c d", "e"]);
    assert_eq!(
        chunks.iter().map(|c| c.index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert_eq!(
        chunks.iter().map(|c| c.word_count).collect::<Vec<_>>(),
        vec![2, 2, 1]
    );
}

#[test]
fn default_chunk_size_is_thirty_words() {
    let text = (0..65).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
    let chunks = chunk_note(&text, &ChunkingConfig::default());

    assert_eq!(chunks.len(), 3);
    assert_eq!(
        chunks.iter().map(|c| c.word_count).collect::<Vec<_>>(),
        vec![30, 30, 5]
    );
    assert!(chunks[0].text.starts_with("w0 w1"));
    assert!(chunks[2].text.ends_with("w64"));
}

#[test]
fn rejoining_chunks_reconstructs_normalized_text() {
    let text = "  The quick\tbrown fox\n\njumps over   the lazy dog ";
    let chunks = chunk_text(text, size(3));

    let rejoined = texts(&chunks).join(" ");
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    assert_eq!(rejoined, normalized);
}

#[test]
fn chunk_count_is_word_count_divided_rounding_up() {
    let text = "one two three four five six seven";
    for chunk_size in 1..=9 {
        let chunks = chunk_text(text, size(chunk_size));
        assert_eq!(chunks.len(), 7_usize.div_ceil(chunk_size), "size {}", chunk_size);
    }
}

#[test]
fn empty_input_yields_one_empty_chunk() {
    for input in ["", "   ", "\n\t"] {
        let chunks = chunk_text(input, size(30));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "");
        assert_eq!(chunks[0].word_count, 0);
    }
}

#[test]
fn chunk_larger_than_text_returns_whole_text() {
    let chunks = chunk_text("hello world", size(30));
    assert_eq!(texts(&chunks), vec!["hello world"]);
}
