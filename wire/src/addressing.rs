//! Pure block addressing arithmetic shared by every node.

/// Stable key a block is stored and located under.
pub fn block_key(file_id: &str, block_number: u64) -> String {
    format!("{file_id}_{block_number}")
}

/// Number of blocks a file of `file_size` bytes occupies. An empty file still
/// occupies one (empty) block so it remains addressable.
pub fn block_count(file_size: u64, block_size: u64) -> u64 {
    if file_size == 0 {
        return 1;
    }
    file_size.div_ceil(block_size)
}

/// Byte range `[start, end)` of one block within its file. The last block of a
/// file is usually short.
pub fn block_span(file_size: u64, block_size: u64, block_number: u64) -> (u64, u64) {
    let start = (block_number - 1) * block_size;
    let end = (block_number * block_size).min(file_size);
    (start, end.max(start))
}

/// Stable file identifier derived from the remote name. A retried `put` of the
/// same name maps to the same block keys and overwrites cleanly.
pub fn file_id(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn block_count_is_an_exact_ceiling() {
        assert_eq!(block_count(10, 4), 3);
        assert_eq!(block_count(8, 4), 2);
        assert_eq!(block_count(1, 4), 1);
        assert_eq!(block_count(9, 4), 3);
    }

    #[test]
    fn empty_file_still_occupies_one_block() {
        assert_eq!(block_count(0, 4), 1);
        assert_eq!(block_span(0, 4, 1), (0, 0));
    }

    #[test]
    fn block_key_is_file_id_and_number() {
        assert_eq!(block_key("a.txt", 1), "a.txt_1");
        assert_eq!(block_key("a.txt", 3), "a.txt_3");
    }

    #[test]
    fn spans_cover_the_file_without_overlap() {
        assert_eq!(block_span(10, 4, 1), (0, 4));
        assert_eq!(block_span(10, 4, 2), (4, 8));
        assert_eq!(block_span(10, 4, 3), (8, 10));
    }

    #[test]
    fn file_ids_are_filesystem_safe() {
        assert_eq!(file_id("a.txt"), "a.txt");
        assert_eq!(file_id("dir/a b.txt"), "dir_a_b.txt");
    }
}
