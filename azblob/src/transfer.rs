//! Transfer planning for large blobs.
//!
//! Blobs above the single-request ceiling are uploaded as staged blocks and
//! committed in one final request. Planning is deterministic: the same
//! length always yields the same blocks with the same identifiers, so a
//! retried upload restages and recommits the exact same plan.

use std::ops::Range;

use crate::constants::{BLOCK_ID_WIDTH, MAX_BLOCK_SIZE, MAX_SINGLE_PUT_SIZE};

pub use crate::xml::{parse_block_list, serialize_block_list};

/// Whether a payload of this length can go out in one request.
pub fn fits_single_request(len: usize) -> bool {
    len <= MAX_SINGLE_PUT_SIZE
}

/// Render the identifier for the block at `index`.
///
/// Identifiers are the zero-padded decimal index at fixed width, so they
/// sort lexically in upload order and all share one length.
pub fn block_id(index: usize) -> String {
    format!("{:0>width$}", index, width = BLOCK_ID_WIDTH)
}

/// One block of a transfer plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDescriptor {
    /// Position of the block in the plan.
    pub index: usize,
    /// Block identifier, before transport encoding.
    pub id: String,
    /// Byte range of the payload this block carries.
    pub range: Range<usize>,
}

/// A payload split into maximal-size blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPlan {
    /// Total payload length in bytes.
    pub total_len: usize,
    /// Blocks in upload order. Only the last one may be short.
    pub blocks: Vec<BlockDescriptor>,
}

impl BlockPlan {
    /// Split a payload of `total_len` bytes into blocks.
    pub fn split(total_len: usize) -> Self {
        let count = total_len.div_ceil(MAX_BLOCK_SIZE);
        let blocks = (0..count)
            .map(|index| {
                let start = index * MAX_BLOCK_SIZE;
                let end = usize::min(start + MAX_BLOCK_SIZE, total_len);
                BlockDescriptor {
                    index,
                    id: block_id(index),
                    range: start..end,
                }
            })
            .collect();

        BlockPlan { total_len, blocks }
    }

    /// Block identifiers in commit order.
    pub fn block_ids(&self) -> Vec<String> {
        self.blocks.iter().map(|b| b.id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_request_ceiling_is_inclusive() {
        assert!(fits_single_request(0));
        assert!(fits_single_request(MAX_SINGLE_PUT_SIZE));
        assert!(!fits_single_request(MAX_SINGLE_PUT_SIZE + 1));
    }

    #[test]
    fn test_block_id_is_fixed_width() {
        assert_eq!(block_id(0).len(), BLOCK_ID_WIDTH);
        assert_eq!(block_id(0), "0".repeat(BLOCK_ID_WIDTH));
        assert!(block_id(123).ends_with("123"));
        assert_eq!(block_id(123).len(), BLOCK_ID_WIDTH);
    }

    #[test]
    fn test_split_exact_multiple() {
        let plan = BlockPlan::split(2 * MAX_BLOCK_SIZE);
        assert_eq!(plan.blocks.len(), 2);
        assert_eq!(plan.blocks[0].range, 0..MAX_BLOCK_SIZE);
        assert_eq!(plan.blocks[1].range, MAX_BLOCK_SIZE..2 * MAX_BLOCK_SIZE);
    }

    #[test]
    fn test_split_trailing_short_block() {
        let plan = BlockPlan::split(MAX_BLOCK_SIZE + 1);
        assert_eq!(plan.blocks.len(), 2);
        assert_eq!(plan.blocks[1].range, MAX_BLOCK_SIZE..MAX_BLOCK_SIZE + 1);
    }

    #[test]
    fn test_split_one_past_single_request_ceiling() {
        let plan = BlockPlan::split(MAX_SINGLE_PUT_SIZE + 1);
        assert_eq!(plan.blocks.len(), 17);
        assert_eq!(plan.blocks[16].range.len(), 1);
        assert_eq!(
            plan.blocks.iter().map(|b| b.range.len()).sum::<usize>(),
            MAX_SINGLE_PUT_SIZE + 1
        );
    }

    #[test]
    fn test_split_is_deterministic() {
        assert_eq!(BlockPlan::split(10 * MAX_BLOCK_SIZE + 7), BlockPlan::split(10 * MAX_BLOCK_SIZE + 7));
    }

    #[test]
    fn test_split_empty_payload() {
        assert!(BlockPlan::split(0).blocks.is_empty());
    }
}
