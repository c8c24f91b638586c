//! Embedded-blob layout of builtin instruction streams

use crate::builtin::Builtin;

#[derive(Debug, Clone, Copy)]
struct BlobEntry {
    builtin: Builtin,
    instruction_start: usize,
    instruction_size: usize,
}

/// The binary-searchable layout table of the embedded builtins blob.
///
/// Every builtin has exactly one contiguous, non-overlapping instruction
/// range; entries are kept sorted by start address so a program counter can
/// be mapped back to its builtin in O(log N).
#[derive(Debug, Clone)]
pub struct EmbeddedBlob {
    /// Sorted by `instruction_start`
    by_address: Vec<BlobEntry>,
    /// Indexed by builtin id
    by_builtin: Vec<(usize, usize)>,
}

impl EmbeddedBlob {
    /// Build the layout from per-builtin instruction sizes, packing the
    /// instruction streams contiguously from `code_base` in id order.
    ///
    /// # Panics
    ///
    /// Panics unless `sizes` has one non-zero entry per builtin.
    pub fn from_sizes(code_base: usize, sizes: &[usize]) -> Self {
        assert_eq!(sizes.len(), Builtin::COUNT, "one size per builtin");

        let mut by_address = Vec::with_capacity(Builtin::COUNT);
        let mut by_builtin = Vec::with_capacity(Builtin::COUNT);
        let mut next_start = code_base;
        for (builtin, &size) in Builtin::all().zip(sizes) {
            assert!(size > 0, "{} has an empty instruction range", builtin.name());
            by_address.push(BlobEntry {
                builtin,
                instruction_start: next_start,
                instruction_size: size,
            });
            by_builtin.push((next_start, size));
            next_start += size;
        }
        // Packed in id order from a single base, so already address-sorted.
        Self {
            by_address,
            by_builtin,
        }
    }

    /// First instruction address of `builtin`
    pub fn instruction_start_of(&self, builtin: Builtin) -> usize {
        self.by_builtin[builtin.to_index()].0
    }

    /// Instruction range length of `builtin`
    pub fn instruction_size_of(&self, builtin: Builtin) -> usize {
        self.by_builtin[builtin.to_index()].1
    }

    /// Map a program counter to the builtin whose embedded instruction range
    /// contains it.
    pub fn try_lookup(&self, pc: usize) -> Option<Builtin> {
        let candidate = self
            .by_address
            .partition_point(|entry| entry.instruction_start <= pc)
            .checked_sub(1)?;
        let entry = &self.by_address[candidate];
        (pc < entry.instruction_start + entry.instruction_size).then_some(entry.builtin)
    }
}
