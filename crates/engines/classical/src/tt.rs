//! Lock-free transposition table shared by every search thread.
//!
//! Each slot is two `AtomicU64`s: the packed entry and `hash ^ data`. A
//! reader only trusts a slot whose two words XOR back to the probing hash,
//! so a torn read (one word from each of two racing writers) is a miss.
//!
//! Slots are grouped four to a 64-byte bucket. Exact entries from the main
//! search are also written to a small side table so principal-variation
//! results survive pressure on the main table.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use chess_core::{Move, Score};

const SLOTS_PER_BUCKET: usize = 4;
const GENERATION_MASK: u8 = 0x3F;
/// Share of the memory budget given to the PV table (1 / N).
const PV_TABLE_SHARE: usize = 16;
const MIN_PV_SLOTS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Bound {
    /// Score is at most the stored value (fail-low)
    Upper = 1,
    /// Score is at least the stored value (fail-high)
    Lower = 2,
    Exact = 3,
}

impl Bound {
    fn from_bits(bits: u64) -> Option<Bound> {
        match bits & 0x3 {
            1 => Some(Bound::Upper),
            2 => Some(Bound::Lower),
            3 => Some(Bound::Exact),
            _ => None,
        }
    }
}

/// A validated table hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtEntry {
    pub mv: Option<Move>,
    /// Already rebiased to the probing node's height
    pub score: Score,
    pub depth: u8,
    pub bound: Bound,
    generation: u8,
}

impl TtEntry {
    /// Search generation that wrote the entry.
    pub fn generation(&self) -> u8 {
        self.generation
    }

    /// Whether the stored bound settles the window without searching.
    #[inline]
    pub fn cuts(&self, alpha: Score, beta: Score) -> bool {
        match self.bound {
            Bound::Exact => true,
            Bound::Lower => self.score >= beta,
            Bound::Upper => self.score <= alpha,
        }
    }
}

// Layout: move 16 | win 16 | win_draw 16 | depth 8 | bound 2 | generation 6
#[inline]
fn pack(mv: Option<Move>, score: Score, depth: u8, bound: Bound, generation: u8) -> u64 {
    let mv = mv.map_or(0, Move::raw) as u64;
    let win = score.win() as i16 as u16 as u64;
    let win_draw = score.win_draw() as i16 as u16 as u64;
    mv | (win << 16)
        | (win_draw << 32)
        | ((depth as u64) << 48)
        | ((bound as u64) << 56)
        | (((generation & GENERATION_MASK) as u64) << 58)
}

#[inline]
fn unpack(data: u64, height: usize) -> Option<TtEntry> {
    let bound = Bound::from_bits(data >> 56)?;
    let mv = Move::from_raw(data as u16);
    let score = Score::new((data >> 16) as u16 as i16 as i32, (data >> 32) as u16 as i16 as i32);
    Some(TtEntry {
        mv: (!mv.is_null()).then_some(mv),
        score: score.from_tt(height),
        depth: (data >> 48) as u8,
        bound,
        generation: (data >> 58) as u8 & GENERATION_MASK,
    })
}

#[derive(Default)]
#[repr(align(16))]
struct Slot {
    key_xor: AtomicU64,
    data: AtomicU64,
}

impl Slot {
    /// Packed data if the slot validates against `hash`.
    #[inline]
    fn read(&self, hash: u64) -> Option<u64> {
        let data = self.data.load(Ordering::Relaxed);
        let key_xor = self.key_xor.load(Ordering::Relaxed);
        (data != 0 && key_xor ^ data == hash).then_some(data)
    }

    #[inline]
    fn write(&self, hash: u64, data: u64) {
        self.data.store(data, Ordering::Relaxed);
        self.key_xor.store(hash ^ data, Ordering::Relaxed);
    }

    fn clear(&self) {
        self.data.store(0, Ordering::Relaxed);
        self.key_xor.store(0, Ordering::Relaxed);
    }

    fn raw(&self) -> u64 {
        self.data.load(Ordering::Relaxed)
    }
}

#[derive(Default)]
#[repr(align(64))]
struct Bucket {
    slots: [Slot; SLOTS_PER_BUCKET],
}

pub struct TranspositionTable {
    buckets: Box<[Bucket]>,
    pv: Box<[Slot]>,
    generation: AtomicU8,
}

impl TranspositionTable {
    /// Table using roughly `size_mb` MiB.
    pub fn new(size_mb: usize) -> Self {
        let bytes = size_mb.max(1) * 1024 * 1024;
        let pv_slots = (bytes / PV_TABLE_SHARE / std::mem::size_of::<Slot>()).max(MIN_PV_SLOTS);
        let main_bytes = bytes - bytes / PV_TABLE_SHARE;
        let buckets = (main_bytes / std::mem::size_of::<Bucket>()).max(1);

        log::debug!("transposition table: {buckets} buckets, {pv_slots} pv slots");
        Self {
            buckets: (0..buckets).map(|_| Bucket::default()).collect(),
            pv: (0..pv_slots).map(|_| Slot::default()).collect(),
            generation: AtomicU8::new(0),
        }
    }

    #[inline]
    fn bucket(&self, hash: u64) -> &Bucket {
        let idx = ((hash as u128 * self.buckets.len() as u128) >> 64) as usize;
        &self.buckets[idx]
    }

    #[inline]
    fn pv_slot(&self, hash: u64) -> &Slot {
        &self.pv[(hash % self.pv.len() as u64) as usize]
    }

    #[inline]
    pub fn generation(&self) -> u8 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Age every entry by one search.
    pub fn new_search(&self) {
        let next = self.generation().wrapping_add(1) & GENERATION_MASK;
        self.generation.store(next, Ordering::Relaxed);
    }

    /// Deeper of the main-table and PV-table hits, with the score rebiased
    /// for a node `height` plies from the root.
    pub fn probe(&self, hash: u64, height: usize) -> Option<TtEntry> {
        let main = self
            .bucket(hash)
            .slots
            .iter()
            .find_map(|slot| slot.read(hash))
            .and_then(|data| unpack(data, height));
        let pv = self.pv_slot(hash).read(hash).and_then(|data| unpack(data, height));

        match (main, pv) {
            (Some(m), Some(p)) => Some(if p.depth > m.depth { p } else { m }),
            (m, p) => m.or(p),
        }
    }

    /// Store a search result for the node at `height`. Mate scores are
    /// made node-relative before they are packed.
    pub fn store(
        &self,
        hash: u64,
        height: usize,
        mv: Option<Move>,
        score: Score,
        depth: u8,
        bound: Bound,
    ) {
        let generation = self.generation();
        let bucket = self.bucket(hash);

        let slot = match bucket.slots.iter().find(|s| s.read(hash).is_some()) {
            Some(slot) => slot,
            None => bucket
                .slots
                .iter()
                .min_by_key(|s| self.priority(s.raw(), generation))
                .unwrap_or(&bucket.slots[0]),
        };

        // Keep the old move when this result has none of its own
        let mv = mv.or_else(|| {
            slot.read(hash)
                .and_then(|data| unpack(data, height))
                .and_then(|e| e.mv)
        });

        let data = pack(mv, score.to_tt(height), depth, bound, generation);
        slot.write(hash, data);
        if bound == Bound::Exact && depth > 0 {
            self.pv_slot(hash).write(hash, data);
        }
    }

    /// Replacement priority; the lowest in a bucket is evicted.
    fn priority(&self, data: u64, generation: u8) -> i32 {
        if data == 0 {
            return -1;
        }
        let same_generation = ((data >> 58) as u8 & GENERATION_MASK) == generation;
        (same_generation as i32) * 256 + ((data >> 48) as u8) as i32
    }

    pub fn clear(&self) {
        for bucket in self.buckets.iter() {
            for slot in &bucket.slots {
                slot.clear();
            }
        }
        for slot in self.pv.iter() {
            slot.clear();
        }
        self.generation.store(0, Ordering::Relaxed);
    }

    /// Permille of sampled slots written during the current search.
    pub fn hashfull(&self) -> u32 {
        let generation = self.generation();
        let sample = self.buckets.len().min(250);
        let used = self.buckets[..sample]
            .iter()
            .flat_map(|b| b.slots.iter())
            .filter(|s| {
                let data = s.raw();
                data != 0 && ((data >> 58) as u8 & GENERATION_MASK) == generation
            })
            .count();
        (used * 1000 / (sample * SLOTS_PER_BUCKET)) as u32
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
#[path = "tt_tests.rs"]
mod tt_tests;
