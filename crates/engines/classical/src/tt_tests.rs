use super::*;
use chess_core::{MoveKind, Position, ZOBRIST};
use std::sync::Arc;

fn e2e4() -> Move {
    Move::new(12, 28, MoveKind::DoublePawnPush)
}

#[test]
fn store_then_probe_round_trips() {
    let tt = TranspositionTable::new(1);
    let hash = Position::startpos().hash();
    assert!(tt.probe(hash, 0).is_none());

    let score = Score::from_centipawns(35);
    tt.store(hash, 0, Some(e2e4()), score, 7, Bound::Lower);

    let entry = tt.probe(hash, 0).expect("entry should validate");
    assert_eq!(entry.mv, Some(e2e4()));
    assert_eq!(entry.score.win(), score.win());
    assert_eq!(entry.score.win_draw(), score.win_draw());
    assert_eq!(entry.depth, 7);
    assert_eq!(entry.bound, Bound::Lower);
    assert_eq!(entry.generation(), 0);
}

#[test]
fn other_hash_misses() {
    let tt = TranspositionTable::new(1);
    tt.store(0xDEAD_BEEF, 0, None, Score::DRAW, 3, Bound::Exact);
    assert!(tt.probe(0xDEAD_BEEF ^ ZOBRIST.side_to_move, 0).is_none());
}

#[test]
fn mate_scores_are_rebiased_by_height() {
    let tt = TranspositionTable::new(1);
    let hash = 0x1234_5678_9ABC_DEF0;
    // Found at height 5: mate in 9 plies from the root, 4 from this node
    tt.store(hash, 5, None, Score::mate_in(9), 4, Bound::Exact);

    assert_eq!(tt.probe(hash, 5).unwrap().score, Score::mate_in(9));
    // Reached again at height 3 it is mate in 7 from the root
    let entry = tt.probe(hash, 3).unwrap();
    assert_eq!(entry.score, Score::mate_in(7));
    assert!(entry.score.is_mate_score());

    tt.store(hash, 2, None, Score::mated_in(6), 4, Bound::Upper);
    assert_eq!(tt.probe(hash, 4).unwrap().score, Score::mated_in(8));
}

#[test]
fn torn_slot_is_a_miss() {
    let tt = TranspositionTable::new(1);
    let hash = 0x0F0F_1234_0000_0001;
    tt.store(hash, 0, Some(e2e4()), Score::DRAW, 5, Bound::Exact);

    // Simulate a racing writer that replaced only the data word
    let bucket = tt.bucket(hash);
    let slot = bucket.slots.iter().find(|s| s.read(hash).is_some()).unwrap();
    slot.data.store(pack(None, Score::KNOWN_WIN, 9, Bound::Lower, 0), Ordering::Relaxed);

    // The PV copy still validates
    let entry = tt.probe(hash, 0).unwrap();
    assert_eq!(entry.depth, 5);
    tt.pv_slot(hash).data.store(1 << 56, Ordering::Relaxed);
    assert!(tt.probe(hash, 0).is_none());
}

#[test]
fn exact_entries_survive_bucket_pressure_in_pv_table() {
    let tt = TranspositionTable::new(1);
    let hash = 0x5555_0000_1111_2222;
    tt.store(hash, 0, Some(e2e4()), Score::DRAW, 1, Bound::Exact);

    // Fill the same bucket with deeper entries
    let buckets = tt.buckets.len() as u128;
    let target = (hash as u128 * buckets) >> 64;
    let mut written = 0;
    let mut candidate = 1u64;
    while written < 8 {
        candidate = candidate.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(1);
        if (candidate as u128 * buckets) >> 64 == target && candidate != hash {
            tt.store(candidate, 0, None, Score::DRAW, 20, Bound::Lower);
            written += 1;
        }
    }

    let entry = tt.probe(hash, 0).expect("pv table keeps exact entries");
    assert_eq!(entry.mv, Some(e2e4()));
    assert_eq!(entry.bound, Bound::Exact);
}

#[test]
fn replacement_prefers_stale_and_shallow_slots() {
    let tt = TranspositionTable::new(1);
    let g = tt.generation();
    let old = pack(None, Score::DRAW, 30, Bound::Lower, g.wrapping_sub(1));
    let fresh_shallow = pack(None, Score::DRAW, 2, Bound::Lower, g);
    let fresh_deep = pack(None, Score::DRAW, 12, Bound::Lower, g);
    assert!(tt.priority(0, g) < tt.priority(old, g));
    assert!(tt.priority(old, g) < tt.priority(fresh_shallow, g));
    assert!(tt.priority(fresh_shallow, g) < tt.priority(fresh_deep, g));
}

#[test]
fn store_without_move_keeps_previous_move() {
    let tt = TranspositionTable::new(1);
    let hash = 42;
    tt.store(hash, 0, Some(e2e4()), Score::DRAW, 3, Bound::Lower);
    tt.store(hash, 0, None, Score::DRAW, 4, Bound::Upper);
    let entry = tt.probe(hash, 0).unwrap();
    assert_eq!(entry.mv, Some(e2e4()));
    assert_eq!(entry.bound, Bound::Upper);
}

#[test]
fn clear_and_generation() {
    let tt = TranspositionTable::new(1);
    tt.store(7, 0, None, Score::DRAW, 3, Bound::Exact);
    assert!(tt.hashfull() <= 1000);
    tt.new_search();
    assert_eq!(tt.generation(), 1);
    tt.clear();
    assert_eq!(tt.generation(), 0);
    assert!(tt.probe(7, 0).is_none());
    assert_eq!(tt.hashfull(), 0);
}

#[test]
fn window_cut_rules() {
    let tt = TranspositionTable::new(1);
    let low = Score::from_centipawns(-50);
    let high = Score::from_centipawns(50);

    tt.store(1, 0, None, Score::from_centipawns(80), 3, Bound::Lower);
    assert!(tt.probe(1, 0).unwrap().cuts(low, high));
    tt.store(1, 0, None, Score::from_centipawns(0), 3, Bound::Lower);
    assert!(!tt.probe(1, 0).unwrap().cuts(low, high));
    tt.store(1, 0, None, Score::from_centipawns(-80), 3, Bound::Upper);
    assert!(tt.probe(1, 0).unwrap().cuts(low, high));
    tt.store(1, 0, None, Score::from_centipawns(0), 3, Bound::Exact);
    assert!(tt.probe(1, 0).unwrap().cuts(low, high));
}

#[test]
fn concurrent_writers_never_yield_foreign_entries() {
    let tt = Arc::new(TranspositionTable::new(1));
    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let tt = Arc::clone(&tt);
            std::thread::spawn(move || {
                for i in 0..20_000u64 {
                    let hash = (i % 64).wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ t;
                    tt.store(hash, 0, None, Score::DRAW, (t as u8) + 1, Bound::Lower);
                    if let Some(e) = tt.probe(hash, 0) {
                        // Any hit must have been written for this exact hash
                        assert!(e.depth >= 1 && e.depth <= 4);
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}
