use crate::{board::Position, movegen::generate_moves, types::Move};

/// Pure perft node count.
/// Counts all legal positions from the current one down to `depth`.
pub fn perft(pos: &mut Position, depth: u8) -> u64 {
    let mut layers = vec![Vec::with_capacity(64); depth as usize];
    perft_inner(pos, depth, &mut layers[..])
}

/// Node count below each root move, in generation order.
pub fn perft_divide(pos: &mut Position, depth: u8) -> Vec<(Move, u64)> {
    if depth == 0 {
        return Vec::new();
    }
    let mut layers = vec![Vec::with_capacity(64); depth as usize - 1];
    pos.generate_moves(false)
        .into_iter()
        .map(|mv| {
            pos.make_move(mv);
            let nodes = perft_inner(pos, depth - 1, &mut layers[..]);
            pos.unmake_move();
            (mv, nodes)
        })
        .collect()
}

/// One move buffer per remaining ply, reused across siblings.
fn perft_inner(pos: &mut Position, depth: u8, layers: &mut [Vec<Move>]) -> u64 {
    let Some((buf, rest)) = layers.split_first_mut() else {
        return 1;
    };
    if depth == 0 {
        return 1;
    }

    generate_moves(pos, false, buf);
    // Leaf parents only need the count.
    if depth == 1 {
        return buf.len() as u64;
    }

    let mut nodes = 0u64;
    for mv in buf.iter().copied() {
        pos.make_move(mv);
        nodes += perft_inner(pos, depth - 1, rest);
        pos.unmake_move();
    }
    nodes
}
