/** Walks the cells strictly between two squares lying on one line. */
#[derive(Debug)]
pub struct BetweenIterator {
    current: u8,
    target: u8,
    step: u8,
}

impl Iterator for BetweenIterator {
    type Item = u8;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        self.current = self.current.wrapping_add(self.step);
        if self.current == self.target || !is_valid_coord(self.current) {
            None
        } else {
            Some(self.current)
        }
    }
}

pub fn between(from: u8, to: u8) -> BetweenIterator {
    #[cfg(debug_assertions)]
    if !is_in_diagonal_line(from, to) && !is_in_straight_line(from, to) {
        panic!("Points can't form line to search between them!")
    }
    let (from_rank, from_file): (u8, u8) = unpack_pos(from);
    let (to_rank, to_file): (u8, u8) = unpack_pos(to);
    let rank_step: u8 = match to_rank.cmp(&from_rank) {
        std::cmp::Ordering::Greater => 0x10,
        std::cmp::Ordering::Less => 0xf0,
        std::cmp::Ordering::Equal => 0x00,
    };
    let file_step: u8 = match to_file.cmp(&from_file) {
        std::cmp::Ordering::Greater => 0x01,
        std::cmp::Ordering::Less => 0xff,
        std::cmp::Ordering::Equal => 0x00,
    };
    BetweenIterator {
        current: from,
        target: to,
        // same cell gives a zero step, which stops right away
        step: if from == to {
            0x00
        } else {
            rank_step.wrapping_add(file_step)
        },
    }
}

pub struct DirectionIterator {
    position: u8,
    direction: u8,
}

impl Iterator for DirectionIterator {
    type Item = u8;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.position = self.position.wrapping_add(self.direction);
        if is_valid_coord(self.position) {
            Some(self.position)
        } else {
            None
        }
    }
}

pub fn in_direction(position: u8, direction: u8) -> DirectionIterator {
    DirectionIterator {
        position,
        direction,
    }
}

/** Manhattan distance between two cells. */
pub fn distance(from: u8, to: u8) -> u8 {
    (from & 0x0f).abs_diff(to & 0x0f) + ((from & 0xf0) >> 4).abs_diff((to & 0xf0) >> 4)
}

/** King distance: max of file and rank difference. */
pub fn chebyshev(from: u8, to: u8) -> u8 {
    (from & 0x0f)
        .abs_diff(to & 0x0f)
        .max(((from & 0xf0) >> 4).abs_diff((to & 0xf0) >> 4))
}

pub fn is_in_straight_line(a: u8, b: u8) -> bool {
    a & 0x0f == b & 0x0f || a & 0xf0 == b & 0xf0
}

pub fn is_in_diagonal_line(a: u8, b: u8) -> bool {
    (a & 0x0f).abs_diff(b & 0x0f) == ((a & 0xf0) >> 4).abs_diff((b & 0xf0) >> 4)
}

#[inline]
pub fn is_valid_coord(coord: u8) -> bool {
    coord & 0x88 == 0x00
}

#[inline]
pub fn compact_pos(rank: u8, file: u8) -> u8 {
    rank << 4 | file
}

#[inline]
pub fn unpack_pos<T: From<u8>, V: Into<u8>>(pos: V) -> (T, T) {
    let pos: u8 = pos.into();
    (((pos & 0xf0) >> 4).into(), (pos & 0x0f).into())
}
