pub const CHANNELS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    pub sim_size: usize,
    pub stride: usize,
}

impl Grid {
    pub fn new(sim_size: usize) -> Self {
        Self {
            sim_size,
            stride: sim_size + 2,
        }
    }

    pub fn cells(&self) -> usize {
        self.stride * self.stride
    }

    pub fn buffer_len(&self) -> usize {
        CHANNELS * self.cells()
    }

    pub fn row_len(&self) -> usize {
        CHANNELS * self.stride
    }

    // Channels interleave per cell: 2 * (x + y * stride) + channel
    #[inline]
    pub fn index(&self, x: usize, y: usize, channel: usize) -> usize {
        CHANNELS * (x + y * self.stride) + channel
    }
}

// Swapping flips an index; the slots themselves never move.
#[derive(Debug)]
pub struct SlotPair<T> {
    slots: [T; 2],
    current: usize,
}

impl<T> SlotPair<T> {
    pub fn new(first: T, second: T) -> Self {
        Self {
            slots: [first, second],
            current: 0,
        }
    }

    pub fn current(&self) -> &T {
        &self.slots[self.current]
    }

    pub fn previous(&self) -> &T {
        &self.slots[1 - self.current]
    }

    pub fn current_mut(&mut self) -> &mut T {
        &mut self.slots[self.current]
    }

    pub fn previous_mut(&mut self) -> &mut T {
        &mut self.slots[1 - self.current]
    }

    pub fn split_mut(&mut self) -> (&mut T, &mut T) {
        let (first, second) = self.slots.split_at_mut(1);
        if self.current == 0 {
            (&mut first[0], &mut second[0])
        } else {
            (&mut second[0], &mut first[0])
        }
    }

    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }

    pub fn current_slot(&self) -> usize {
        self.current
    }

    pub(crate) fn restore(&mut self, slot: usize) {
        self.current = slot & 1;
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut()
    }
}
