/// Scrolling spectrum history: a ring of `depth` rows, `width` values each.
///
/// One row is pushed per tick; the oldest row is overwritten once the ring is
/// full. Nothing is kept beyond `depth` rows.
#[derive(Debug, Clone)]
pub struct Waterfall {
    width: usize,
    depth: usize,
    values: Vec<f32>,
    /// Ring slot the next push will overwrite.
    next: usize,
    filled: usize,
}

impl Waterfall {
    pub fn new(width: usize, depth: usize) -> Self {
        Self {
            width,
            depth,
            values: vec![0.0; width * depth],
            next: 0,
            filled: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Rows currently holding history.
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Discard history and reallocate for a new layout.
    pub fn resize(&mut self, width: usize, depth: usize) {
        *self = Self::new(width, depth);
    }

    /// Record one row. Missing columns are zero, extra columns are dropped.
    pub fn push(&mut self, row: &[f32]) {
        if self.depth == 0 || self.width == 0 {
            return;
        }
        let start = self.next * self.width;
        let slot = &mut self.values[start..start + self.width];
        let copied = row.len().min(self.width);
        slot[..copied].copy_from_slice(&row[..copied]);
        slot[copied..].fill(0.0);

        self.next = (self.next + 1) % self.depth;
        self.filled = (self.filled + 1).min(self.depth);
    }

    /// The row pushed `age` ticks ago (0 = most recent), if still retained.
    pub fn row(&self, age: usize) -> Option<&[f32]> {
        if age >= self.filled {
            return None;
        }
        let index = (self.next + self.depth - 1 - age) % self.depth;
        let start = index * self.width;
        Some(&self.values[start..start + self.width])
    }
}
