use std::collections::VecDeque;

use inkbridge_core::Stroke;

/// Ordered, bounded, in-memory history of received strokes.
///
/// Strokes are appended as whole values; the oldest ones fall off once the
/// capacity is reached. Nothing here survives a restart.
#[derive(Debug)]
pub struct StrokeLog {
    strokes: VecDeque<Stroke>,
    capacity: usize,
}

impl StrokeLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            strokes: VecDeque::new(),
            capacity,
        }
    }

    pub fn append(&mut self, stroke: Stroke) {
        if self.capacity == 0 {
            return;
        }
        while self.strokes.len() >= self.capacity {
            self.strokes.pop_front();
        }
        self.strokes.push_back(stroke);
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stroke> {
        self.strokes.iter()
    }
}

impl Extend<Stroke> for StrokeLog {
    fn extend<I: IntoIterator<Item = Stroke>>(&mut self, iter: I) {
        for stroke in iter {
            self.append(stroke);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkbridge_core::Point;

    fn stroke(x: f64) -> Stroke {
        Stroke::new(vec![Point::new(x, 0.0)])
    }

    #[test]
    fn keeps_insertion_order() {
        let mut log = StrokeLog::new(10);
        log.extend([stroke(1.0), stroke(2.0)]);
        let xs: Vec<f64> = log.iter().map(|s| s.points()[0].x).collect();
        assert_eq!(xs, vec![1.0, 2.0]);
    }

    #[test]
    fn drops_oldest_at_capacity() {
        let mut log = StrokeLog::new(2);
        log.extend([stroke(1.0), stroke(2.0), stroke(3.0)]);
        assert_eq!(log.len(), 2);
        assert_eq!(log.iter().next().unwrap().points()[0].x, 2.0);
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let mut log = StrokeLog::new(0);
        log.append(stroke(1.0));
        assert!(log.is_empty());
    }

    #[test]
    fn clear_empties_log() {
        let mut log = StrokeLog::new(4);
        log.append(stroke(1.0));
        log.clear();
        assert!(log.is_empty());
    }
}
