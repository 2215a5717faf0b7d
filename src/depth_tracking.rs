use crate::{
    element::Element,
    error::{Error, Result},
    MAX_DEPTH,
};

#[derive(Clone, Debug, Default)]
pub struct DepthTracker {
    tracking: Vec<u64>,
}

impl DepthTracker {
    /// Create a new depth tracker
    pub fn new() -> Self {
        Self {
            tracking: Vec::new(),
        }
    }

    /// Update the depth tracker on each new element to serialize.
    pub fn update_elem(&mut self, elem: &Element) -> Result<()> {
        // Subtract from count for next element
        if let Some(v) = self.tracking.last_mut() {
            *v -= 1;
        }

        // Increase nest depth if this is a nesting element
        match elem {
            Element::Map(len) => self.tracking.push(2 * (*len as u64)), // 2 elements per map item
            Element::Array(len) => self.tracking.push(*len as u64),
            _ => (),
        }

        // Check to see if we hit the nesting limit
        if self.tracking.len() > MAX_DEPTH {
            return Err(Error::ParseLimit("Depth limit exceeded".to_string()));
        }

        self.purge_zeros();
        Ok(())
    }

    /// Drop any depth tracking elements that have hit zero
    pub fn purge_zeros(&mut self) {
        while let Some(0) = self.tracking.last() {
            self.tracking.pop();
        }
    }

    /// Drop a depth before we've seen enough elements. Used by sequence and map serializers that
    /// didn't know their total length ahead of time: they register a maximally-sized placeholder,
    /// run through the depth tracker as normal, and call this when done.
    pub fn early_end(&mut self) {
        self.tracking.pop();
        self.purge_zeros();
    }

    #[cfg(test)]
    pub fn depth(&self) -> usize {
        self.tracking.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn nested_arrays_unwind() {
        let mut tracker = DepthTracker::new();
        tracker.update_elem(&Element::Array(2)).unwrap();
        tracker.update_elem(&Element::Array(1)).unwrap();
        assert_eq!(tracker.depth(), 2);
        tracker.update_elem(&Element::Null).unwrap();
        assert_eq!(tracker.depth(), 1);
        tracker.update_elem(&Element::Bool(true)).unwrap();
        assert_eq!(tracker.depth(), 0);
    }

    #[test]
    fn empty_containers_dont_nest() {
        let mut tracker = DepthTracker::new();
        tracker.update_elem(&Element::Array(0)).unwrap();
        tracker.update_elem(&Element::Map(0)).unwrap();
        assert_eq!(tracker.depth(), 0);
    }

    #[test]
    fn depth_limit() {
        let mut tracker = DepthTracker::new();
        for _ in 0..MAX_DEPTH {
            tracker.update_elem(&Element::Array(1)).unwrap();
        }
        assert!(tracker.update_elem(&Element::Array(1)).is_err());
    }
}
