//! Values kept alive for one render generation.
//!
//! Popup image listeners belong to the layout that created them. Holding one
//! for a newer generation drops everything held for older ones, which detaches
//! their listeners.

#[cfg(test)]
#[path = "generation_test.rs"]
mod generation_test;

#[derive(Debug)]
pub struct GenerationHold<T> {
    generation: u64,
    items: Vec<T>,
}

impl<T> Default for GenerationHold<T> {
    fn default() -> Self {
        Self { generation: 0, items: Vec::new() }
    }
}

impl<T> GenerationHold<T> {
    /// Keep `item` until a newer generation arrives. Items for an older
    /// generation than the current one are dropped at once.
    pub fn hold(&mut self, generation: u64, item: T) {
        if generation < self.generation {
            log::debug!("generation hold: dropping item for stale gen {generation}");
            return;
        }
        if generation > self.generation {
            self.generation = generation;
            self.items.clear();
        }
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
