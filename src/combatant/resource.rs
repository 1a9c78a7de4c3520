//! Bounded resource pools (health, action points)
//!
//! Values are clamped to `0..=max`. Listeners fire after every change with
//! `(current, max)`; depletion listeners fire once each time the pool drops
//! from positive to zero.

pub type ChangeListener = Box<dyn Fn(i32, i32) + Send + Sync>;
pub type DepletedListener = Box<dyn Fn() + Send + Sync>;

pub struct ResourcePool {
    current: i32,
    max: i32,
    on_change: Vec<ChangeListener>,
    on_depleted: Vec<DepletedListener>,
}

impl ResourcePool {
    /// A full pool
    pub fn new(max: i32) -> Self {
        let max = max.max(0);
        Self {
            current: max,
            max,
            on_change: Vec::new(),
            on_depleted: Vec::new(),
        }
    }

    pub fn with_current(current: i32, max: i32) -> Self {
        let mut pool = Self::new(max);
        pool.current = current.clamp(0, pool.max);
        pool
    }

    pub fn current(&self) -> i32 {
        self.current
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn is_depleted(&self) -> bool {
        self.current <= 0
    }

    /// Current as a fraction of max (0.0 for an empty-capacity pool)
    pub fn fraction(&self) -> f32 {
        if self.max > 0 {
            self.current as f32 / self.max as f32
        } else {
            0.0
        }
    }

    /// Add `delta` (negative to drain). Returns the change actually applied.
    pub fn affect(&mut self, delta: i32) -> i32 {
        let before = self.current;
        self.apply(before.saturating_add(delta));
        self.current - before
    }

    pub fn set(&mut self, value: i32) {
        self.apply(value);
    }

    /// Change capacity; current is clamped into the new range
    pub fn set_max(&mut self, max: i32) {
        self.max = max.max(0);
        let current = self.current;
        self.apply(current);
    }

    pub fn restore_full(&mut self) {
        let max = self.max;
        self.apply(max);
    }

    pub fn subscribe(&mut self, listener: impl Fn(i32, i32) + Send + Sync + 'static) {
        self.on_change.push(Box::new(listener));
    }

    pub fn on_depleted(&mut self, listener: impl Fn() + Send + Sync + 'static) {
        self.on_depleted.push(Box::new(listener));
    }

    fn apply(&mut self, value: i32) {
        let was_positive = self.current > 0;
        self.current = value.clamp(0, self.max);

        for listener in &self.on_change {
            listener(self.current, self.max);
        }

        if was_positive && self.current == 0 {
            for listener in &self.on_depleted {
                listener();
            }
        }
    }
}

impl std::fmt::Debug for ResourcePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcePool")
            .field("current", &self.current)
            .field("max", &self.max)
            .field("listeners", &(self.on_change.len() + self.on_depleted.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_new_pool_is_full() {
        let pool = ResourcePool::new(100);
        assert_eq!(pool.current(), 100);
        assert_eq!(pool.max(), 100);
        assert!(!pool.is_depleted());
    }

    #[test]
    fn test_affect_clamps_to_range() {
        let mut pool = ResourcePool::new(50);
        assert_eq!(pool.affect(-80), -50);
        assert_eq!(pool.current(), 0);
        assert!(pool.is_depleted());

        assert_eq!(pool.affect(500), 50);
        assert_eq!(pool.current(), 50);
    }

    #[test]
    fn test_set_max_clamps_current() {
        let mut pool = ResourcePool::new(100);
        pool.set_max(60);
        assert_eq!(pool.current(), 60);

        pool.set_max(120);
        assert_eq!(pool.current(), 60);
        pool.restore_full();
        assert_eq!(pool.current(), 120);
    }

    #[test]
    fn test_change_listener_sees_new_values() {
        let seen = Arc::new(AtomicI32::new(-1));
        let sink = seen.clone();

        let mut pool = ResourcePool::new(30);
        pool.subscribe(move |current, _max| sink.store(current, Ordering::SeqCst));
        pool.affect(-12);

        assert_eq!(seen.load(Ordering::SeqCst), 18);
    }

    #[test]
    fn test_depleted_fires_once_per_crossing() {
        let deaths = Arc::new(AtomicU32::new(0));
        let counter = deaths.clone();

        let mut pool = ResourcePool::new(10);
        pool.on_depleted(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        pool.affect(-10);
        pool.affect(-5); // already at zero
        assert_eq!(deaths.load(Ordering::SeqCst), 1);

        pool.affect(3);
        pool.affect(-3);
        assert_eq!(deaths.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_fraction() {
        let pool = ResourcePool::with_current(25, 100);
        assert!((pool.fraction() - 0.25).abs() < f32::EPSILON);
        assert_eq!(ResourcePool::new(0).fraction(), 0.0);
    }
}
