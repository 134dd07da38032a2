//! Explicit scene time with scoped save/restore.

use std::ops::{Deref, DerefMut};

use log::trace;

/// Source of the current evaluation time.
pub trait TimeContext {
    fn time(&self) -> f64;
    fn set_time(&mut self, time: f64);
}

/// Plain scene clock.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SceneTime {
    current: f64,
}

impl SceneTime {
    #[must_use]
    pub const fn new(current: f64) -> Self {
        Self { current }
    }
}

impl TimeContext for SceneTime {
    fn time(&self) -> f64 {
        self.current
    }

    fn set_time(&mut self, time: f64) {
        self.current = time;
    }
}

/// Restores the wrapped context's time when dropped, on every exit path.
pub struct TimeGuard<'a, T: TimeContext + ?Sized> {
    context: &'a mut T,
    saved: f64,
}

impl<'a, T: TimeContext + ?Sized> TimeGuard<'a, T> {
    pub fn new(context: &'a mut T) -> Self {
        let saved = context.time();
        Self { context, saved }
    }

    #[must_use]
    pub const fn saved(&self) -> f64 {
        self.saved
    }
}

impl<T: TimeContext + ?Sized> Deref for TimeGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.context
    }
}

impl<T: TimeContext + ?Sized> DerefMut for TimeGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.context
    }
}

impl<T: TimeContext + ?Sized> Drop for TimeGuard<'_, T> {
    fn drop(&mut self) {
        trace!("restoring time {}", self.saved);
        self.context.set_time(self.saved);
    }
}
