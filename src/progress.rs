//! Coarse, monotonic conversion progress.
//!
//! Converters report fixed milestones through [`Progress`], which clamps to
//! `0..=100` and never lets the reported value go backwards. The callback is
//! invoked synchronously on the converting thread.

pub struct Progress<'a> {
    sink: &'a mut dyn FnMut(u8),
    last: Option<u8>,
}

impl<'a> Progress<'a> {
    pub fn new(sink: &'a mut dyn FnMut(u8)) -> Self {
        Progress { sink, last: None }
    }

    /// Emits `percent` unless it would move progress backwards.
    pub fn report(&mut self, percent: u8) {
        let percent = percent.min(100);
        if self.last.is_some_and(|last| percent < last) {
            log::debug!("ignoring regressive progress {percent} after {:?}", self.last);
            return;
        }
        self.last = Some(percent);
        (self.sink)(percent);
    }

    pub fn last(&self) -> Option<u8> {
        self.last
    }
}
