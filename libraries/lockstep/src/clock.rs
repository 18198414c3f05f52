//! Injectable time source. Every deadline in the engine is computed against a
//! [`Clock`] so the timing rules can be tested by advancing a [`ManualClock`]
//! instead of sleeping.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Rc<RefCell<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(RefCell::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.borrow_mut();
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.borrow_mut() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.borrow()
    }
}
