use std::cell::Cell;
use std::rc::Rc;

/// Requests a redraw on the next display refresh tick
pub trait FrameScheduler {
    fn request_frame(&mut self);
}

/// Counts requests; the host drives frames itself. Clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    requests: Rc<Cell<usize>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> usize {
        self.requests.get()
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) {
        self.requests.set(self.requests.get() + 1);
    }
}

/// Forwards requests to a host callback, e.g. a `requestAnimationFrame`
/// bridge
pub struct CallbackScheduler {
    callback: Box<dyn FnMut()>,
}

impl CallbackScheduler {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnMut() + 'static,
    {
        Self { callback: Box::new(callback) }
    }
}

impl FrameScheduler for CallbackScheduler {
    fn request_frame(&mut self) {
        (self.callback)();
    }
}
