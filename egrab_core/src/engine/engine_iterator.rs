use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::engine::Engine;

/// The capability set a concrete engine sequence must offer to be driven by
/// the download pipeline.
pub trait EngineCursor: Send + Sync {
    /// The candidate currently being attempted.
    fn engine(&self) -> &dyn Engine;

    /// True iff another candidate exists after the current one.
    fn has_next(&self) -> bool;

    /// Advance to the next candidate. Only called when `has_next()` holds.
    fn move_to_next(&mut self);

    /// The current candidate has been consumed, successfully or not.
    fn report_done(&mut self);

    /// Fallback label used before a concrete engine has produced data.
    fn default_engine_name(&mut self) -> &str;
}

/// Owning, type-erased handle over any [`EngineCursor`].
///
/// The handle is move-only. [`next`](Self::next) consumes the iterator and
/// returns the advanced one, so a stale position can never be advanced twice.
pub struct EngineIterator {
    handle: Box<dyn EngineCursor>,
}

impl EngineIterator {
    pub fn new<C: EngineCursor + 'static>(cursor: C) -> Self {
        Self {
            handle: Box::new(cursor),
        }
    }

    pub fn has_next(&self) -> bool {
        self.handle.has_next()
    }

    /// Returns the iterator positioned at the next candidate.
    ///
    /// # Panics
    ///
    /// Panics if `has_next()` is false.
    #[allow(clippy::should_implement_trait)]
    pub fn next(mut self) -> Self {
        assert!(
            self.handle.has_next(),
            "EngineIterator::next called past the last candidate"
        );
        self.handle.move_to_next();
        self
    }

    pub fn engine(&self) -> &dyn Engine {
        self.handle.engine()
    }

    /// Call exactly once per candidate.
    pub fn report_done(&mut self) {
        self.handle.report_done();
    }

    pub fn set_default_engine(&mut self) -> &str {
        self.handle.default_engine_name()
    }
}

impl fmt::Debug for EngineIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineIterator")
            .field("engine", &self.engine().name())
            .field("has_next", &self.has_next())
            .finish()
    }
}

/// Ordered list of engines, tried front to back.
pub struct EngineList {
    engines: Vec<Arc<dyn Engine>>,
    position: usize,
    default_engine: String,
    done_tx: Option<mpsc::UnboundedSender<String>>,
}

impl EngineList {
    /// Returns `None` for an empty list: there is no candidate to start from.
    pub fn new(engines: Vec<Arc<dyn Engine>>) -> Option<Self> {
        if engines.is_empty() {
            return None;
        }
        Some(Self {
            engines,
            position: 0,
            default_engine: String::new(),
            done_tx: None,
        })
    }

    pub fn with_default_engine(mut self, name: impl Into<String>) -> Self {
        self.default_engine = name.into();
        self
    }

    /// Every `report_done` sends the finished engine's name on `tx`.
    pub fn with_done_reporter(mut self, tx: mpsc::UnboundedSender<String>) -> Self {
        self.done_tx = Some(tx);
        self
    }

    pub fn into_iterator(self) -> EngineIterator {
        EngineIterator::new(self)
    }
}

impl EngineCursor for EngineList {
    fn engine(&self) -> &dyn Engine {
        self.engines[self.position].as_ref()
    }

    fn has_next(&self) -> bool {
        self.position + 1 < self.engines.len()
    }

    fn move_to_next(&mut self) {
        self.position += 1;
    }

    fn report_done(&mut self) {
        let name = self.engines[self.position].name().to_string();
        log::debug!("[EngineList] candidate {} ({}) done", self.position, name);
        if let Some(tx) = &self.done_tx {
            // Receiver may be gone; bookkeeping is best effort.
            let _ = tx.send(name);
        }
    }

    fn default_engine_name(&mut self) -> &str {
        if self.default_engine.is_empty() {
            self.default_engine = self.engines[0].name().to_string();
        }
        &self.default_engine
    }
}

impl From<EngineList> for EngineIterator {
    fn from(list: EngineList) -> Self {
        EngineIterator::new(list)
    }
}
