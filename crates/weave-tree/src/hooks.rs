//! Hook runtime: persistent per-node state and typed data subscriptions.
//!
//! A fresh [`Lifecycle`] is built every time a component is (re)mounted. Its
//! [`UseState`] reads and writes a [`StateSlots`] array owned by the
//! reconciler's lifecycle map, so state survives remounts at the same path.
//! Its [`UseData`] collects the consumers registered during that render.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::rc::Rc;
use std::time::Instant;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use tracing::warn;

// =============================================================================
// State
// =============================================================================

/// Backing storage for one node's state hooks, indexed by call order.
#[derive(Clone, Default)]
pub struct StateSlots(Rc<RefCell<Vec<Box<dyn Any>>>>);

impl StateSlots {
    /// Empty slot array.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of initialized slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Whether no slot has been initialized yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl fmt::Debug for StateSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSlots").field("len", &self.len()).finish()
    }
}

/// State hook runtime for a single component invocation.
#[derive(Debug)]
pub struct UseState {
    slots: StateSlots,
    cursor: usize,
    changed: Rc<Cell<bool>>,
}

impl UseState {
    /// Runtime reading and writing `slots`.
    #[must_use]
    pub fn new(slots: StateSlots) -> Self {
        Self {
            slots,
            cursor: 0,
            changed: Rc::new(Cell::new(false)),
        }
    }

    /// Declare a state slot initialized to `initial` on first use.
    pub fn use_state<T: Clone + 'static>(&mut self, initial: T) -> (T, StateSetter<T>) {
        self.use_state_with(|| initial)
    }

    /// Declare a state slot whose initializer runs only on first use.
    pub fn use_state_with<T, F>(&mut self, init: F) -> (T, StateSetter<T>)
    where
        T: Clone + 'static,
        F: FnOnce() -> T,
    {
        let index = self.cursor;
        self.cursor += 1;

        let mut slots = self.slots.0.borrow_mut();
        let existing = slots
            .get(index)
            .and_then(|slot| slot.downcast_ref::<T>())
            .cloned();
        let value = if let Some(value) = existing {
            value
        } else {
            let value = init();
            if index < slots.len() {
                warn!(
                    index,
                    expected = std::any::type_name::<T>(),
                    "state slot type changed between renders, reinitializing"
                );
                slots[index] = Box::new(value.clone());
            } else {
                slots.push(Box::new(value.clone()));
            }
            value
        };

        let setter = StateSetter {
            slots: self.slots.clone(),
            index,
            changed: Rc::clone(&self.changed),
            _marker: PhantomData,
        };
        (value, setter)
    }

    /// Whether any setter from this runtime fired since it was created.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.changed.get()
    }
}

/// Writes one state slot and marks its runtime dirty.
pub struct StateSetter<T> {
    slots: StateSlots,
    index: usize,
    changed: Rc<Cell<bool>>,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            index: self.index,
            changed: Rc::clone(&self.changed),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSetter")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

impl<T: 'static> StateSetter<T> {
    /// Store `value`. Marks the runtime dirty even if the value is unchanged.
    pub fn set(&self, value: T) {
        {
            let mut slots = self.slots.0.borrow_mut();
            match slots.get_mut(self.index) {
                Some(slot) => *slot = Box::new(value),
                None => warn!(index = self.index, "setter called for a missing state slot"),
            }
        }
        self.changed.set(true);
    }

    /// Store `value` without scheduling a remount.
    ///
    /// For state a render derives and already reflects in its own output;
    /// the next render reads it back without being forced.
    pub fn store(&self, value: T) {
        let mut slots = self.slots.0.borrow_mut();
        match slots.get_mut(self.index) {
            Some(slot) => *slot = Box::new(value),
            None => warn!(index = self.index, "setter called for a missing state slot"),
        }
    }

    /// Replace the stored value with `f(previous)`.
    ///
    /// `f` must not call setters of the same component.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        {
            let mut slots = self.slots.0.borrow_mut();
            match slots.get_mut(self.index) {
                Some(slot) => match slot.downcast_ref::<T>() {
                    Some(previous) => {
                        let next = f(previous);
                        *slot = Box::new(next);
                    }
                    None => warn!(index = self.index, "state slot holds a different type"),
                },
                None => warn!(index = self.index, "setter called for a missing state slot"),
            }
        }
        self.changed.set(true);
    }
}

// =============================================================================
// Data
// =============================================================================

type Consumer = Rc<dyn Fn(Rc<dyn Any>) -> Option<LocalBoxFuture<'static, ()>>>;

/// Data hook runtime: consumers registered during one component invocation.
#[derive(Clone)]
pub struct UseData {
    consumers: Vec<Consumer>,
    on_timing: Rc<dyn Fn(f64)>,
}

impl UseData {
    /// Runtime reporting each update's duration (ms) to `on_timing`.
    pub fn new(on_timing: impl Fn(f64) + 'static) -> Self {
        Self {
            consumers: Vec::new(),
            on_timing: Rc::new(on_timing),
        }
    }

    /// Subscribe a synchronous consumer to payloads of type `T`.
    pub fn use_data<T: Any>(&mut self, consumer: impl Fn(&T) + 'static) {
        self.consumers.push(Rc::new(move |payload: Rc<dyn Any>| {
            let data = payload.downcast_ref::<T>()?;
            consumer(data);
            Some(futures::future::ready(()).boxed_local())
        }));
    }

    /// Subscribe an asynchronous consumer to payloads of type `T`.
    pub fn use_data_async<T, F, Fut>(&mut self, consumer: F)
    where
        T: Any,
        F: Fn(Rc<T>) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        self.consumers.push(Rc::new(move |payload: Rc<dyn Any>| {
            let data = payload.downcast::<T>().ok()?;
            Some(consumer(data).boxed_local())
        }));
    }

    /// Number of registered consumers.
    #[must_use]
    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    /// Feed `payload` to every matching consumer, in registration order,
    /// awaiting each before starting the next.
    pub async fn update_data(&self, payload: Rc<dyn Any>) {
        if self.consumers.is_empty() {
            return;
        }
        let start = Instant::now();
        for consumer in &self.consumers {
            if let Some(task) = consumer(Rc::clone(&payload)) {
                task.await;
            }
        }
        (self.on_timing)(start.elapsed().as_secs_f64() * 1000.0);
    }
}

impl fmt::Debug for UseData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UseData")
            .field("consumers", &self.consumers.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Hooks available to a component while it renders.
#[derive(Debug)]
pub struct Lifecycle {
    state: UseState,
    data: UseData,
}

impl Lifecycle {
    /// Combine a state and a data runtime.
    #[must_use]
    pub fn new(state: UseState, data: UseData) -> Self {
        Self { state, data }
    }

    /// See [`UseState::use_state`].
    pub fn use_state<T: Clone + 'static>(&mut self, initial: T) -> (T, StateSetter<T>) {
        self.state.use_state(initial)
    }

    /// See [`UseState::use_state_with`].
    pub fn use_state_with<T, F>(&mut self, init: F) -> (T, StateSetter<T>)
    where
        T: Clone + 'static,
        F: FnOnce() -> T,
    {
        self.state.use_state_with(init)
    }

    /// See [`UseData::use_data`].
    pub fn use_data<T: Any>(&mut self, consumer: impl Fn(&T) + 'static) {
        self.data.use_data(consumer);
    }

    /// See [`UseData::use_data_async`].
    pub fn use_data_async<T, F, Fut>(&mut self, consumer: F)
    where
        T: Any,
        F: Fn(Rc<T>) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        self.data.use_data_async(consumer);
    }

    /// Whether any state setter fired since this lifecycle was built.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.state.has_changed()
    }

    /// The data hook runtime.
    #[must_use]
    pub fn data(&self) -> &UseData {
        &self.data
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
