use std::{collections::HashMap, fmt::Debug, hash::Hash, sync::Arc};

use parking_lot::Mutex;

use crate::errors::{DynError, PublishError};

/// Handler of a subscriber, called with its own id, the channel and the message
pub type Handler<I, C, M> = Arc<dyn Fn(&I, &C, &M) -> Result<(), DynError> + Send + Sync>;

/// Channel keyed table of subscriber handlers.
///
/// `I` identifies subscribers, `C` identifies channels and `M` is the message
/// type handed to every handler.
///
/// The whole table is guarded by one lock, which [`PubSub::publish`] holds
/// while it runs the handlers. A handler must not subscribe, unsubscribe or
/// publish on the bus that invoked it, it would deadlock.
pub struct PubSub<I, C, M> {
    handlers: Mutex<HashMap<C, HashMap<I, Handler<I, C, M>>>>,
}
impl<I, C, M> Default for PubSub<I, C, M>
where
    I: Eq + Hash + Clone + Debug,
    C: Eq + Hash + Clone + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}
impl<I, C, M> Debug for PubSub<I, C, M>
where
    I: Debug,
    C: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.lock();
        let mut map = f.debug_map();
        for (channel, subscribers) in handlers.iter() {
            map.entry(channel, &subscribers.keys().collect::<Vec<_>>());
        }
        map.finish()
    }
}

impl<I, C, M> PubSub<I, C, M>
where
    I: Eq + Hash + Clone + Debug,
    C: Eq + Hash + Clone + Debug,
{
    pub fn new() -> Self {
        PubSub {
            handlers: Mutex::new(HashMap::new()),
        }
    }

    /// Registers the handler of `id` on `channel`, replacing any previous one
    pub fn subscribe<HandlerFn>(&self, id: I, channel: C, handler: HandlerFn) -> &Self
    where
        HandlerFn: Fn(&I, &C, &M) -> Result<(), DynError> + Send + Sync + 'static,
    {
        tracing::trace!("Subscribing {:?} to {:?}", id, channel);

        self.handlers
            .lock()
            .entry(channel)
            .or_default()
            .insert(id, Arc::new(handler));

        self
    }

    /// Removes the handler of `id` on `channel`. Unknown pairs are ignored
    pub fn unsubscribe(&self, id: &I, channel: &C) -> &Self {
        let mut handlers = self.handlers.lock();

        if let Some(subscribers) = handlers.get_mut(channel) {
            if subscribers.remove(id).is_some() {
                tracing::trace!("Unsubscribed {:?} from {:?}", id, channel);
            }
            if subscribers.is_empty() {
                handlers.remove(channel);
            }
        }

        self
    }

    /// Number of handlers registered on `channel`
    pub fn subscribers(&self, channel: &C) -> usize {
        self.handlers.lock().get(channel).map_or(0, HashMap::len)
    }

    /// Calls every handler registered on `channel`, in no particular order.
    ///
    /// Stops at the first failing handler and returns its error.
    pub fn publish(&self, channel: &C, message: &M) -> Result<(), PublishError> {
        let handlers = self.handlers.lock();
        let Some(subscribers) = handlers.get(channel) else {
            return Ok(());
        };

        tracing::debug!(
            "Publishing on {:?} to {} subscribers",
            channel,
            subscribers.len()
        );

        for (id, handler) in subscribers {
            if let Err(source) = handler(id, channel, message) {
                tracing::debug!("Handler {:?} failed on {:?}: {}", id, channel, source);
                return Err(PublishError::HandlerFailed {
                    subscriber: format!("{id:?}"),
                    channel: format!("{channel:?}"),
                    source,
                });
            }
        }

        Ok(())
    }
}
