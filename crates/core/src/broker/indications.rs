//! Indication delivery and filter activation bookkeeping
//!
//! Providers push indications with `deliverIndication`; they are queued on a
//! bounded channel that the host drains. Filter activations are counted per
//! provider so the broker can pass `firstActivation`/`lastActivation` and
//! call `enableIndications`/`disableIndications` at the right moments.

use std::collections::HashMap;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use serde::Serialize;

use super::registry::ProviderKey;
use crate::status::{CmpiError, CmpiResult, ReturnCode};
use crate::value::InstanceData;

/// Default capacity of the indication queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// An indication as delivered by a provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicationEvent {
    pub namespace: String,
    pub indication: InstanceData,
}

/// What an activation changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Transition {
    /// First activation (or last deactivation) of this filter
    pub(crate) filter_edge: bool,
    /// The provider went from no active filters to one (or back)
    pub(crate) provider_edge: bool,
}

pub(crate) struct Indications {
    sender: Sender<IndicationEvent>,
    receiver: Receiver<IndicationEvent>,
    /// (provider, filter query, lowercase class) -> activation count
    active: Mutex<HashMap<(ProviderKey, String, String), usize>>,
}

impl Indications {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self {
            sender,
            receiver,
            active: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn deliver(&self, namespace: &str, indication: InstanceData) -> CmpiResult<()> {
        let event = IndicationEvent {
            namespace: namespace.to_string(),
            indication,
        };
        match self.sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(event)) => {
                tracing::warn!(class = event.indication.class_name(), "indication queue full, dropping indication");
                Err(CmpiError::with_message(
                    ReturnCode::ErrServerLimitsExceeded,
                    "indication queue full",
                ))
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::error!("indication queue disconnected");
                Err(CmpiError::failed("indication queue disconnected"))
            }
        }
    }

    /// Everything queued so far
    pub(crate) fn drain(&self) -> Vec<IndicationEvent> {
        self.receiver.try_iter().collect()
    }

    pub(crate) fn recv_timeout(&self, timeout: Duration) -> Option<IndicationEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    pub(crate) fn queued(&self) -> usize {
        self.receiver.len()
    }

    fn provider_total(active: &HashMap<(ProviderKey, String, String), usize>, provider: ProviderKey) -> usize {
        active
            .iter()
            .filter(|((p, _, _), _)| *p == provider)
            .map(|(_, n)| *n)
            .sum()
    }

    pub(crate) fn activate(&self, provider: ProviderKey, filter: &str, class: &str) -> Transition {
        let mut active = self.active.lock();
        let provider_edge = Self::provider_total(&active, provider) == 0;
        let count = active
            .entry((provider, filter.to_string(), class.to_ascii_lowercase()))
            .or_insert(0);
        *count += 1;
        Transition {
            filter_edge: *count == 1,
            provider_edge,
        }
    }

    /// Fails with NOT_FOUND when the filter is not active
    pub(crate) fn deactivate(&self, provider: ProviderKey, filter: &str, class: &str) -> CmpiResult<Transition> {
        let mut active = self.active.lock();
        let key = (provider, filter.to_string(), class.to_ascii_lowercase());
        let count = active
            .get_mut(&key)
            .ok_or_else(|| CmpiError::not_found(format!("filter not active: {filter}")))?;
        *count -= 1;
        let filter_edge = *count == 0;
        if filter_edge {
            active.remove(&key);
        }
        Ok(Transition {
            filter_edge,
            provider_edge: Self::provider_total(&active, provider) == 0,
        })
    }

    /// Undo an activation the provider refused
    pub(crate) fn rollback(&self, provider: ProviderKey, filter: &str, class: &str) {
        let _ = self.deactivate(provider, filter, class);
    }

    /// Undo a deactivation the provider refused
    pub(crate) fn restore(&self, provider: ProviderKey, filter: &str, class: &str) {
        self.activate(provider, filter, class);
    }

    /// Forget every activation of a provider
    pub(crate) fn forget(&self, provider: ProviderKey) {
        self.active.lock().retain(|(p, _, _), _| *p != provider);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ObjectPathData;
    use slotmap::SlotMap;

    fn keys() -> (ProviderKey, ProviderKey) {
        let mut map: SlotMap<ProviderKey, ()> = SlotMap::with_key();
        (map.insert(()), map.insert(()))
    }

    fn alert(n: u32) -> InstanceData {
        InstanceData::new(ObjectPathData::new("root/cimv2", "CIM_AlertIndication")).with_property("Seq", n)
    }

    #[test]
    fn test_queue_is_bounded() {
        let ind = Indications::new(2);
        ind.deliver("root/cimv2", alert(1)).unwrap();
        ind.deliver("root/cimv2", alert(2)).unwrap();
        let err = ind.deliver("root/cimv2", alert(3)).unwrap_err();
        assert!(err.is(ReturnCode::ErrServerLimitsExceeded));
        assert_eq!(ind.queued(), 2);

        let events = ind.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].indication.property("Seq"), Some(&1u32.into()));
        assert!(ind.recv_timeout(Duration::from_millis(1)).is_none());
    }

    #[test]
    fn test_activation_edges() {
        let (a, b) = keys();
        let ind = Indications::new(4);

        let t = ind.activate(a, "SELECT * FROM CIM_Alert", "CIM_Alert");
        assert_eq!(t, Transition { filter_edge: true, provider_edge: true });
        let t = ind.activate(a, "SELECT * FROM CIM_Alert", "cim_alert");
        assert_eq!(t, Transition { filter_edge: false, provider_edge: false });
        let t = ind.activate(a, "SELECT * FROM CIM_Other", "CIM_Other");
        assert_eq!(t, Transition { filter_edge: true, provider_edge: false });
        let t = ind.activate(b, "SELECT * FROM CIM_Alert", "CIM_Alert");
        assert!(t.provider_edge);

        let t = ind.deactivate(a, "SELECT * FROM CIM_Alert", "CIM_Alert").unwrap();
        assert_eq!(t, Transition { filter_edge: false, provider_edge: false });
        let t = ind.deactivate(a, "SELECT * FROM CIM_Alert", "CIM_Alert").unwrap();
        assert_eq!(t, Transition { filter_edge: true, provider_edge: false });
        let t = ind.deactivate(a, "SELECT * FROM CIM_Other", "CIM_Other").unwrap();
        assert_eq!(t, Transition { filter_edge: true, provider_edge: true });

        let err = ind.deactivate(a, "SELECT * FROM CIM_Other", "CIM_Other").unwrap_err();
        assert!(err.is(ReturnCode::ErrNotFound));
    }
}
