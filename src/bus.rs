use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabId {
    Notifications,
    Donations,
    Messages,
    Badges,
    Complaints,
}

impl TabId {
    /// Child name of the corresponding view stack page.
    pub fn page_name(self) -> &'static str {
        match self {
            TabId::Notifications => "notifications",
            TabId::Donations => "donations",
            TabId::Messages => "messages",
            TabId::Badges => "badges",
            TabId::Complaints => "complaints",
        }
    }
}

/// Signals independently-mounted views send each other. Fire-and-forget:
/// no acknowledgement, and an event with no live subscriber is dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    OpenChat { peer_id: String, peer_name: String },
    RefreshNotifications,
    SwitchTab(TabId),
    HighlightEntity { id: String },
}

pub type SubscriptionId = usize;

struct Bus {
    handlers: RefCell<Vec<(SubscriptionId, Rc<dyn Fn(&AppEvent)>)>>,
    next_id: Cell<SubscriptionId>,
}

// One bus per thread; in practice only the GTK main thread uses it.
thread_local! {
    static BUS: Bus = Bus {
        handlers: RefCell::new(Vec::new()),
        next_id: Cell::new(0),
    };
}

/// Register a handler for every event. Views keep the returned id and
/// `unsubscribe` on teardown.
pub fn subscribe<F: Fn(&AppEvent) + 'static>(handler: F) -> SubscriptionId {
    BUS.with(|bus| {
        let id = bus.next_id.get();
        bus.next_id.set(id + 1);
        bus.handlers.borrow_mut().push((id, Rc::new(handler)));
        id
    })
}

pub fn unsubscribe(id: SubscriptionId) {
    BUS.with(|bus| bus.handlers.borrow_mut().retain(|(hid, _)| *hid != id));
}

/// Deliver synchronously to every current subscriber. Delivery order is
/// unspecified. Handlers may subscribe, unsubscribe, or emit from inside
/// the callback; the dispatch works on a snapshot, so such changes only
/// affect later events.
pub fn emit(event: &AppEvent) {
    let snapshot: Vec<Rc<dyn Fn(&AppEvent)>> =
        BUS.with(|bus| bus.handlers.borrow().iter().map(|(_, h)| h.clone()).collect());
    for handler in snapshot {
        handler(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_without_listeners_is_a_noop() {
        emit(&AppEvent::RefreshNotifications);
    }

    #[test]
    fn every_listener_receives_each_event() {
        let first = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(0));
        let a = {
            let first = first.clone();
            subscribe(move |_| first.set(first.get() + 1))
        };
        let b = {
            let second = second.clone();
            subscribe(move |_| second.set(second.get() + 1))
        };

        emit(&AppEvent::SwitchTab(TabId::Donations));
        emit(&AppEvent::HighlightEntity { id: "d-1".into() });
        assert_eq!(first.get(), 2);
        assert_eq!(second.get(), 2);

        unsubscribe(a);
        unsubscribe(b);
    }

    #[test]
    fn unsubscribed_handlers_stop_receiving() {
        let count = Rc::new(Cell::new(0));
        let id = {
            let count = count.clone();
            subscribe(move |_| count.set(count.get() + 1))
        };
        emit(&AppEvent::RefreshNotifications);
        unsubscribe(id);
        emit(&AppEvent::RefreshNotifications);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn handlers_see_the_payload() {
        let seen = Rc::new(RefCell::new(None));
        let id = {
            let seen = seen.clone();
            subscribe(move |e| *seen.borrow_mut() = Some(e.clone()))
        };
        emit(&AppEvent::OpenChat {
            peer_id: "bakery-7".into(),
            peer_name: "Ofenfrisch".into(),
        });
        assert_eq!(
            *seen.borrow(),
            Some(AppEvent::OpenChat {
                peer_id: "bakery-7".into(),
                peer_name: "Ofenfrisch".into(),
            })
        );
        unsubscribe(id);
    }

    #[test]
    fn reentrant_unsubscribe_does_not_panic() {
        let id = Rc::new(Cell::new(0));
        let id_for_handler = id.clone();
        let sub = subscribe(move |_| unsubscribe(id_for_handler.get()));
        id.set(sub);
        emit(&AppEvent::RefreshNotifications);
        // Second emit: the handler removed itself during the first one.
        emit(&AppEvent::RefreshNotifications);
    }

    #[test]
    fn subscriptions_made_during_dispatch_only_see_later_events() {
        let late_count = Rc::new(Cell::new(0));
        let registered = Rc::new(Cell::new(false));
        let outer = {
            let late_count = late_count.clone();
            let registered = registered.clone();
            subscribe(move |_| {
                if !registered.get() {
                    registered.set(true);
                    let late_count = late_count.clone();
                    subscribe(move |_| late_count.set(late_count.get() + 1));
                }
            })
        };
        emit(&AppEvent::RefreshNotifications);
        assert_eq!(late_count.get(), 0, "snapshot dispatch");
        emit(&AppEvent::RefreshNotifications);
        assert_eq!(late_count.get(), 1);
        unsubscribe(outer);
    }
}
