use gtk4::prelude::*;
use gtk4 as gtk;
use log::warn;
use std::cell::RefCell;
use std::rc::Rc;

use crate::api::client::ApiClient;
use crate::api::models::ReceivedDonation;
use crate::bus::{self, AppEvent};

pub struct DonationsView {
    root: gtk::Box,
    list: gtk::ListBox,
    items: RefCell<Vec<ReceivedDonation>>,
    highlighted: RefCell<Option<String>>,
    overlay: adw::ToastOverlay,
}

impl DonationsView {
    pub fn new(overlay: adw::ToastOverlay) -> Rc<Self> {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);

        let title = gtk::Label::new(Some("Donations"));
        title.add_css_class("heading");
        title.set_halign(gtk::Align::Start);
        root.append(&title);

        let scroller = gtk::ScrolledWindow::builder()
            .vexpand(true)
            .hexpand(true)
            .build();
        let list = gtk::ListBox::new();
        list.add_css_class("boxed-list");
        list.set_selection_mode(gtk::SelectionMode::None);
        scroller.set_child(Some(&list));
        root.append(&scroller);

        Rc::new(Self {
            root,
            list,
            items: RefCell::new(Vec::new()),
            highlighted: RefCell::new(None),
            overlay,
        })
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    pub fn reload(self: &Rc<Self>) {
        let session = crate::app::Session::load();
        if !session.logged_in() {
            return;
        }
        let client = ApiClient::from_session(&session);
        let rx = crate::utils::run_async_to_main(async move {
            client.received_donations().await
        });
        let view = self.clone();
        rx.attach(None, move |res| {
            match res {
                Ok(items) => view.set_items(items),
                // Keep whatever was rendered before.
                Err(e) => warn!("donation list refresh failed: {e}"),
            }
            glib::ControlFlow::Continue
        });
    }

    /// Emphasize one card the next time it is rendered (and right now if
    /// it is already on screen).
    pub fn highlight(self: &Rc<Self>, id: &str) {
        self.highlighted.replace(Some(id.to_string()));
        let items = self.items.borrow().clone();
        self.set_items(items);
    }

    fn set_items(self: &Rc<Self>, items: Vec<ReceivedDonation>) {
        while let Some(child) = self.list.first_child() {
            self.list.remove(&child);
        }
        let highlighted = self.highlighted.borrow().clone();
        for donation in &items {
            let row = gtk::ListBoxRow::new();
            row.set_activatable(false);
            let cell = gtk::Box::new(gtk::Orientation::Vertical, 4);
            cell.set_margin_top(8);
            cell.set_margin_bottom(8);
            cell.set_margin_start(8);
            cell.set_margin_end(8);

            let title = gtk::Label::new(Some(&donation.title()));
            title.add_css_class("heading");
            title.set_halign(gtk::Align::Start);
            title.set_wrap(true);
            cell.append(&title);

            let from = gtk::Label::new(Some(&format!("From {}", donation.counterparty())));
            from.add_css_class("dim-label");
            from.set_halign(gtk::Align::Start);
            cell.append(&from);

            let status_row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
            let status = gtk::Label::new(Some(donation.status().label()));
            status.set_halign(gtk::Align::Start);
            status.set_hexpand(true);
            status_row.append(&status);

            // One explicit step at a time; a completed donation has no
            // button at all.
            if let Some(next) = donation.status().next() {
                let advance = gtk::Button::with_label(&format!("Mark {}", next.label()));
                advance.add_css_class("suggested-action");
                let view = self.clone();
                let donation_id = donation.id().to_string();
                advance.connect_clicked(move |_| {
                    view.advance(donation_id.clone(), next);
                });
                status_row.append(&advance);
            }
            cell.append(&status_row);

            row.set_child(Some(&cell));
            if highlighted.as_deref() == Some(donation.id()) {
                row.add_css_class("accent");
            }
            self.list.append(&row);
        }
        self.items.replace(items);
    }

    fn advance(self: &Rc<Self>, donation_id: String, next: crate::api::models::DonationStatus) {
        let session = crate::app::Session::load();
        let client = ApiClient::from_session(&session);
        let id_for_call = donation_id.clone();
        let rx = crate::utils::run_async_to_main(async move {
            client.advance_donation(&id_for_call, next).await
        });
        let view = self.clone();
        let overlay = self.overlay.clone();
        rx.attach(None, move |res| {
            match res {
                Ok(()) => {
                    view.reload();
                    bus::emit(&AppEvent::RefreshNotifications);
                }
                Err(e) => {
                    warn!("could not advance donation {donation_id}: {e}");
                    overlay.add_toast(adw::Toast::new("Could not update the donation status."));
                }
            }
            glib::ControlFlow::Continue
        });
    }
}
