use adw::prelude::*;
use gtk4 as gtk;
use log::warn;
use std::cell::RefCell;
use std::rc::Rc;

use crate::api::client::ApiClient;
use crate::api::models::{Notification, NotificationCategory};
use crate::bus::{self, AppEvent, TabId};

pub struct NotificationsView {
    root: gtk::Box,
    list: gtk::ListBox,
    items: RefCell<Vec<Notification>>,
    overlay: adw::ToastOverlay,
}

impl NotificationsView {
    pub fn new(overlay: adw::ToastOverlay) -> Rc<Self> {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);

        let title_row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        let title = gtk::Label::new(Some("Notifications"));
        title.add_css_class("heading");
        title.set_halign(gtk::Align::Start);
        title.set_hexpand(true);
        title_row.append(&title);
        let mark_all_btn = gtk::Button::with_label("Mark all read");
        mark_all_btn.add_css_class("flat");
        title_row.append(&mark_all_btn);
        root.append(&title_row);

        let scroller = gtk::ScrolledWindow::builder()
            .vexpand(true)
            .hexpand(true)
            .build();
        let list = gtk::ListBox::new();
        list.add_css_class("boxed-list");
        scroller.set_child(Some(&list));
        root.append(&scroller);

        let view = Rc::new(Self {
            root,
            list,
            items: RefCell::new(Vec::new()),
            overlay,
        });

        {
            let view_for_click = view.clone();
            view.list.connect_row_activated(move |_, row| {
                let idx = row.index();
                if idx < 0 {
                    return;
                }
                let clicked = view_for_click.items.borrow().get(idx as usize).cloned();
                if let Some(n) = clicked {
                    view_for_click.on_activated(n);
                }
            });
        }

        {
            let view_for_btn = view.clone();
            mark_all_btn.connect_clicked(move |_| view_for_btn.mark_all_read());
        }

        view
    }

    /// Fold every currently listed id into the read store in one write.
    fn mark_all_read(&self) {
        let session = crate::app::Session::load();
        match crate::storage::open_default() {
            Ok(mut conn) => {
                let mut ids = crate::storage::load_read_ids(&conn, &session.account_id);
                for n in self.items.borrow().iter() {
                    ids.insert(n.id.clone());
                }
                if let Err(e) = crate::storage::save_read_ids(&mut conn, &session.account_id, &ids)
                {
                    warn!("could not persist read flags: {e}");
                }
            }
            Err(e) => warn!("read store unavailable: {e}"),
        }
        bus::emit(&AppEvent::RefreshNotifications);
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    /// Replace the rendered list with a freshly merged one. Unread rows
    /// are emphasized; read rows are dimmed.
    pub fn set_items(&self, items: Vec<Notification>) {
        while let Some(child) = self.list.first_child() {
            self.list.remove(&child);
        }
        for n in &items {
            let row = gtk::ListBoxRow::new();
            let cell = gtk::Box::new(gtk::Orientation::Vertical, 2);
            cell.set_margin_top(8);
            cell.set_margin_bottom(8);
            cell.set_margin_start(8);
            cell.set_margin_end(8);

            let header = gtk::Box::new(gtk::Orientation::Horizontal, 6);
            let who = gtk::Label::new(Some(
                n.sender_name.as_deref().unwrap_or(category_label(n.category)),
            ));
            who.set_halign(gtk::Align::Start);
            who.set_hexpand(true);
            if n.read {
                who.add_css_class("dim-label");
            } else {
                who.add_css_class("heading");
            }
            header.append(&who);

            let when = gtk::Label::new(Some(&n.timestamp.format("%Y-%m-%d %H:%M").to_string()));
            when.add_css_class("dim-label");
            when.set_halign(gtk::Align::End);
            header.append(&when);
            cell.append(&header);

            let message = gtk::Label::new(Some(&n.message));
            message.set_halign(gtk::Align::Start);
            message.set_wrap(true);
            if n.read {
                message.add_css_class("dim-label");
            }
            cell.append(&message);

            row.set_child(Some(&cell));
            self.list.append(&row);
        }
        self.items.replace(items);
    }

    /// Clicking a notification acknowledges it and jumps to whatever it
    /// is about.
    fn on_activated(&self, n: Notification) {
        let session = crate::app::Session::load();

        // Local flag first so the next merge renders it read even for
        // categories the server has no flag for.
        match crate::storage::open_default() {
            Ok(conn) => {
                if let Err(e) = crate::storage::mark_read(&conn, &session.account_id, &n.id) {
                    warn!("could not persist read flag for {}: {e}", n.id);
                }
            }
            Err(e) => warn!("read store unavailable: {e}"),
        }

        // Messages also carry a server-side flag.
        if n.category == NotificationCategory::Message {
            let id = n.id.clone();
            let client = ApiClient::from_session(&session);
            crate::utils::spawn_async(async move {
                if let Err(e) = client.mark_notification_read(&id).await {
                    warn!("server mark-read failed for {id}: {e}");
                }
            });
        }

        match n.category {
            NotificationCategory::Message => {
                let peer_id = n.entity_id.clone().unwrap_or_default();
                let peer_name = n.sender_name.clone().unwrap_or_default();
                if peer_id.is_empty() {
                    warn!("message notification {} has no peer id", n.id);
                } else {
                    bus::emit(&AppEvent::OpenChat { peer_id, peer_name });
                    bus::emit(&AppEvent::SwitchTab(TabId::Messages));
                }
            }
            NotificationCategory::Donation | NotificationCategory::ReceivedDonation => {
                bus::emit(&AppEvent::SwitchTab(TabId::Donations));
                if let Some(id) = n.entity_id.clone() {
                    bus::emit(&AppEvent::HighlightEntity { id });
                }
            }
            NotificationCategory::ProductAlert => {
                if let Some(product_id) = n.entity_id.clone() {
                    self.show_product_detail(&session, product_id);
                }
            }
        }

        bus::emit(&AppEvent::RefreshNotifications);
    }

    fn show_product_detail(&self, session: &crate::app::Session, product_id: String) {
        let client = ApiClient::from_session(session);
        let overlay = self.overlay.clone();
        let rx = crate::utils::run_async_to_main(async move {
            client.product(&product_id).await
        });
        rx.attach(None, move |res| {
            match res {
                Ok(product) => {
                    let unit = product.unit.clone().unwrap_or_else(|| "pcs".to_string());
                    let body = format!(
                        "{} {} in stock\nExpires {}",
                        product.quantity,
                        unit,
                        product.expires_at.format("%Y-%m-%d")
                    );
                    let dialog = adw::MessageDialog::new(
                        None::<&gtk::Window>,
                        Some(&product.name),
                        Some(&body),
                    );
                    dialog.add_response("close", "Close");
                    dialog.present();
                }
                Err(e) => {
                    warn!("product lookup failed: {e}");
                    overlay.add_toast(adw::Toast::new("Could not load product details."));
                }
            }
            glib::ControlFlow::Continue
        });
    }
}

fn category_label(category: NotificationCategory) -> &'static str {
    match category {
        NotificationCategory::ProductAlert => "Expiring product",
        NotificationCategory::Message => "Message",
        NotificationCategory::Donation => "Donation update",
        NotificationCategory::ReceivedDonation => "Incoming donation",
    }
}
