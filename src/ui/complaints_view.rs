use adw::prelude::*;
use gtk4 as gtk;
use log::warn;
use std::rc::Rc;

use crate::api::client::ApiClient;
use crate::api::models::Complaint;

pub struct ComplaintsView {
    root: gtk::Box,
    list: gtk::ListBox,
    overlay: adw::ToastOverlay,
}

impl ComplaintsView {
    pub fn new(overlay: adw::ToastOverlay) -> Rc<Self> {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);

        let title = gtk::Label::new(Some("Feedback & Complaints"));
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

        Rc::new(Self { root, list, overlay })
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
        let rx = crate::utils::run_async_to_main(async move { client.complaints().await });
        let view = self.clone();
        rx.attach(None, move |res| {
            match res {
                Ok(items) => view.set_items(items),
                Err(e) => warn!("complaint list refresh failed: {e}"),
            }
            glib::ControlFlow::Continue
        });
    }

    fn set_items(self: &Rc<Self>, items: Vec<Complaint>) {
        while let Some(child) = self.list.first_child() {
            self.list.remove(&child);
        }
        for complaint in &items {
            let row = gtk::ListBoxRow::new();
            row.set_activatable(false);
            let cell = gtk::Box::new(gtk::Orientation::Vertical, 4);
            cell.set_margin_top(8);
            cell.set_margin_bottom(8);
            cell.set_margin_start(8);
            cell.set_margin_end(8);

            let header = gtk::Box::new(gtk::Orientation::Horizontal, 6);
            let subject = gtk::Label::new(Some(&complaint.subject));
            subject.add_css_class("heading");
            subject.set_halign(gtk::Align::Start);
            subject.set_hexpand(true);
            header.append(&subject);

            let status = gtk::Label::new(Some(complaint.status.label()));
            status.add_css_class(if complaint.status.is_open() {
                "warning"
            } else {
                "success"
            });
            header.append(&status);
            cell.append(&header);

            let body = gtk::Label::new(Some(&complaint.body));
            body.set_halign(gtk::Align::Start);
            body.set_wrap(true);
            cell.append(&body);

            for reply in &complaint.replies {
                let line = gtk::Label::new(Some(&format!(
                    "{} · {}: {}",
                    reply.created_at.format("%Y-%m-%d"),
                    reply.author_name,
                    reply.body
                )));
                line.add_css_class("dim-label");
                line.set_halign(gtk::Align::Start);
                line.set_wrap(true);
                cell.append(&line);
            }

            // Resolved complaints are read-only.
            if complaint.status.is_open() {
                let reply_btn = gtk::Button::with_label("Reply");
                reply_btn.set_halign(gtk::Align::End);
                let view = self.clone();
                let complaint_id = complaint.id.clone();
                reply_btn.connect_clicked(move |_| {
                    view.open_reply_dialog(complaint_id.clone());
                });
                cell.append(&reply_btn);
            }

            row.set_child(Some(&cell));
            self.list.append(&row);
        }
    }

    fn open_reply_dialog(self: &Rc<Self>, complaint_id: String) {
        let dialog = gtk::Dialog::builder()
            .title("Reply to complaint")
            .modal(true)
            .build();
        let content = gtk::Box::new(gtk::Orientation::Vertical, 12);
        content.set_margin_top(12);
        content.set_margin_bottom(12);
        content.set_margin_start(12);
        content.set_margin_end(12);

        let entry = gtk::Entry::new();
        entry.set_placeholder_text(Some("Your reply"));
        entry.set_hexpand(true);
        content.append(&entry);

        dialog.set_child(Some(&content));
        let _ = dialog.add_button("Cancel", gtk::ResponseType::Cancel);
        let send_btn = dialog.add_button("Send", gtk::ResponseType::Ok);
        send_btn.add_css_class("suggested-action");
        dialog.set_default_response(gtk::ResponseType::Ok);

        let view = self.clone();
        dialog.connect_response(move |dlg, resp| {
            if resp == gtk::ResponseType::Ok {
                let text = entry.text().trim().to_string();
                if text.is_empty() {
                    // Reject the submit outright; nothing is sent.
                    let warning = adw::MessageDialog::new(
                        None::<&gtk::Window>,
                        Some("Empty reply"),
                        Some("Please write a reply before sending."),
                    );
                    warning.add_response("close", "Close");
                    warning.present();
                    return;
                }
                view.send_reply(complaint_id.clone(), text);
            }
            dlg.close();
        });

        dialog.present();
    }

    fn send_reply(self: &Rc<Self>, complaint_id: String, text: String) {
        let session = crate::app::Session::load();
        let client = ApiClient::from_session(&session);
        let id_for_call = complaint_id.clone();
        let rx = crate::utils::run_async_to_main(async move {
            client.reply_complaint(&id_for_call, &text).await
        });
        let view = self.clone();
        let overlay = self.overlay.clone();
        rx.attach(None, move |res| {
            match res {
                Ok(()) => view.reload(),
                Err(e) => {
                    warn!("reply to {complaint_id} failed: {e}");
                    overlay.add_toast(adw::Toast::new("Could not send the reply."));
                }
            }
            glib::ControlFlow::Continue
        });
    }
}
