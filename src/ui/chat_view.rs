use gtk4::prelude::*;
use gtk4 as gtk;
use log::warn;
use std::cell::RefCell;
use std::rc::Rc;

use crate::api::client::ApiClient;
use crate::api::models::{ChatMessage, Conversation};
use crate::bus::{self, AppEvent};

pub struct ChatView {
    root: gtk::Box,
    conversation_list: gtk::ListBox,
    conversations: RefCell<Vec<Conversation>>,
    peer_label: gtk::Label,
    messages_box: gtk::Box,
    scroller: gtk::ScrolledWindow,
    entry: gtk::Entry,
    current_peer: RefCell<Option<(String, String)>>,
}

impl ChatView {
    pub fn new() -> Rc<Self> {
        let root = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);

        // Conversation list on the left, current chat on the right.
        let side = gtk::Box::new(gtk::Orientation::Vertical, 6);
        let side_title = gtk::Label::new(Some("Conversations"));
        side_title.add_css_class("heading");
        side_title.set_halign(gtk::Align::Start);
        side.append(&side_title);

        let side_scroller = gtk::ScrolledWindow::builder()
            .vexpand(true)
            .min_content_width(200)
            .build();
        let conversation_list = gtk::ListBox::new();
        side_scroller.set_child(Some(&conversation_list));
        side.append(&side_scroller);
        root.append(&side);

        root.append(&gtk::Separator::new(gtk::Orientation::Vertical));

        let pane = gtk::Box::new(gtk::Orientation::Vertical, 6);
        pane.set_hexpand(true);

        let peer_label = gtk::Label::new(Some("Select a conversation"));
        peer_label.add_css_class("heading");
        peer_label.set_halign(gtk::Align::Start);
        pane.append(&peer_label);

        let scroller = gtk::ScrolledWindow::builder()
            .vexpand(true)
            .hexpand(true)
            .build();
        let messages_box = gtk::Box::new(gtk::Orientation::Vertical, 6);
        scroller.set_child(Some(&messages_box));
        pane.append(&scroller);

        let input_row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        let entry = gtk::Entry::new();
        entry.set_hexpand(true);
        entry.set_placeholder_text(Some("Type a message…"));
        let send_btn = gtk::Button::with_label("Send");
        send_btn.add_css_class("suggested-action");
        input_row.append(&entry);
        input_row.append(&send_btn);
        pane.append(&input_row);
        root.append(&pane);

        let view = Rc::new(Self {
            root,
            conversation_list,
            conversations: RefCell::new(Vec::new()),
            peer_label,
            messages_box,
            scroller,
            entry,
            current_peer: RefCell::new(None),
        });

        {
            let view_for_click = view.clone();
            view.conversation_list.connect_row_activated(move |_, row| {
                let idx = row.index();
                if idx < 0 {
                    return;
                }
                let conv = view_for_click
                    .conversations
                    .borrow()
                    .get(idx as usize)
                    .cloned();
                if let Some(c) = conv {
                    view_for_click.open_peer(&c.peer_id, &c.peer_name);
                }
            });
        }

        let send: Rc<dyn Fn()> = {
            let view_for_send = view.clone();
            Rc::new(move || view_for_send.send_current())
        };
        {
            let send = send.clone();
            send_btn.connect_clicked(move |_| (send)());
        }
        {
            let send = send.clone();
            let entry_for_activate = view.entry.clone();
            entry_for_activate.connect_activate(move |_| (send)());
        }

        view
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
        let rx = crate::utils::run_async_to_main(async move { client.conversations().await });
        let view = self.clone();
        rx.attach(None, move |res| {
            match res {
                Ok(items) => view.set_conversations(items),
                Err(e) => warn!("conversation list refresh failed: {e}"),
            }
            glib::ControlFlow::Continue
        });
    }

    fn set_conversations(&self, items: Vec<Conversation>) {
        while let Some(child) = self.conversation_list.first_child() {
            self.conversation_list.remove(&child);
        }
        for conv in &items {
            let row = gtk::ListBoxRow::new();
            let cell = gtk::Box::new(gtk::Orientation::Vertical, 2);
            cell.set_margin_top(8);
            cell.set_margin_bottom(8);
            cell.set_margin_start(8);
            cell.set_margin_end(8);

            let name = if conv.unread > 0 {
                format!("{} ({})", conv.peer_name, conv.unread)
            } else {
                conv.peer_name.clone()
            };
            let label = gtk::Label::new(Some(&name));
            label.set_halign(gtk::Align::Start);
            if conv.unread > 0 {
                label.add_css_class("heading");
            }
            cell.append(&label);

            if let Some(last) = &conv.last_message {
                let preview = gtk::Label::new(Some(last));
                preview.add_css_class("dim-label");
                preview.set_halign(gtk::Align::Start);
                preview.set_ellipsize(gtk4::pango::EllipsizeMode::End);
                cell.append(&preview);
            }

            row.set_child(Some(&cell));
            self.conversation_list.append(&row);
        }
        self.conversations.replace(items);
    }

    /// Switch the pane to a peer and load the history. Also the entry
    /// point for `OpenChat` events coming from the notifications view.
    pub fn open_peer(self: &Rc<Self>, peer_id: &str, peer_name: &str) {
        self.current_peer
            .replace(Some((peer_id.to_string(), peer_name.to_string())));
        self.peer_label.set_label(peer_name);

        let session = crate::app::Session::load();
        let client = ApiClient::from_session(&session);
        let peer = peer_id.to_string();
        let rx = crate::utils::run_async_to_main(async move { client.messages(&peer).await });
        let view = self.clone();
        let opened_peer = peer_id.to_string();
        rx.attach(None, move |res| {
            match res {
                Ok(messages) => {
                    // The user may have clicked another conversation while
                    // this was in flight.
                    let still_current = view
                        .current_peer
                        .borrow()
                        .as_ref()
                        .map(|(id, _)| *id == opened_peer)
                        .unwrap_or(false);
                    if still_current {
                        view.set_messages(&session.account_id, &messages);
                    }
                }
                Err(e) => warn!("message history load failed: {e}"),
            }
            glib::ControlFlow::Continue
        });
    }

    fn set_messages(&self, own_account_id: &str, messages: &[ChatMessage]) {
        while let Some(child) = self.messages_box.first_child() {
            self.messages_box.remove(&child);
        }
        for m in messages {
            self.append_message(own_account_id, m);
        }
        self.scroll_to_bottom();
    }

    fn append_message(&self, own_account_id: &str, m: &ChatMessage) {
        let lbl = gtk::Label::new(Some(&m.text));
        lbl.set_wrap(true);
        if m.sender_id == own_account_id {
            lbl.set_halign(gtk::Align::End);
        } else {
            lbl.set_halign(gtk::Align::Start);
        }
        self.messages_box.append(&lbl);
    }

    fn scroll_to_bottom(&self) {
        let adj = self.scroller.vadjustment();
        adj.set_value(adj.upper());
    }

    fn send_current(self: &Rc<Self>) {
        let text = self.entry.text().to_string();
        if text.trim().is_empty() {
            return;
        }
        let peer = match self.current_peer.borrow().clone() {
            Some((id, _)) => id,
            None => return,
        };

        let session = crate::app::Session::load();
        let client = ApiClient::from_session(&session);
        let peer_for_call = peer.clone();
        let text_for_call = text.clone();
        let rx = crate::utils::run_async_to_main(async move {
            client.send_message(&peer_for_call, &text_for_call).await
        });

        let view = self.clone();
        rx.attach(None, move |res| {
            match res {
                Ok(message) => {
                    view.entry.set_text("");
                    view.append_message(&session.account_id, &message);
                    view.scroll_to_bottom();
                    bus::emit(&AppEvent::RefreshNotifications);
                }
                Err(e) => warn!("send failed: {e}"),
            }
            glib::ControlFlow::Continue
        });
    }
}
