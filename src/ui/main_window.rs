use adw::prelude::*;
use adw::Application;
use gtk4 as gtk;
use log::warn;
use std::rc::Rc;

use crate::api::client::ApiClient;
use crate::bus::{self, AppEvent, TabId};
use crate::sync;
use crate::ui::badges_view::BadgesView;
use crate::ui::chat_view::ChatView;
use crate::ui::complaints_view::ComplaintsView;
use crate::ui::donations_view::DonationsView;
use crate::ui::notifications_view::NotificationsView;

pub fn show_main_window(app: &Application) {
    let session = crate::app::Session::load();

    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("CrumbShare")
        .default_width(960)
        .default_height(640)
        .build();

    let overlay = adw::ToastOverlay::new();

    let notifications = NotificationsView::new(overlay.clone());
    let donations = DonationsView::new(overlay.clone());
    let chat = ChatView::new();
    let badges = BadgesView::new();
    let complaints = ComplaintsView::new(overlay.clone());

    let stack = adw::ViewStack::new();
    let page = stack.add_titled(
        &notifications.widget(),
        Some(TabId::Notifications.page_name()),
        "Notifications",
    );
    page.set_icon_name(Some("preferences-system-notifications-symbolic"));
    let page = stack.add_titled(
        &donations.widget(),
        Some(TabId::Donations.page_name()),
        "Donations",
    );
    page.set_icon_name(Some("emblem-favorite-symbolic"));
    let page = stack.add_titled(
        &chat.widget(),
        Some(TabId::Messages.page_name()),
        "Messages",
    );
    page.set_icon_name(Some("mail-message-new-symbolic"));
    let page = stack.add_titled(&badges.widget(), Some(TabId::Badges.page_name()), "Badges");
    page.set_icon_name(Some("emblem-default-symbolic"));
    let page = stack.add_titled(
        &complaints.widget(),
        Some(TabId::Complaints.page_name()),
        "Complaints",
    );
    page.set_icon_name(Some("dialog-warning-symbolic"));

    overlay.set_child(Some(&stack));

    let container = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    let switcher = adw::ViewSwitcher::builder()
        .stack(&stack)
        .policy(adw::ViewSwitcherPolicy::Wide)
        .build();
    header.set_title_widget(Some(&switcher));

    let unread_label = gtk::Label::new(None);
    unread_label.add_css_class("dim-label");
    header.pack_start(&unread_label);

    let logout_btn = gtk::Button::with_label("Log out");
    header.pack_end(&logout_btn);

    container.append(&header);
    container.append(&overlay);
    window.set_content(Some(&container));
    window.present();

    // Render the cached snapshot before the first poll answers.
    match crate::storage::open_default() {
        Ok(conn) => {
            let cached = crate::storage::cached_notifications(&conn, &session.account_id);
            if !cached.is_empty() {
                unread_label.set_text(&unread_text(sync::unread_count(&cached)));
                notifications.set_items(cached);
            }
        }
        Err(e) => warn!("local cache unavailable: {e}"),
    }

    // One shared refresh path used by the poller and by bus events. A
    // failed tick keeps the previous list; the next tick retries.
    let refresh: Rc<dyn Fn()> = {
        let notifications = notifications.clone();
        let unread_label = unread_label.clone();
        Rc::new(move || {
            let session = crate::app::Session::load();
            if !session.logged_in() {
                return;
            }
            let account_id = session.account_id.clone();
            let client = ApiClient::from_session(&session);
            let rx = crate::utils::run_async_to_main(async move {
                sync::refresh(&client, &account_id).await
            });
            let view = notifications.clone();
            let unread_label = unread_label.clone();
            rx.attach(None, move |res| {
                match res {
                    Ok(merged) => {
                        unread_label.set_text(&unread_text(sync::unread_count(&merged)));
                        view.set_items(merged);
                    }
                    Err(e) => warn!("notification poll failed: {e}"),
                }
                glib::ControlFlow::Continue
            });
        })
    };

    let poller = Rc::new(sync::Poller::start({
        let refresh = refresh.clone();
        move || refresh()
    }));

    donations.reload();
    chat.reload();
    badges.reload();
    complaints.reload();

    let subscription = bus::subscribe({
        let stack = stack.clone();
        let chat = chat.clone();
        let donations = donations.clone();
        let refresh = refresh.clone();
        move |event| match event {
            AppEvent::SwitchTab(tab) => {
                stack.set_visible_child_name(tab.page_name());
            }
            AppEvent::OpenChat { peer_id, peer_name } => {
                chat.open_peer(peer_id, peer_name);
                stack.set_visible_child_name(TabId::Messages.page_name());
            }
            AppEvent::RefreshNotifications => refresh(),
            AppEvent::HighlightEntity { id } => donations.highlight(id),
        }
    });

    {
        let app = app.clone();
        let window = window.clone();
        logout_btn.connect_clicked(move |_| {
            let mut session = crate::app::Session::load();
            session.clear_login();
            if let Err(e) = session.save() {
                warn!("could not clear session: {e}");
            }
            crate::ui::login::show_login_window(&app);
            window.close();
        });
    }

    // Closing the window stops future ticks and detaches from the bus;
    // in-flight fetches resolve into dropped receivers.
    window.connect_close_request(move |_| {
        poller.cancel();
        bus::unsubscribe(subscription);
        glib::Propagation::Proceed
    });
}

fn unread_text(count: usize) -> String {
    match count {
        0 => String::new(),
        1 => "1 unread".to_string(),
        n => format!("{n} unread"),
    }
}
