use adw::prelude::*;
use adw::Application;
use gtk4 as gtk;
use log::warn;

pub fn show_login_window(app: &Application) {
    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("CrumbShare Login")
        .default_width(420)
        .default_height(300)
        .resizable(false)
        .build();

    let toast_overlay = adw::ToastOverlay::new();

    let root = gtk::Box::new(gtk::Orientation::Vertical, 12);
    root.set_margin_top(24);
    root.set_margin_bottom(24);
    root.set_margin_start(24);
    root.set_margin_end(24);

    let title = gtk::Label::new(Some("Sign in to CrumbShare"));
    title.add_css_class("title-2");
    title.set_halign(gtk::Align::Start);
    root.append(&title);

    let server_entry = gtk::Entry::new();
    server_entry.set_placeholder_text(Some("Server URL (e.g. https://crumbshare.example)"));
    server_entry.set_hexpand(true);

    let email_entry = gtk::Entry::new();
    email_entry.set_placeholder_text(Some("Email"));
    email_entry.set_hexpand(true);

    let pass_entry = gtk::PasswordEntry::new();
    pass_entry.set_placeholder_text(Some("Password"));
    pass_entry.set_hexpand(true);

    let form = gtk::Box::new(gtk::Orientation::Vertical, 8);
    form.append(&server_entry);
    form.append(&email_entry);
    form.append(&pass_entry);
    root.append(&form);

    let status = gtk::Label::new(None);
    status.add_css_class("dim-label");
    status.set_halign(gtk::Align::Start);
    root.append(&status);

    let login_btn = gtk::Button::with_label("Sign in");
    login_btn.add_css_class("suggested-action");
    login_btn.set_halign(gtk::Align::End);
    root.append(&login_btn);

    toast_overlay.set_child(Some(&root));
    let container = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    let header_title = gtk::Label::new(Some("CrumbShare"));
    header.set_title_widget(Some(&header_title));
    container.append(&header);
    container.append(&toast_overlay);
    window.set_content(Some(&container));

    // Pre-fill the server from the last session.
    {
        let previous = crate::app::Session::load();
        if !previous.base_url.is_empty() {
            server_entry.set_text(&previous.base_url);
        }
    }

    let on_connect = {
        let app = app.clone();
        let window = window.clone();
        let overlay = toast_overlay.clone();
        let server_entry = server_entry.clone();
        let email_entry = email_entry.clone();
        let pass_entry = pass_entry.clone();
        move || {
            let url = crate::utils::normalize_url(&server_entry.text());
            let email = email_entry.text().trim().to_string();
            let password = pass_entry.text().to_string();

            // Form validation is blocking; nothing is submitted until it
            // passes.
            if server_entry.text().trim().is_empty() || email.is_empty() || password.is_empty() {
                show_validation_error(&window, "Please fill in server, email, and password.");
                return;
            }
            if url::Url::parse(&url).is_err() {
                show_validation_error(&window, "The server URL is not valid.");
                return;
            }

            status.set_label("Signing in…");

            let url_for_async = url.clone();
            let rx = crate::utils::run_async_to_main(async move {
                let client = crate::api::client::ApiClient::new(&url_for_async);
                client.login(&email, &password).await
            });

            let status_label = status.clone();
            let app2 = app.clone();
            let window2 = window.clone();
            let overlay2 = overlay.clone();
            let url_for_save = url.clone();
            rx.attach(None, move |res| {
                match res {
                    Ok(login) => {
                        status_label.set_label("Signed in");
                        let mut session = crate::app::Session::load();
                        session.base_url = url_for_save.clone();
                        session.token = Some(login.token);
                        session.account_id = login.account_id;
                        session.display_name = login.display_name;
                        session.role = Some(login.role);
                        if let Err(e) = session.save() {
                            overlay2.add_toast(adw::Toast::new(&format!(
                                "Failed to save session: {}",
                                e
                            )));
                        }
                        crate::ui::main_window::show_main_window(&app2);
                        window2.close();
                    }
                    Err(err) => {
                        warn!("login failed: {err}");
                        status_label.set_label("Sign-in failed");
                        overlay2.add_toast(adw::Toast::new(
                            "Could not sign in. Check server, email, and password.",
                        ));
                    }
                }
                glib::ControlFlow::Continue
            });
        }
    };

    use std::rc::Rc;
    let on_connect: Rc<dyn Fn()> = Rc::new(on_connect);
    {
        let on_connect = on_connect.clone();
        login_btn.connect_clicked(move |_| (on_connect)());
    }
    {
        let on_connect = on_connect.clone();
        server_entry.connect_activate(move |_| (on_connect)());
    }
    {
        let on_connect = on_connect.clone();
        email_entry.connect_activate(move |_| (on_connect)());
    }
    {
        let on_connect = on_connect.clone();
        pass_entry.connect_activate(move |_| (on_connect)());
    }

    window.present();
}

fn show_validation_error(parent: &adw::ApplicationWindow, message: &str) {
    let dialog = adw::MessageDialog::new(Some(parent), Some("Check your input"), Some(message));
    dialog.add_response("close", "Close");
    dialog.present();
}
